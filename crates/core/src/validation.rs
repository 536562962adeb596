//! Input validation utilities.
//!
//! Request bodies arrive as untyped JSON. They are decoded here into the typed request models so
//! that a failure names the offending field, and then checked for constraints serde cannot
//! express (ranges, non-blank text).

use crate::{RecordError, RecordResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Decode a JSON request body into `T`.
///
/// This uses `serde_path_to_error` so the error names the failing field, e.g.
/// `vitalSigns.heartRate: invalid type: string "x", expected f64`.
///
/// # Errors
///
/// Returns [`RecordError::Validation`] if `value` does not match `T`.
pub fn decode_json<T: DeserializeOwned>(value: Value) -> RecordResult<T> {
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        if path.is_empty() || path == "." {
            RecordError::Validation(source.to_string())
        } else {
            RecordError::Validation(format!("{path}: {source}"))
        }
    })
}

/// Validate that an optional percentage lies within `0..=100`.
///
/// # Errors
///
/// Returns [`RecordError::Validation`] naming `field` if the value is out of range or not finite.
pub fn ensure_percentage(field: &str, value: Option<f64>) -> RecordResult<()> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(RecordError::Validation(format!(
            "{field} must be between 0 and 100, got {v}"
        ))),
        _ => Ok(()),
    }
}

/// Validate that an optional quantity is not negative.
///
/// # Errors
///
/// Returns [`RecordError::Validation`] naming `field` if the value is negative.
pub fn ensure_non_negative(field: &str, value: Option<f64>) -> RecordResult<()> {
    match value {
        Some(v) if v < 0.0 => Err(RecordError::Validation(format!(
            "{field} cannot be negative, got {v}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Inner {
        heart_rate: f64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Outer {
        name: NonEmptyText,
        vital_signs: Inner,
    }

    #[test]
    fn test_non_empty_text_trims() {
        let text = NonEmptyText::new("  Ada  ").unwrap();
        assert_eq!(text.as_str(), "Ada");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn test_decode_json_success() {
        let decoded: Outer = decode_json(json!({"name": "A", "vitalSigns": {"heartRate": 72}}))
            .expect("decode should succeed");
        assert_eq!(decoded.name.as_str(), "A");
        assert_eq!(decoded.vital_signs.heart_rate, 72.0);
    }

    #[test]
    fn test_decode_json_reports_nested_path() {
        let err = decode_json::<Outer>(json!({"name": "A", "vitalSigns": {"heartRate": "fast"}}))
            .unwrap_err();
        match err {
            RecordError::Validation(msg) => {
                assert!(msg.starts_with("vitalSigns.heartRate:"), "got {msg}")
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_json_reports_missing_field() {
        let err = decode_json::<Outer>(json!({"name": "A"})).unwrap_err();
        assert!(err.to_string().contains("vitalSigns"));
    }

    #[test]
    fn test_decode_json_rejects_blank_text() {
        let err =
            decode_json::<Outer>(json!({"name": " ", "vitalSigns": {"heartRate": 1}})).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_ensure_percentage() {
        assert!(ensure_percentage("dialysisProgress", None).is_ok());
        assert!(ensure_percentage("dialysisProgress", Some(0.0)).is_ok());
        assert!(ensure_percentage("dialysisProgress", Some(100.0)).is_ok());
        assert!(ensure_percentage("dialysisProgress", Some(100.5)).is_err());
        assert!(ensure_percentage("dialysisProgress", Some(-1.0)).is_err());
        assert!(ensure_percentage("dialysisProgress", Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative("totalDuration", Some(0.0)).is_ok());
        assert!(ensure_non_negative("totalDuration", Some(-0.5)).is_err());
    }
}
