//! Document representation and dotted-path helpers.
//!
//! Paths use `.` to descend into nested objects, e.g. `vitalSigns.heartRate`. Arrays are never
//! traversed implicitly.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Converts a serialisable value into a [`Document`].
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if serialisation fails and [`StoreError::Corrupt`] if
/// the value does not serialise to a JSON object.
pub fn to_document<T: serde::Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value).map_err(StoreError::Serialization)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

/// Converts a [`Document`] back into a typed value.
pub fn from_document<T: serde::de::DeserializeOwned>(document: Document) -> StoreResult<T> {
    serde_json::from_value(Value::Object(document)).map_err(StoreError::Deserialization)
}

/// Returns the value at `path`, or `None` if any segment is missing.
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes `value` at `path`, creating intermediate objects as needed.
///
/// # Errors
///
/// Returns [`StoreError::InvalidUpdate`] if an intermediate segment exists but is not an object.
pub fn set_path(document: &mut Document, path: &str, value: Value) -> StoreResult<()> {
    let (parent, leaf) = parent_object(document, path)?;
    parent.insert(leaf.to_string(), value);
    Ok(())
}

/// Appends `value` to the array at `path`, creating the array if the path is missing or null.
///
/// # Errors
///
/// Returns [`StoreError::InvalidUpdate`] if the existing value is not an array.
pub fn push_path(document: &mut Document, path: &str, value: Value) -> StoreResult<()> {
    let (parent, leaf) = parent_object(document, path)?;
    match parent.get_mut(leaf) {
        Some(Value::Array(items)) => items.push(value),
        Some(Value::Null) | None => {
            parent.insert(leaf.to_string(), Value::Array(vec![value]));
        }
        Some(other) => {
            return Err(StoreError::InvalidUpdate {
                path: path.to_string(),
                reason: format!("cannot push onto {}", type_name(other)),
            })
        }
    }
    Ok(())
}

/// Removes the value at `path` if present.
pub fn remove_path(document: &mut Document, path: &str) {
    match path.rsplit_once('.') {
        None => {
            document.remove(path);
        }
        Some((parent, leaf)) => {
            let mut current = document;
            for segment in parent.split('.') {
                match current.get_mut(segment).and_then(Value::as_object_mut) {
                    Some(next) => current = next,
                    None => return,
                }
            }
            current.remove(leaf);
        }
    }
}

fn parent_object<'a, 'p>(
    document: &'a mut Document,
    path: &'p str,
) -> StoreResult<(&'a mut Document, &'p str)> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    if leaf.is_empty() {
        return Err(StoreError::InvalidUpdate {
            path: path.to_string(),
            reason: "empty path segment".into(),
        });
    }

    let mut current = document;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if entry.is_null() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                other => {
                    return Err(StoreError::InvalidUpdate {
                        path: path.to_string(),
                        reason: format!("`{segment}` is {}", type_name(other)),
                    })
                }
            };
        }
    }
    Ok((current, leaf))
}

/// Orders two JSON values the way the store's filters and sorts see them.
///
/// - numbers compare numerically
/// - strings that both parse as RFC 3339 timestamps compare as instants
/// - other strings compare lexicographically
/// - booleans compare `false < true`
///
/// Any other pairing (including `null`) is incomparable and yields `None`.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_instant(x), parse_instant(y)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality as seen by filters, lookups and group keys.
///
/// `1` equals `1.0`. Strings are equal only when identical, so two spellings of the same
/// instant are distinct keys here, matching the unique index.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Total order used by sorts: incomparable or missing values sort before everything else.
pub(crate) fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or_else(|| rank(x).cmp(&rank(y))),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_get_path_descends_nested_objects() {
        let d = doc(json!({"vitalSigns": {"heartRate": 72}}));
        assert_eq!(get_path(&d, "vitalSigns.heartRate"), Some(&json!(72)));
        assert_eq!(get_path(&d, "vitalSigns.bloodPressure"), None);
        assert_eq!(get_path(&d, "vitalSigns.heartRate.deeper"), None);
    }

    #[test]
    fn test_set_path_creates_intermediate_objects() {
        let mut d = doc(json!({"a": 1}));
        set_path(&mut d, "b.c.d", json!("x")).expect("set should succeed");
        assert_eq!(get_path(&d, "b.c.d"), Some(&json!("x")));
        assert_eq!(d.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_set_path_rejects_scalar_parent() {
        let mut d = doc(json!({"a": 1}));
        let err = set_path(&mut d, "a.b", json!(2)).expect_err("should not descend into a number");
        assert!(matches!(err, StoreError::InvalidUpdate { .. }));
    }

    #[test]
    fn test_push_path_appends_and_preserves_existing_items() {
        let mut d = doc(json!({"events": [{"n": 1}]}));
        push_path(&mut d, "events", json!({"n": 2})).expect("push should succeed");
        assert_eq!(d.get("events"), Some(&json!([{"n": 1}, {"n": 2}])));
    }

    #[test]
    fn test_push_path_creates_missing_array() {
        let mut d = doc(json!({}));
        push_path(&mut d, "events", json!(1)).expect("push should succeed");
        assert_eq!(d.get("events"), Some(&json!([1])));
    }

    #[test]
    fn test_push_path_rejects_non_array() {
        let mut d = doc(json!({"events": "nope"}));
        assert!(push_path(&mut d, "events", json!(1)).is_err());
    }

    #[test]
    fn test_remove_path_removes_nested_field() {
        let mut d = doc(json!({"a": {"b": 1, "c": 2}}));
        remove_path(&mut d, "a.b");
        assert_eq!(d, doc(json!({"a": {"c": 2}})));
        remove_path(&mut d, "missing.path");
    }

    #[test]
    fn test_compare_values_orders_timestamps_as_instants() {
        let whole = json!("2024-01-01T00:00:01Z");
        let fractional = json!("2024-01-01T00:00:00.500Z");
        assert_eq!(compare_values(&fractional, &whole), Some(Ordering::Less));

        let offset = json!("2024-01-01T01:00:00+01:00");
        let utc = json!("2024-01-01T00:00:00Z");
        assert_eq!(compare_values(&offset, &utc), Some(Ordering::Equal));
    }

    #[test]
    fn test_values_equal_keeps_distinct_spellings_of_an_instant_apart() {
        let offset = json!("2024-01-01T01:00:00+01:00");
        let utc = json!("2024-01-01T00:00:00Z");
        assert!(!values_equal(&offset, &utc));
        assert!(values_equal(&utc, &json!("2024-01-01T00:00:00Z")));
    }

    #[test]
    fn test_compare_values_numbers_and_mismatches() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert_eq!(compare_values(&json!(2), &json!(10)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(2), &json!("2")), None);
        assert_eq!(compare_values(&Value::Null, &Value::Null), None);
    }
}
