//! Internal implementation of record identifier generation.

use crate::{IdError, IdResult};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::{fmt, str::FromStr};

/// The kinds of record that receive a generated identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Session,
    Report,
}

impl RecordKind {
    /// Returns the identifier prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordKind::Session => "SES",
            RecordKind::Report => "RPT",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "SES" => Some(RecordKind::Session),
            "RPT" => Some(RecordKind::Report),
            _ => None,
        }
    }
}

/// A generated record identifier: `<PREFIX>_<epoch-millis>_<owner>`.
///
/// The owner is the patient identifier and may itself contain underscores; parsing splits on
/// the first two underscores only.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordId {
    kind: RecordKind,
    millis: i64,
    owner: String,
}

impl RecordId {
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns the millisecond component.
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Returns the millisecond component as a UTC timestamp, if it is in range.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.millis).single()
    }

    /// Returns the owning patient identifier.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.kind.prefix(), self.millis, self.owner)
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '_');
        let (Some(prefix), Some(millis), Some(owner)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(IdError::InvalidInput(format!(
                "Invalid record id format: '{}'",
                s
            )));
        };

        let kind = RecordKind::from_prefix(prefix).ok_or_else(|| {
            IdError::InvalidInput(format!("Unknown record id prefix '{}' in '{}'", prefix, s))
        })?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::InvalidInput(format!(
                "Record id millis must be decimal digits: '{}'",
                s
            )));
        }
        let millis = millis.parse::<i64>().map_err(|e| {
            IdError::InvalidInput(format!("Record id millis out of range '{}': {}", s, e))
        })?;

        if owner.is_empty() {
            return Err(IdError::InvalidInput(format!(
                "Record id owner cannot be empty: '{}'",
                s
            )));
        }

        Ok(Self {
            kind,
            millis,
            owner: owner.to_string(),
        })
    }
}

/// Mints [`RecordId`]s whose millisecond component strictly increases across calls.
///
/// The generator is lock-free and cheap to share; one instance should be created at startup
/// and handed to every service that mints identifiers.
#[derive(Debug, Default)]
pub struct RecordIdGenerator {
    last_millis: AtomicI64,
}

impl RecordIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints an identifier for `owner` using the current wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `owner` is empty.
    pub fn next(&self, kind: RecordKind, owner: &str) -> IdResult<RecordId> {
        self.next_at(kind, owner, Utc::now().timestamp_millis())
    }

    /// Mints an identifier as if the wall clock read `now_millis`.
    ///
    /// The issued millisecond is `max(now_millis, previous + 1)`.
    pub fn next_at(&self, kind: RecordKind, owner: &str, now_millis: i64) -> IdResult<RecordId> {
        if owner.is_empty() {
            return Err(IdError::InvalidInput(
                "Record id owner cannot be empty".into(),
            ));
        }

        let mut previous = self.last_millis.load(Ordering::Relaxed);
        let millis = loop {
            let candidate = now_millis.max(previous.saturating_add(1));
            match self.last_millis.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break candidate,
                Err(actual) => previous = actual,
            }
        };

        Ok(RecordId {
            kind,
            millis,
            owner: owner.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_display_format() {
        let generator = RecordIdGenerator::new();
        let id = generator
            .next_at(RecordKind::Session, "P1", 1_704_067_200_000)
            .unwrap();

        assert_eq!(id.to_string(), "SES_1704067200000_P1");
    }

    #[test]
    fn test_report_prefix() {
        let generator = RecordIdGenerator::new();
        let id = generator
            .next_at(RecordKind::Report, "P1", 1_704_067_200_000)
            .unwrap();

        assert!(id.to_string().starts_with("RPT_"));
    }

    #[test]
    fn test_next_at_same_instant_is_strictly_increasing() {
        let generator = RecordIdGenerator::new();
        let first = generator.next_at(RecordKind::Session, "P1", 1_000).unwrap();
        let second = generator.next_at(RecordKind::Session, "P1", 1_000).unwrap();

        assert_eq!(first.millis(), 1_000);
        assert_eq!(second.millis(), 1_001);
        assert_ne!(first, second);
    }

    #[test]
    fn test_next_at_clock_going_backwards_still_increases() {
        let generator = RecordIdGenerator::new();
        let first = generator.next_at(RecordKind::Report, "P1", 5_000).unwrap();
        let second = generator.next_at(RecordKind::Report, "P1", 4_000).unwrap();

        assert!(second.millis() > first.millis());
    }

    #[test]
    fn test_next_uses_wall_clock() {
        let before = Utc::now().timestamp_millis();
        let id = RecordIdGenerator::new()
            .next(RecordKind::Session, "P1")
            .unwrap();
        let after = Utc::now().timestamp_millis();

        assert!(id.millis() >= before && id.millis() <= after);
        assert!(id.issued_at().is_some());
    }

    #[test]
    fn test_next_rejects_empty_owner() {
        let result = RecordIdGenerator::new().next(RecordKind::Session, "");

        assert!(matches!(result, Err(IdError::InvalidInput(_))));
    }

    #[test]
    fn test_concurrent_generation_never_repeats() {
        let generator = Arc::new(RecordIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    (0..200)
                        .map(|_| generator.next(RecordKind::Session, "P1").unwrap().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("thread should not panic") {
                assert!(seen.insert(id), "identifier issued twice");
            }
        }
        assert_eq!(seen.len(), 1_600);
    }

    #[test]
    fn test_parse_valid() {
        let id: RecordId = "SES_1704067200000_P1".parse().unwrap();

        assert_eq!(id.kind(), RecordKind::Session);
        assert_eq!(id.millis(), 1_704_067_200_000);
        assert_eq!(id.owner(), "P1");
    }

    #[test]
    fn test_parse_owner_with_underscores() {
        let id: RecordId = "RPT_42_WARD_7_BED_3".parse().unwrap();

        assert_eq!(id.kind(), RecordKind::Report);
        assert_eq!(id.owner(), "WARD_7_BED_3");
        assert_eq!(id.to_string(), "RPT_42_WARD_7_BED_3");
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        let result = RecordId::from_str("XYZ_42_P1");

        match result {
            Err(IdError::InvalidInput(msg)) => assert!(msg.contains("Unknown record id prefix")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric_millis() {
        assert!(RecordId::from_str("SES_12a4_P1").is_err());
        assert!(RecordId::from_str("SES_-5_P1").is_err());
        assert!(RecordId::from_str("SES__P1").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(RecordId::from_str("SES_42").is_err());
        assert!(RecordId::from_str("SES_42_").is_err());
        assert!(RecordId::from_str("").is_err());
    }
}
