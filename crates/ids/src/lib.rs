//! Record identifiers.
//!
//! Sessions and reports carry human-readable identifiers of the form
//! `<PREFIX>_<epoch-millis>_<patientId>`:
//!
//! - `SES_1704067200000_P1` for a session
//! - `RPT_1704067200000_P1` for a report
//!
//! The millisecond component comes from a [`RecordIdGenerator`], which never hands out the same
//! millisecond twice within a process: if the clock has not advanced (or has gone backwards)
//! since the previous identifier, the previous value plus one is used instead. Two identifiers
//! for the same patient minted by one process therefore never collide. Collisions across
//! processes are left to the unique index the store keeps on each identifier field.

mod service;

pub use service::{RecordId, RecordIdGenerator, RecordKind};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
