use dialysis_store::StoreError;

/// Errors surfaced by the record services.
///
/// Each variant corresponds to one class of HTTP outcome: `Validation` is the caller's fault,
/// `NotFound` names the missing record, and the remaining variants are server faults whose
/// detail is logged rather than returned.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("document store unavailable")]
    StoreUnavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

impl RecordError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        RecordError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<StoreError> for RecordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { field, value, .. } => {
                RecordError::Validation(format!("duplicate key: {field} {value} already exists"))
            }
            StoreError::Unavailable => RecordError::StoreUnavailable,
            other => RecordError::Internal(other.to_string()),
        }
    }
}

impl From<dialysis_ids::IdError> for RecordError {
    fn from(err: dialysis_ids::IdError) -> Self {
        RecordError::Validation(err.to_string())
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
