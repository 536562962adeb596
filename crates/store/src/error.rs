/// Errors raised by document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store is not connected")]
    Unavailable,
    #[error("duplicate key in {collection}: {field} = {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },
    #[error("invalid update on `{path}`: {reason}")]
    InvalidUpdate { path: String, reason: String },
    #[error("failed to serialize document: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize document: {0}")]
    Deserialization(serde_json::Error),
    #[error("store handle lock poisoned")]
    LockPoisoned,
    #[error("stored document is corrupt: {0}")]
    Corrupt(String),
    #[error("storage engine error: {0}")]
    Sled(#[from] sled::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
