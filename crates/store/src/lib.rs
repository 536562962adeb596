//! # Dialysis Store
//!
//! Embedded document store used by the dialysis record service.
//!
//! Documents are JSON objects grouped into named collections. The store offers the small set of
//! operations the service needs and nothing more:
//! - inserts guarded by unique indexes
//! - filtered, sorted and limited finds
//! - partial updates (`set` on dotted paths, `push` onto arrays)
//! - declarative aggregation pipelines ([`Pipeline`])
//! - an explicit connection lifecycle (`open` → `ping` → `close`)
//!
//! The only backend is [`SledStore`]. Callers program against the [`DocumentStore`] trait so
//! request handlers receive an explicit store handle rather than reaching for global state.

pub mod document;
pub mod error;
pub mod pipeline;
pub mod query;
mod sled_store;

pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use pipeline::{Accumulator, Pipeline, Projection, Stage};
pub use query::{Filter, FindQuery, Sort, SortOrder, Update};
pub use sled_store::SledStore;

use serde::Serialize;

/// Name of the field holding the store-assigned document identifier.
pub const ID_FIELD: &str = "_id";

/// Whether the store handle can currently serve operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connectivity::Connected => "connected",
            Connectivity::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations offered by a document store.
///
/// Every method is a single store operation. Implementations must be safe to share between
/// concurrently running request handlers.
pub trait DocumentStore: Send + Sync {
    /// Registers a uniqueness constraint on `field` within `collection`.
    ///
    /// Existing documents are indexed immediately; if they already violate the constraint the
    /// call fails with [`StoreError::DuplicateKey`].
    fn ensure_unique_index(&self, collection: &str, field: &str) -> StoreResult<()>;

    /// Inserts `document`, assigning a fresh `_id`, and returns the stored form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if a unique index would be violated. Nothing is
    /// written in that case.
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document>;

    /// Returns the documents matching `query`, in insertion order unless a sort is given.
    fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>>;

    /// Returns the first document (insertion order) matching `filter`.
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let query = FindQuery::new(filter.clone()).limit(1);
        Ok(self.find(collection, &query)?.into_iter().next())
    }

    /// Applies `update` to the first document matching `filter` and returns the updated document.
    ///
    /// Returns `Ok(None)` when nothing matches.
    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<Option<Document>>;

    /// Runs `pipeline` over every document of `collection`.
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>>;

    /// Reports whether the handle is open.
    fn ping(&self) -> Connectivity;

    /// Flushes outstanding writes and releases the underlying database.
    ///
    /// Any later operation fails with [`StoreError::Unavailable`]. Closing twice is a no-op.
    fn close(&self) -> StoreResult<()>;
}
