//! Record services.
//!
//! One service per component. Each holds an explicit handle to the document store and performs
//! exactly one store operation per call, except reading ingestion, which follows the insert with
//! a best-effort session update.

pub mod analytics;
pub mod patients;
pub mod readings;
pub mod reports;
pub mod sessions;

pub use analytics::AnalyticsService;
pub use patients::PatientService;
pub use readings::{ProgressSync, ReadingQuery, ReadingService, RecordedReading};
pub use reports::ReportService;
pub use sessions::SessionService;

use crate::constants::{PATIENTS_COLLECTION, REPORTS_COLLECTION, SESSIONS_COLLECTION};
use crate::{RecordError, RecordResult};
use dialysis_ids::RecordIdGenerator;
use dialysis_store::document::from_document;
use dialysis_store::{Document, DocumentStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Registers the unique indexes the record services rely on.
///
/// Call once at startup, before serving requests.
///
/// # Errors
///
/// Returns [`RecordError::Validation`] if existing data already violates an index, or
/// [`RecordError::StoreUnavailable`] if the store is closed.
pub fn ensure_indexes(store: &dyn DocumentStore) -> RecordResult<()> {
    for (collection, field) in [
        (PATIENTS_COLLECTION, "patientId"),
        (SESSIONS_COLLECTION, "sessionId"),
        (REPORTS_COLLECTION, "reportId"),
    ] {
        store.ensure_unique_index(collection, field)?;
        tracing::debug!("unique index ensured on {}.{}", collection, field);
    }
    Ok(())
}

/// Every record service, sharing one store handle and one identifier generator.
#[derive(Clone)]
pub struct RecordServices {
    pub patients: PatientService,
    pub sessions: SessionService,
    pub readings: ReadingService,
    pub reports: ReportService,
    pub analytics: AnalyticsService,
}

impl RecordServices {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<RecordIdGenerator>) -> Self {
        let sessions = SessionService::new(store.clone(), ids.clone());
        Self {
            patients: PatientService::new(store.clone()),
            readings: ReadingService::new(store.clone(), sessions.clone()),
            reports: ReportService::new(store.clone(), ids),
            analytics: AnalyticsService::new(store),
            sessions,
        }
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> RecordResult<Value> {
    serde_json::to_value(value).map_err(|e| RecordError::Internal(e.to_string()))
}

pub(crate) fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> RecordResult<Vec<T>> {
    documents
        .into_iter()
        .map(|doc| from_document(doc).map_err(RecordError::from))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use dialysis_store::{
        Connectivity, Document, Filter, FindQuery, Pipeline, SledStore, StoreError, StoreResult,
        Update,
    };

    /// Delegates to an inner store but fails every `update_one`.
    pub struct FailingUpdates(pub Arc<dyn DocumentStore>);

    impl DocumentStore for FailingUpdates {
        fn ensure_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
            self.0.ensure_unique_index(collection, field)
        }

        fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Document> {
            self.0.insert_one(collection, document)
        }

        fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
            self.0.find(collection, query)
        }

        fn update_one(&self, _: &str, _: &Filter, _: &Update) -> StoreResult<Option<Document>> {
            Err(StoreError::Corrupt("update rejected".into()))
        }

        fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
            self.0.aggregate(collection, pipeline)
        }

        fn ping(&self) -> Connectivity {
            self.0.ping()
        }

        fn close(&self) -> StoreResult<()> {
            self.0.close()
        }
    }

    pub fn store() -> Arc<dyn DocumentStore> {
        let store = SledStore::open_temporary().expect("temporary store should open");
        ensure_indexes(&store).expect("indexes should be created");
        Arc::new(store)
    }

    pub fn services() -> RecordServices {
        RecordServices::new(store(), Arc::new(RecordIdGenerator::new()))
    }
}
