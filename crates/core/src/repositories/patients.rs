//! Patient directory.

use crate::constants::PATIENTS_COLLECTION;
use crate::models::{NewPatient, Patient};
use crate::repositories::decode_all;
use crate::{RecordError, RecordResult};
use chrono::Utc;
use dialysis_store::document::{from_document, to_document};
use dialysis_store::{DocumentStore, Filter, FindQuery};
use std::sync::Arc;

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn DocumentStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Lists every patient in store order.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::StoreUnavailable`] if the store cannot be queried.
    pub fn list(&self) -> RecordResult<Vec<Patient>> {
        let documents = self.store.find(PATIENTS_COLLECTION, &FindQuery::all())?;
        decode_all(documents)
    }

    /// Creates a patient, stamping `createdAt` and `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] if a patient with the same `patientId` exists.
    pub fn create(&self, req: NewPatient) -> RecordResult<Patient> {
        let patient = Patient::from_request(req, Utc::now());
        let stored = self
            .store
            .insert_one(PATIENTS_COLLECTION, to_document(&patient)?)?;
        tracing::info!("patient {} created", patient.patient_id);
        Ok(from_document(stored)?)
    }

    /// Fetches a patient by `patientId`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if no patient matches.
    pub fn get(&self, patient_id: &str) -> RecordResult<Patient> {
        let filter = Filter::equals("patientId", patient_id);
        match self.store.find_one(PATIENTS_COLLECTION, &filter)? {
            Some(doc) => Ok(from_document(doc)?),
            None => Err(RecordError::not_found("patient", patient_id)),
        }
    }
}
