//! Report archive.

use crate::constants::REPORTS_COLLECTION;
use crate::models::{NewReport, Report};
use crate::repositories::decode_all;
use crate::{RecordError, RecordResult};
use chrono::Utc;
use dialysis_ids::{RecordIdGenerator, RecordKind};
use dialysis_store::document::{from_document, to_document};
use dialysis_store::{DocumentStore, Filter, FindQuery, Sort};
use std::sync::Arc;

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    ids: Arc<RecordIdGenerator>,
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<RecordIdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Archives a report under a generated `RPT_<millis>_<patientId>` identifier.
    ///
    /// The summary is stored exactly as supplied.
    pub fn create(&self, req: NewReport) -> RecordResult<Report> {
        let report_id = self
            .ids
            .next(RecordKind::Report, req.patient_id.as_str())?
            .to_string();
        let report = Report::from_request(req, report_id, Utc::now());
        let stored = self
            .store
            .insert_one(REPORTS_COLLECTION, to_document(&report)?)?;
        tracing::info!("report {} archived", report.report_id);
        Ok(from_document(stored)?)
    }

    pub fn get(&self, report_id: &str) -> RecordResult<Report> {
        let filter = Filter::equals("reportId", report_id);
        match self.store.find_one(REPORTS_COLLECTION, &filter)? {
            Some(doc) => Ok(from_document(doc)?),
            None => Err(RecordError::not_found("report", report_id)),
        }
    }

    /// Lists a patient's reports, newest `timestamp` first.
    pub fn list_for_patient(&self, patient_id: &str) -> RecordResult<Vec<Report>> {
        let query = FindQuery::new(Filter::equals("patientId", patient_id))
            .sort(Sort::descending("timestamp"));
        decode_all(self.store.find(REPORTS_COLLECTION, &query)?)
    }
}
