//! Reading ingestion.
//!
//! A reading that reports `vitalSigns.dialysisProgress` also moves its session's progress. The
//! two writes are not atomic: the reading is stored first and the session update is attempted
//! afterwards. The outcome of that second step is returned to the caller as [`ProgressSync`]
//! rather than being swallowed, and [`ReadingService::sync_session_progress`] can be called on
//! its own to retry it.

use crate::constants::{DEFAULT_READING_LIMIT, READINGS_COLLECTION};
use crate::models::{NewReading, Reading};
use crate::repositories::{decode_all, to_json, SessionService};
use crate::validation::{ensure_non_negative, ensure_percentage};
use crate::{RecordError, RecordResult};
use chrono::{DateTime, Utc};
use dialysis_store::document::to_document;
use dialysis_store::{DocumentStore, Filter, FindQuery, Sort, ID_FIELD};
use serde_json::Value;
use std::sync::Arc;

/// Outcome of propagating a reading's progress onto its session.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressSync {
    /// The reading carried no progress value.
    NotRequested,
    /// The session now shows the reading's progress.
    Applied,
    /// No session with the reading's `sessionId` exists.
    SessionMissing,
    /// The session update failed; the reading itself is stored.
    Failed(String),
}

/// Result of recording a reading.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedReading {
    /// Store-assigned `_id` of the reading.
    pub reading_id: String,
    pub progress_sync: ProgressSync,
}

/// Optional filters for [`ReadingService::query`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadingQuery {
    /// Inclusive lower bound on `timestamp`.
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`.
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of readings; defaults to 100.
    pub limit: Option<usize>,
}

#[derive(Clone)]
pub struct ReadingService {
    store: Arc<dyn DocumentStore>,
    sessions: SessionService,
}

impl ReadingService {
    pub fn new(store: Arc<dyn DocumentStore>, sessions: SessionService) -> Self {
        Self { store, sessions }
    }

    /// Stores a reading and, when it reports progress, copies that progress onto its session.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] if a value is out of range. Failure of the session
    /// update is not an error; it is reported through [`RecordedReading::progress_sync`].
    pub fn record(&self, req: NewReading) -> RecordResult<RecordedReading> {
        let progress = req.reported_progress();
        ensure_percentage("vitalSigns.dialysisProgress", progress)?;
        if let Some(fluid) = &req.fluid_management {
            ensure_non_negative("fluidManagement.flowRate", fluid.flow_rate)?;
        }

        let reading = Reading::from_request(req, Utc::now());
        let stored = self
            .store
            .insert_one(READINGS_COLLECTION, to_document(&reading)?)?;
        let reading_id = stored
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| RecordError::Internal("inserted reading has no _id".into()))?;

        let progress_sync = match progress {
            None => ProgressSync::NotRequested,
            Some(value) => match self.sync_session_progress(&reading.session_id, value) {
                Ok(true) => ProgressSync::Applied,
                Ok(false) => {
                    tracing::warn!(
                        "reading {} references unknown session {}",
                        reading_id,
                        reading.session_id
                    );
                    ProgressSync::SessionMissing
                }
                Err(e) => {
                    tracing::warn!(
                        "reading {} stored but session {} progress not updated: {}",
                        reading_id,
                        reading.session_id,
                        e
                    );
                    ProgressSync::Failed(e.to_string())
                }
            },
        };

        Ok(RecordedReading {
            reading_id,
            progress_sync,
        })
    }

    /// Overwrites the session's `dialysisProgress` with `progress`.
    ///
    /// Returns `Ok(false)` if the session does not exist.
    pub fn sync_session_progress(&self, session_id: &str, progress: f64) -> RecordResult<bool> {
        Ok(self.sessions.set_progress(session_id, progress)?.is_some())
    }

    /// Returns a session's readings, newest `timestamp` first.
    ///
    /// A limit of `0` returns no readings.
    pub fn query(&self, session_id: &str, params: &ReadingQuery) -> RecordResult<Vec<Reading>> {
        let limit = params.limit.unwrap_or(DEFAULT_READING_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let range = Filter::range(
            "timestamp",
            params.start_time.as_ref().map(to_json).transpose()?,
            params.end_time.as_ref().map(to_json).transpose()?,
        );
        let query = FindQuery::new(Filter::equals("sessionId", session_id).and(range))
            .sort(Sort::descending("timestamp"))
            .limit(limit);
        decode_all(self.store.find(READINGS_COLLECTION, &query)?)
    }
}
