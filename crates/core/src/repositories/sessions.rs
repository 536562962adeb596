//! Session lifecycle.

use crate::constants::SESSIONS_COLLECTION;
use crate::models::{EmergencyEvent, NewEmergencyEvent, NewSession, Session, SessionUpdate};
use crate::repositories::{decode_all, to_json};
use crate::validation::{ensure_non_negative, ensure_percentage};
use crate::{RecordError, RecordResult};
use chrono::Utc;
use dialysis_ids::{RecordIdGenerator, RecordKind};
use dialysis_store::document::{from_document, to_document};
use dialysis_store::{DocumentStore, Filter, FindQuery, Sort, Update};
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn DocumentStore>,
    ids: Arc<RecordIdGenerator>,
}

impl SessionService {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<RecordIdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Creates a session with a generated `SES_<millis>_<patientId>` identifier.
    ///
    /// `status` defaults to `active` and `dialysisProgress` to `0`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] if a numeric field is out of range or the generated
    /// identifier already exists.
    pub fn create(&self, req: NewSession) -> RecordResult<Session> {
        ensure_percentage("dialysisProgress", req.dialysis_progress)?;
        ensure_non_negative("totalDuration", req.total_duration)?;

        let session_id = self
            .ids
            .next(RecordKind::Session, req.patient_id.as_str())?
            .to_string();
        let session = Session::from_request(req, session_id, Utc::now());
        let stored = self
            .store
            .insert_one(SESSIONS_COLLECTION, to_document(&session)?)?;
        tracing::info!(
            "session {} started for patient {}",
            session.session_id,
            session.patient_id
        );
        Ok(from_document(stored)?)
    }

    /// Fetches a session by `sessionId`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if no session matches.
    pub fn get(&self, session_id: &str) -> RecordResult<Session> {
        match self
            .store
            .find_one(SESSIONS_COLLECTION, &Self::by_id(session_id))?
        {
            Some(doc) => Ok(from_document(doc)?),
            None => Err(RecordError::not_found("session", session_id)),
        }
    }

    /// Overwrites the supplied fields of a session and stamps `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if no session matches, or
    /// [`RecordError::Validation`] if a numeric field is out of range.
    pub fn update(&self, session_id: &str, changes: SessionUpdate) -> RecordResult<Session> {
        ensure_percentage("dialysisProgress", changes.dialysis_progress)?;
        ensure_non_negative("totalDuration", changes.total_duration)?;

        let mut update = Update::new().set("updatedAt", to_json(&Utc::now())?);
        if let Some(status) = changes.status {
            update = update.set("status", to_json(&status)?);
        }
        if let Some(start_time) = changes.start_time {
            update = update.set("startTime", to_json(&start_time)?);
        }
        if let Some(end_time) = changes.end_time {
            update = update.set("endTime", to_json(&end_time)?);
        }
        if let Some(total_duration) = changes.total_duration {
            update = update.set("totalDuration", total_duration);
        }
        if let Some(progress) = changes.dialysis_progress {
            update = update.set("dialysisProgress", progress);
        }

        self.apply(session_id, &update)?
            .ok_or_else(|| RecordError::not_found("session", session_id))
    }

    /// Lists a patient's sessions, most recent `startTime` first.
    pub fn list_for_patient(&self, patient_id: &str) -> RecordResult<Vec<Session>> {
        let query = FindQuery::new(Filter::equals("patientId", patient_id))
            .sort(Sort::descending("startTime"));
        decode_all(self.store.find(SESSIONS_COLLECTION, &query)?)
    }

    /// Appends an emergency event stamped with the current time.
    ///
    /// Earlier events are never modified.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if the session does not exist.
    pub fn append_emergency(&self, req: NewEmergencyEvent) -> RecordResult<Session> {
        let now = Utc::now();
        let event = EmergencyEvent {
            timestamp: now,
            kind: req.kind.into_inner(),
            magnitude: req.magnitude,
            response: req.response,
        };
        let update = Update::new()
            .push("emergencyEvents", to_json(&event)?)
            .set("updatedAt", to_json(&now)?);

        let session = self
            .apply(req.session_id.as_str(), &update)?
            .ok_or_else(|| RecordError::not_found("session", req.session_id.as_str()))?;
        tracing::warn!(
            "emergency event '{}' recorded on session {}",
            event.kind,
            session.session_id
        );
        Ok(session)
    }

    /// Overwrites the session's `dialysisProgress`.
    ///
    /// Returns `Ok(None)` if the session does not exist.
    pub fn set_progress(&self, session_id: &str, progress: f64) -> RecordResult<Option<Session>> {
        ensure_percentage("dialysisProgress", Some(progress))?;
        let update = Update::new()
            .set("dialysisProgress", progress)
            .set("updatedAt", to_json(&Utc::now())?);
        self.apply(session_id, &update)
    }

    fn apply(&self, session_id: &str, update: &Update) -> RecordResult<Option<Session>> {
        self.store
            .update_one(SESSIONS_COLLECTION, &Self::by_id(session_id), update)?
            .map(|doc| from_document(doc).map_err(RecordError::from))
            .transpose()
    }

    fn by_id(session_id: &str) -> Filter {
        Filter::equals("sessionId", session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;
    use crate::repositories::test_support::services;
    use crate::validation::decode_json;
    use serde_json::json;

    fn new_session(patient_id: &str, start: &str) -> NewSession {
        decode_json(json!({"patientId": patient_id, "startTime": start}))
            .expect("session body should decode")
    }

    fn emergency(session_id: &str, kind: &str) -> NewEmergencyEvent {
        decode_json(json!({
            "sessionId": session_id,
            "type": kind,
            "magnitude": 4.2,
            "response": "locks engaged"
        }))
        .expect("emergency body should decode")
    }

    #[test]
    fn test_create_generates_identifier_and_defaults() {
        let services = services();
        let session = services
            .sessions
            .create(new_session("P1", "2024-01-01T00:00:00Z"))
            .expect("create should succeed");

        let rest = session
            .session_id
            .strip_prefix("SES_")
            .expect("identifier should carry the SES_ prefix");
        let (millis, owner) = rest.split_once('_').expect("identifier should have an owner");
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(owner, "P1");
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.dialysis_progress, 0.0);
        assert!(session.emergency_events.is_empty());
    }

    #[test]
    fn test_back_to_back_creates_get_distinct_identifiers() {
        let services = services();
        let a = services
            .sessions
            .create(new_session("P1", "2024-01-01T00:00:00Z"))
            .unwrap();
        let b = services
            .sessions
            .create(new_session("P1", "2024-01-01T00:00:00Z"))
            .unwrap();

        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_create_rejects_out_of_range_progress() {
        let req: NewSession = decode_json(json!({
            "patientId": "P1",
            "startTime": "2024-01-01T00:00:00Z",
            "dialysisProgress": 140
        }))
        .unwrap();

        let err = services().sessions.create(req).unwrap_err();
        assert!(matches!(err, RecordError::Validation(msg) if msg.contains("dialysisProgress")));
    }

    #[test]
    fn test_unknown_status_fails_decoding() {
        let result = decode_json::<NewSession>(json!({
            "patientId": "P1",
            "startTime": "2024-01-01T00:00:00Z",
            "status": "paused"
        }));
        assert!(matches!(result, Err(RecordError::Validation(msg)) if msg.starts_with("status")));
    }

    #[test]
    fn test_list_for_patient_sorted_by_start_time_desc() {
        let services = services();
        for start in [
            "2024-01-02T08:00:00Z",
            "2024-01-03T08:00:00Z",
            "2024-01-01T08:00:00Z",
        ] {
            services.sessions.create(new_session("P1", start)).unwrap();
        }
        services
            .sessions
            .create(new_session("P2", "2024-02-01T08:00:00Z"))
            .unwrap();

        let sessions = services.sessions.list_for_patient("P1").unwrap();
        assert_eq!(sessions.len(), 3);
        assert!(sessions
            .windows(2)
            .all(|pair| pair[0].start_time >= pair[1].start_time));
        assert!(sessions.iter().all(|s| s.patient_id == "P1"));
    }

    #[test]
    fn test_update_overwrites_only_supplied_fields() {
        let services = services();
        let created = services
            .sessions
            .create(new_session("P1", "2024-01-01T00:00:00Z"))
            .unwrap();

        let changes: SessionUpdate =
            decode_json(json!({"status": "completed", "totalDuration": 240})).unwrap();
        let updated = services
            .sessions
            .update(&created.session_id, changes)
            .expect("update should succeed");

        assert_eq!(updated.status, SessionStatus::Completed);
        assert_eq!(updated.total_duration, Some(240.0));
        assert_eq!(updated.start_time, created.start_time);
        assert_eq!(updated.session_id, created.session_id);
        assert_eq!(updated.id, created.id);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_update_rejects_immutable_fields() {
        let result = decode_json::<SessionUpdate>(json!({"sessionId": "SES_1_X"}));
        assert!(matches!(result, Err(RecordError::Validation(msg)) if msg.contains("sessionId")));

        let result = decode_json::<SessionUpdate>(json!({"emergencyEvents": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_missing_session_is_not_found() {
        let err = services()
            .sessions
            .update("SES_1_P1", SessionUpdate::default())
            .unwrap_err();
        assert!(matches!(err, RecordError::NotFound { kind: "session", .. }));
    }

    #[test]
    fn test_append_emergency_grows_by_one_and_keeps_prior_events() {
        let services = services();
        let created = services
            .sessions
            .create(new_session("P1", "2024-01-01T00:00:00Z"))
            .unwrap();

        let first = services
            .sessions
            .append_emergency(emergency(&created.session_id, "seismic"))
            .expect("first append should succeed");
        assert_eq!(first.emergency_events.len(), 1);

        let second = services
            .sessions
            .append_emergency(emergency(&created.session_id, "power"))
            .expect("second append should succeed");
        assert_eq!(second.emergency_events.len(), 2);
        assert_eq!(second.emergency_events[0], first.emergency_events[0]);
        assert_eq!(second.emergency_events[1].kind, "power");
        assert!(second.emergency_events[1].timestamp >= second.emergency_events[0].timestamp);
    }

    #[test]
    fn test_append_emergency_ignores_client_timestamp() {
        let services = services();
        let created = services
            .sessions
            .create(new_session("P1", "2024-01-01T00:00:00Z"))
            .unwrap();
        let before = Utc::now();

        let req: NewEmergencyEvent = decode_json(json!({
            "sessionId": created.session_id,
            "type": "seismic",
            "timestamp": "1999-01-01T00:00:00Z"
        }))
        .unwrap();
        let session = services.sessions.append_emergency(req).unwrap();

        assert!(session.emergency_events[0].timestamp >= before);
    }

    #[test]
    fn test_append_emergency_missing_session_is_not_found() {
        let err = services()
            .sessions
            .append_emergency(emergency("SES_1_P1", "seismic"))
            .unwrap_err();
        assert!(matches!(err, RecordError::NotFound { .. }));
    }

    #[test]
    fn test_set_progress_on_missing_session_returns_none() {
        let result = services().sessions.set_progress("SES_1_P1", 50.0).unwrap();
        assert!(result.is_none());
    }
}
