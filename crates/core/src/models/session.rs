use crate::validation::NonEmptyText;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    EmergencyStopped,
    Interrupted,
}

/// One entry of a session's append-only emergency log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyEvent {
    /// Time the server received the event.
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Request body for creating a session.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    #[schema(value_type = String, example = "P1")]
    pub patient_id: NonEmptyText,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    /// Minutes.
    #[serde(default)]
    pub total_duration: Option<f64>,
    #[serde(default)]
    pub dialysis_progress: Option<f64>,
}

/// Request body for a partial session update.
///
/// Only the listed fields may be changed; anything else in the body is rejected.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialysis_progress: Option<f64>,
}

/// Request body for appending an emergency event.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergencyEvent {
    #[schema(value_type = String)]
    pub session_id: NonEmptyText,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "seismic")]
    pub kind: NonEmptyText,
    #[serde(default)]
    pub magnitude: Option<f64>,
    #[serde(default)]
    pub response: Option<String>,
}

/// A stored dialysis session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[schema(example = "SES_1704067200000_P1")]
    pub session_id: String,
    pub patient_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    #[serde(default)]
    pub dialysis_progress: f64,
    #[serde(default)]
    pub emergency_events: Vec<EmergencyEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Build the record to insert under `session_id`.
    pub fn from_request(req: NewSession, session_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            session_id,
            patient_id: req.patient_id.into_inner(),
            start_time: req.start_time,
            end_time: req.end_time,
            status: req.status.unwrap_or_default(),
            total_duration: req.total_duration,
            dialysis_progress: req.dialysis_progress.unwrap_or(0.0),
            emergency_events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
