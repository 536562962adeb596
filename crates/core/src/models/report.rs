use crate::validation::NonEmptyText;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Human-readable summary lines. The service stores them as given.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid_removed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seismic_events: Option<String>,
}

/// Request body for archiving a report.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[schema(value_type = String, example = "P1")]
    pub patient_id: NonEmptyText,
    #[serde(default)]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub summary: ReportSummary,
    #[serde(default)]
    pub emergency_incidents: Vec<String>,
    #[serde(default)]
    pub recommendations: Option<String>,
}

/// A stored report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[schema(example = "RPT_1704067200000_P1")]
    pub report_id: String,
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub summary: ReportSummary,
    #[serde(default)]
    pub emergency_incidents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn from_request(req: NewReport, report_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            report_id,
            patient_id: req.patient_id.into_inner(),
            session_id: req.session_id,
            timestamp: req.timestamp,
            summary: req.summary,
            emergency_incidents: req.emergency_incidents,
            recommendations: req.recommendations,
            created_at: now,
        }
    }
}
