//! Record models.
//!
//! Each entity has a request form (`New*`), decoded from the request body, and a stored form
//! carrying the store-assigned `_id` plus server-generated fields. All JSON names are camelCase.

pub mod patient;
pub mod reading;
pub mod report;
pub mod session;

pub use patient::{EmergencyContact, NewPatient, Patient};
pub use reading::{
    Environmental, FluidManagement, NewReading, Reading, Seismic, Stabilization, VitalSigns,
};
pub use report::{NewReport, Report, ReportSummary};
pub use session::{
    EmergencyEvent, NewEmergencyEvent, NewSession, Session, SessionStatus, SessionUpdate,
};

/// Aggregate statistics over a patient's readings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientAnalytics {
    pub avg_heart_rate: Option<f64>,
    pub avg_dialysis_progress: Option<f64>,
    pub avg_flow_rate: Option<f64>,
    pub total_readings: u64,
    pub max_seismic_magnitude: Option<f64>,
}
