use crate::validation::NonEmptyText;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    /// Percentage; when present it is copied onto the owning session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialysis_progress: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FluidManagement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_drop: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ultrafiltration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid_removed: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stabilization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gyro_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dampening: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_tilt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_locks: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Environmental {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_supply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_battery: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Seismic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_wave_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event: Option<String>,
}

/// Request body for recording a reading.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    #[schema(value_type = String, example = "SES_1704067200000_P1")]
    pub session_id: NonEmptyText,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub fluid_management: Option<FluidManagement>,
    #[serde(default)]
    pub stabilization: Option<Stabilization>,
    #[serde(default)]
    pub environmental: Option<Environmental>,
    #[serde(default)]
    pub seismic: Option<Seismic>,
}

impl NewReading {
    /// The progress value this reading reports, if any.
    pub fn reported_progress(&self) -> Option<f64> {
        self.vital_signs.as_ref().and_then(|v| v.dialysis_progress)
    }
}

/// A stored sensor reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid_management: Option<FluidManagement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilization: Option<Stabilization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental: Option<Environmental>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seismic: Option<Seismic>,
    pub created_at: DateTime<Utc>,
}

impl Reading {
    pub fn from_request(req: NewReading, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            session_id: req.session_id.into_inner(),
            timestamp: req.timestamp,
            vital_signs: req.vital_signs,
            fluid_management: req.fluid_management,
            stabilization: req.stabilization,
            environmental: req.environmental,
            seismic: req.seismic,
            created_at: now,
        }
    }
}
