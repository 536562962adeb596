use crate::validation::NonEmptyText;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Emergency contact details. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// Request body for creating a patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    #[schema(value_type = String, example = "P1")]
    pub patient_id: NonEmptyText,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    pub age: u32,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
}

/// A stored patient record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Build the record to insert, stamping both timestamps with `now`.
    pub fn from_request(req: NewPatient, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            patient_id: req.patient_id.into_inner(),
            name: req.name.into_inner(),
            age: req.age,
            medical_history: req.medical_history,
            emergency_contact: req.emergency_contact,
            created_at: now,
            updated_at: now,
        }
    }
}
