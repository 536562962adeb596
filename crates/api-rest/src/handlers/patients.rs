use crate::{ApiResult, AppState, ErrorResponse};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::Json;
use dialysis_core::decode_json;
use dialysis_core::models::{NewPatient, Patient};
use serde_json::Value;

#[utoipa::path(
    get,
    path = "/api/patients",
    responses(
        (status = 200, description = "List of patients", body = [Patient]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// List all patients in the system
///
/// # Errors
/// Returns `500 Internal Server Error` if the store cannot be queried.
#[axum::debug_handler]
pub async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.services.patients.list()?))
}

#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = NewPatient,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid or duplicate patient", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Create a new patient record
///
/// # Arguments
/// * `body` - Patient document without timestamps
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - `patientId`, `name` or `age` is missing or mistyped,
/// - a patient with the same `patientId` already exists.
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let Json(body) = body?;
    let req: NewPatient = decode_json(body)?;
    let patient = state.services.patients.create(req)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{patientId}",
    params(("patientId" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Patient found", body = Patient),
        (status = 404, description = "Patient not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Fetch one patient by `patientId`.
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
) -> ApiResult<Json<Patient>> {
    let AxumPath(patient_id) = path?;
    Ok(Json(state.services.patients.get(&patient_id)?))
}
