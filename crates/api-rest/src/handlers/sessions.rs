use crate::{ApiResult, AppState, ErrorResponse};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::Json;
use dialysis_core::decode_json;
use dialysis_core::models::{NewSession, Session, SessionUpdate};
use serde_json::Value;

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = NewSession,
    responses(
        (status = 201, description = "Session created", body = Session),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Start a dialysis session
///
/// The server generates `sessionId` as `SES_<epoch-millis>_<patientId>`.
#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let Json(body) = body?;
    let req: NewSession = decode_json(body)?;
    let session = state.services.sessions.create(req)?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{sessionId}",
    params(("sessionId" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session found", body = Session),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
) -> ApiResult<Json<Session>> {
    let AxumPath(session_id) = path?;
    Ok(Json(state.services.sessions.get(&session_id)?))
}

#[utoipa::path(
    patch,
    path = "/api/sessions/{sessionId}",
    params(("sessionId" = String, Path, description = "Session identifier")),
    request_body = SessionUpdate,
    responses(
        (status = 200, description = "Session updated", body = Session),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
/// Partially update a session
///
/// Only `status`, `startTime`, `endTime`, `totalDuration` and `dialysisProgress` may be
/// supplied. Any other field is rejected with `400 Bad Request`.
#[axum::debug_handler]
pub async fn update_session(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Session>> {
    let AxumPath(session_id) = path?;
    let Json(body) = body?;
    let changes: SessionUpdate = decode_json(body)?;
    Ok(Json(state.services.sessions.update(&session_id, changes)?))
}

#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/sessions",
    params(("patientId" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Sessions, most recent start first", body = [Session]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Session history for a patient, sorted by `startTime` descending.
#[axum::debug_handler]
pub async fn list_patient_sessions(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
) -> ApiResult<Json<Vec<Session>>> {
    let AxumPath(patient_id) = path?;
    Ok(Json(state.services.sessions.list_for_patient(&patient_id)?))
}
