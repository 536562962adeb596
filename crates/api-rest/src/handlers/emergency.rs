use crate::{ApiResult, AppState, ErrorResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use dialysis_core::decode_json;
use dialysis_core::models::{NewEmergencyEvent, Session};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct EmergencyRes {
    pub success: bool,
    pub session: Session,
}

#[utoipa::path(
    post,
    path = "/api/emergency",
    request_body = NewEmergencyEvent,
    responses(
        (status = 200, description = "Event appended", body = EmergencyRes),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
/// Append an emergency event to a session
///
/// The event timestamp is the time the request was received; any client-supplied timestamp is
/// ignored.
#[axum::debug_handler]
pub async fn append_emergency(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<EmergencyRes>> {
    let Json(body) = body?;
    let req: NewEmergencyEvent = decode_json(body)?;
    let session = state.services.sessions.append_emergency(req)?;
    Ok(Json(EmergencyRes {
        success: true,
        session,
    }))
}
