use crate::AppState;
use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use dialysis_core::Connectivity;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct RootRes {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    /// Always `OK` when the process answers.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// `connected` or `disconnected`.
    #[schema(value_type = String, example = "connected")]
    pub database: Connectivity,
}

#[utoipa::path(
    get,
    path = "/api",
    responses(
        (status = 200, description = "Liveness message", body = RootRes)
    )
)]
/// Liveness probe.
#[axum::debug_handler]
pub async fn root() -> Json<RootRes> {
    Json(RootRes {
        message: "Dialysis Monitoring API".into(),
    })
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Reports the store connection state. This endpoint always answers 200; a disconnected
/// store is reported in the body rather than as a failure.
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        status: "OK".into(),
        timestamp: Utc::now(),
        database: state.store.ping(),
    })
}
