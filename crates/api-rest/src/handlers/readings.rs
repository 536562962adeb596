use crate::{ApiResult, AppState, ErrorResponse};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use dialysis_core::decode_json;
use dialysis_core::models::{NewReading, Reading};
use dialysis_core::repositories::ReadingQuery;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordReadingRes {
    pub success: bool,
    pub reading_id: String,
}

/// Query string of `GET /api/readings/{sessionId}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReadingsParams {
    /// Maximum number of readings (default 100).
    pub limit: Option<usize>,
    /// Inclusive lower bound on `timestamp` (RFC 3339).
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp` (RFC 3339).
    pub end_time: Option<DateTime<Utc>>,
}

impl From<ReadingsParams> for ReadingQuery {
    fn from(params: ReadingsParams) -> Self {
        ReadingQuery {
            start_time: params.start_time,
            end_time: params.end_time,
            limit: params.limit,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/readings",
    request_body = NewReading,
    responses(
        (status = 201, description = "Reading stored", body = RecordReadingRes),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Ingest one sensor reading
///
/// When the reading carries `vitalSigns.dialysisProgress`, the owning session's
/// `dialysisProgress` is updated afterwards. That update is best effort: the reading is kept
/// and `201 Created` returned even if it fails.
#[axum::debug_handler]
pub async fn record_reading(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecordReadingRes>)> {
    let Json(body) = body?;
    let req: NewReading = decode_json(body)?;
    let recorded = state.services.readings.record(req)?;
    tracing::debug!(
        "reading {} stored, progress sync: {:?}",
        recorded.reading_id,
        recorded.progress_sync
    );

    Ok((
        StatusCode::CREATED,
        Json(RecordReadingRes {
            success: true,
            reading_id: recorded.reading_id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/readings/{sessionId}",
    params(
        ("sessionId" = String, Path, description = "Session identifier"),
        ReadingsParams
    ),
    responses(
        (status = 200, description = "Readings, newest first", body = [Reading]),
        (status = 400, description = "Malformed query string", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Readings for a session, sorted by `timestamp` descending and truncated to `limit`.
#[axum::debug_handler]
pub async fn query_readings(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
    params: Result<Query<ReadingsParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Reading>>> {
    let AxumPath(session_id) = path?;
    let Query(params) = params?;
    let readings = state
        .services
        .readings
        .query(&session_id, &ReadingQuery::from(params))?;
    Ok(Json(readings))
}
