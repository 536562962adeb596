use crate::{ApiResult, AppState, ErrorResponse};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path as AxumPath, Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use dialysis_core::models::PatientAnalytics;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalyticsParams {
    /// Inclusive lower bound on reading `timestamp` (RFC 3339).
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on reading `timestamp` (RFC 3339).
    pub end_date: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/analytics/patient/{patientId}",
    params(
        ("patientId" = String, Path, description = "Patient identifier"),
        AnalyticsParams
    ),
    responses(
        (status = 200, description = "Aggregate over the patient's readings, or `{}` when there are none", body = PatientAnalytics),
        (status = 400, description = "Malformed query string", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Aggregate a patient's readings
///
/// Returns average heart rate, dialysis progress and flow rate, the reading count and the
/// largest seismic magnitude. A patient with no readings in range yields `{}`.
#[axum::debug_handler]
pub async fn patient_analytics(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
    params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let AxumPath(patient_id) = path?;
    let Query(params) = params?;
    let summary = state.services.analytics.patient_summary(
        &patient_id,
        params.start_date,
        params.end_date,
    )?;

    let body = match summary {
        Some(summary) => serde_json::to_value(summary)
            .map_err(|e| dialysis_core::RecordError::Internal(e.to_string()))?,
        None => json!({}),
    };
    Ok(Json(body))
}
