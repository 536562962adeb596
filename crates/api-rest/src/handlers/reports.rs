use crate::{ApiResult, AppState, ErrorResponse};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::Json;
use dialysis_core::decode_json;
use dialysis_core::models::{NewReport, Report};
use serde_json::Value;

#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = NewReport,
    responses(
        (status = 201, description = "Report archived", body = Report),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
/// Archive a report
///
/// The server generates `reportId` as `RPT_<epoch-millis>_<patientId>`. The summary is
/// stored as supplied; nothing is recomputed.
#[axum::debug_handler]
pub async fn create_report(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let Json(body) = body?;
    let req: NewReport = decode_json(body)?;
    let report = state.services.reports.create(req)?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/api/reports/{reportId}",
    params(("reportId" = String, Path, description = "Report identifier")),
    responses(
        (status = 200, description = "Report found", body = Report),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_report(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
) -> ApiResult<Json<Report>> {
    let AxumPath(report_id) = path?;
    Ok(Json(state.services.reports.get(&report_id)?))
}

#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/reports",
    params(("patientId" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Reports, newest first", body = [Report]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_patient_reports(
    State(state): State<AppState>,
    path: Result<AxumPath<String>, PathRejection>,
) -> ApiResult<Json<Vec<Report>>> {
    let AxumPath(patient_id) = path?;
    Ok(Json(state.services.reports.list_for_patient(&patient_id)?))
}
