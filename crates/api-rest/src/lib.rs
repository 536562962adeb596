//! # API REST
//!
//! REST API implementation for the dialysis record service.
//!
//! Handles:
//! - HTTP endpoints with axum under `/api`
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON error bodies, CORS, request tracing, panic recovery)
//! - static asset serving for every other path
//!
//! Record semantics live in `dialysis-core`; handlers decode the request, call one service
//! operation and shape the response.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult, ErrorResponse};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use dialysis_core::{DocumentStore, RecordServices};
use dialysis_ids::RecordIdGenerator;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use dialysis_core::models;
use handlers::{analytics, emergency, health, patients, readings, reports, sessions};

/// Application state for the REST API server
///
/// Shared by every handler. Holds the store handle (for health checks) and the record services
/// built on top of it.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub services: RecordServices,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, ids: Arc<RecordIdGenerator>) -> Self {
        Self {
            services: RecordServices::new(store.clone(), ids),
            store,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::health,
        patients::list_patients,
        patients::create_patient,
        patients::get_patient,
        sessions::list_patient_sessions,
        sessions::create_session,
        sessions::get_session,
        sessions::update_session,
        readings::record_reading,
        readings::query_readings,
        reports::create_report,
        reports::get_report,
        reports::list_patient_reports,
        emergency::append_emergency,
        analytics::patient_analytics,
    ),
    components(schemas(
        ErrorResponse,
        health::RootRes,
        health::HealthRes,
        readings::RecordReadingRes,
        emergency::EmergencyRes,
        models::Patient,
        models::NewPatient,
        models::EmergencyContact,
        models::Session,
        models::NewSession,
        models::SessionUpdate,
        models::SessionStatus,
        models::EmergencyEvent,
        models::NewEmergencyEvent,
        models::Reading,
        models::NewReading,
        models::VitalSigns,
        models::FluidManagement,
        models::Stabilization,
        models::Environmental,
        models::Seismic,
        models::Report,
        models::NewReport,
        models::ReportSummary,
        models::PatientAnalytics,
    ))
)]
pub struct ApiDoc;

/// Build the full application router.
///
/// # Arguments
///
/// * `state` - Shared handler state.
/// * `static_dir` - Directory served for any path not matched by an API route. Dotfiles
///   under it are never served.
///
/// # Returns
///
/// A router with API routes, Swagger UI, the static fallback and all middleware applied.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let api = Router::new()
        .route("/api", get(health::root))
        .route("/api/health", get(health::health))
        .route(
            "/api/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route("/api/patients/:patientId", get(patients::get_patient))
        .route(
            "/api/patients/:patientId/sessions",
            get(sessions::list_patient_sessions),
        )
        .route(
            "/api/patients/:patientId/reports",
            get(reports::list_patient_reports),
        )
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:sessionId",
            get(sessions::get_session).patch(sessions::update_session),
        )
        .route("/api/readings", post(readings::record_reading))
        .route("/api/readings/:sessionId", get(readings::query_readings))
        .route("/api/reports", post(reports::create_report))
        .route("/api/reports/:reportId", get(reports::get_report))
        .route("/api/emergency", post(emergency::append_emergency))
        .route(
            "/api/analytics/patient/:patientId",
            get(analytics::patient_analytics),
        )
        .fallback_service(
            ServiceBuilder::new()
                .layer(middleware::from_fn(hide_dotfiles))
                .service(ServeDir::new(static_dir)),
        )
        .with_state(state);

    with_middleware(
        api.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())),
    )
}

/// Answers 404 for any static path with a segment starting with `.` (`/.env`, `/.git/config`).
async fn hide_dotfiles(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    });
    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// Apply CORS, request tracing and panic recovery to `router`.
///
/// Panic recovery is outermost so a panic anywhere below still yields a JSON 500.
pub fn with_middleware(router: Router) -> Router {
    router
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: error::INTERNAL_ERROR_MESSAGE.into(),
        }),
    )
        .into_response()
}
