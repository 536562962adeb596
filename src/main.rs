use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use dialysis_core::{ServiceConfig, ensure_indexes};
use dialysis_ids::RecordIdGenerator;
use dialysis_store::{DocumentStore, SledStore};

/// Main entry point for the dialysis record service
///
/// Resolves configuration, opens the document store, registers its unique indexes and only
/// then starts serving HTTP. On SIGINT or SIGTERM the server stops accepting connections,
/// drains in-flight requests and closes the store.
///
/// # Environment Variables
/// - `HOST`: bind host (default: "0.0.0.0")
/// - `PORT`: bind port (default: 3001)
/// - `DATABASE_URL`: store location, `sled://<path>` or a path (default: "sled://./dialysis_data")
/// - `STATIC_DIR`: directory served for non-API paths (default: "./public")
///
/// # Returns
/// * `Ok(())` - If the server runs and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, store startup, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dialysis=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = ServiceConfig::from_env_values(
        std::env::var("HOST").ok(),
        std::env::var("PORT").ok(),
        std::env::var("DATABASE_URL").ok(),
        std::env::var("STATIC_DIR").ok(),
    )?;

    tracing::info!("++ Opening document store at {}", cfg.database_path().display());
    let store = Arc::new(SledStore::open(cfg.database_path())?);
    ensure_indexes(store.as_ref())?;
    if let Some(location) = store.location() {
        tracing::info!("++ Document store ready at {}", location.display());
    }
    let store: Arc<dyn DocumentStore> = store;

    let state = AppState::new(store.clone(), Arc::new(RecordIdGenerator::new()));
    let app = api_rest::app(state, cfg.static_dir());

    let addr = cfg.bind_address();
    tracing::info!("++ Starting dialysis REST API on {}", addr);
    tracing::info!("++ Serving static assets from {}", cfg.static_dir().display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("-- Shutting down, closing document store");
    store.close()?;
    served?;

    Ok(())
}

/// Resolves when the process receives Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
