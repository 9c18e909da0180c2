pub mod health;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::daemon::service::ScrapeService;
use crate::models::DaemonConfig;

/// Shared application state for the Axum server.
pub struct AppState {
    pub service: Arc<ScrapeService>,
    pub config: Arc<DaemonConfig>,
    pub start_time: Instant,
    pub shutdown_tx: Option<tokio::sync::watch::Sender<()>>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/jobs", get(routes::list_jobs).post(routes::submit_job))
        .route("/api/jobs/{id}", get(routes::get_job))
        .route("/api/pool/start", post(routes::start_pool))
        .route("/api/pool/stop", post(routes::stop_pool))
        .route("/api/shutdown", post(routes::shutdown))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}
