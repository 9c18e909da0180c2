use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub backend: String,
    pub workers: usize,
    pub pool_running: bool,
    pub queued: usize,
    pub scrape_limit: usize,
    pub poll_interval_ms: u64,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Health check");

    let service = &state.service;
    let response = HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: service.backend_name().to_string(),
        workers: service.worker_count(),
        pool_running: service.is_running(),
        queued: service.queued(),
        scrape_limit: state.config.scrape_limit,
        poll_interval_ms: state.config.poll_interval_ms,
    };

    (StatusCode::OK, Json(response))
}
