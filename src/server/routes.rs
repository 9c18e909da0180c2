use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::errors::LsqError;
use crate::models::NewScrapeJob;

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn error_response(status: StatusCode, error: &str, message: &str) -> impl IntoResponse {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
}

fn service_error(err: &LsqError) -> axum::response::Response {
    let (status, code) = match err {
        LsqError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        LsqError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    error_response(status, code, &err.to_string()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    pub owner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PoolStatus {
    pub running: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/jobs
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewScrapeJob>,
) -> impl IntoResponse {
    match state.service.submit(request).await {
        Ok(job) => (StatusCode::ACCEPTED, Json(job)).into_response(),
        Err(e) => {
            tracing::warn!("Job submission rejected: {}", e);
            service_error(&e)
        }
    }
}

/// GET /api/jobs?owner=
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> impl IntoResponse {
    let Some(owner) = params.owner.filter(|o| !o.trim().is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Query parameter 'owner' is required",
        )
        .into_response();
    };

    match state.service.list_by_owner(owner.trim()).await {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(e) => {
            tracing::error!("Failed to list jobs for {}: {}", owner, e);
            service_error(&e)
        }
    }
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(uuid) = Uuid::parse_str(&id) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            &format!("'{}' is not a valid job id", id),
        )
        .into_response();
    };

    match state.service.get(uuid).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job)).into_response(),
        Ok(None) => service_error(&LsqError::NotFound(format!("Job with id '{}'", id))),
        Err(e) => {
            tracing::error!("Failed to fetch job {}: {}", id, e);
            service_error(&e)
        }
    }
}

/// POST /api/pool/start
pub async fn start_pool(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.service.start();
    (
        StatusCode::OK,
        Json(PoolStatus {
            running: state.service.is_running(),
        }),
    )
}

/// POST /api/pool/stop
pub async fn stop_pool(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.service.stop();
    (
        StatusCode::OK,
        Json(PoolStatus {
            running: state.service.is_running(),
        }),
    )
}

/// POST /api/shutdown
pub async fn shutdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!("Shutdown requested");

    if let Some(ref tx) = state.shutdown_tx {
        let _ = tx.send(());
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": "Shutdown initiated",
        })),
    )
}
