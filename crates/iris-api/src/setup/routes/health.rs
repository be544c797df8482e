//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use iris_core::StorageBackend;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub registry: String,
    pub storage: String,
    pub storage_backend: StorageBackend,
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Registry and storage reachability.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let files = state.ingest.files.clone();
    let registry = run_check(TIMEOUT, async move { files.ping().await }, "unhealthy").await;

    let storage = state.ingest.storage.clone();
    let storage_status = run_check(TIMEOUT, async move { storage.probe().await }, "degraded").await;

    let healthy = registry == "healthy" && storage_status == "healthy";
    if !healthy {
        tracing::warn!(registry = %registry, storage = %storage_status, "Health check failed");
    }

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        registry,
        storage: storage_status,
        storage_backend: state.ingest.storage.backend_type(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
