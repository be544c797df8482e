use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use iris_core::StorageBackend;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StorageProbeResponse {
    pub message: String,
    #[schema(value_type = String)]
    pub backend: StorageBackend,
}

#[utoipa::path(
    get,
    path = "/files/test",
    tag = "files",
    responses(
        (status = 200, description = "Storage backend reachable", body = StorageProbeResponse),
        (status = 500, description = "Storage connection failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn test_storage(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let backend = state.orchestrator().probe_storage().await?;
    Ok(Json(StorageProbeResponse {
        message: "Storage connection working".to_string(),
        backend,
    }))
}
