use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_id;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use iris_core::models::MessageResponse;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File and stored object deleted", body = MessageResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Stored object could not be deleted; the file is kept", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_id = %id, operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id: Uuid = parse_id(&id, "File")?;
    state.orchestrator().delete(id).await?;
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
