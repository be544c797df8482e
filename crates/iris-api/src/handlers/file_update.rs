use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::parse_id;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use iris_core::models::{FileEnvelope, FilePatch, UpdateFileRequest};
use iris_core::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    put,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "File updated", body = FileEnvelope),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(file_id = %id, operation = "update_file"))]
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateFileRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id: Uuid = parse_id(&id, "File")?;
    request.validate().map_err(AppError::from)?;

    let patch = FilePatch::from(request);
    let file = state.orchestrator().update(id, patch).await?;
    Ok(Json(FileEnvelope { file }))
}
