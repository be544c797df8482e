use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_id;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use iris_core::models::{FileEnvelope, FileListResponse};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/files/story/{story_id}",
    tag = "files",
    params(
        ("story_id" = Uuid, Path, description = "Story ID")
    ),
    responses(
        (status = 200, description = "Files of the story, newest first", body = FileListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(story_id = %story_id, operation = "list_story_files"))]
pub async fn list_story_files(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    // An unknown or malformed story id simply has no files.
    let files = match Uuid::parse_str(&story_id) {
        Ok(story_id) => state.orchestrator().list(story_id).await?,
        Err(_) => Vec::new(),
    };
    Ok(Json(FileListResponse { files }))
}

#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File with its owning story", body = FileEnvelope),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(file_id = %id, operation = "get_file"))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id: Uuid = parse_id(&id, "File")?;
    let file = state.orchestrator().get(id).await?;
    Ok(Json(FileEnvelope { file }))
}
