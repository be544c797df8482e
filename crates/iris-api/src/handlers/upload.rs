use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_id;
use crate::services::ingest::MultipartIngestor;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use iris_core::models::UploadResponse;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/files/upload/{story_id}",
    tag = "files",
    params(
        ("story_id" = Uuid, Path, description = "Story the files are attached to")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Files uploaded; failed files are omitted", body = UploadResponse),
        (status = 400, description = "Not a multipart request or malformed body", body = ErrorResponse),
        (status = 404, description = "Story not found", body = ErrorResponse),
        (status = 413, description = "File or request too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(story_id = %story_id, operation = "upload_files"))]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let story_id: Uuid = parse_id(&story_id, "Story")?;
    let orchestrator = state.orchestrator();

    // The story is resolved before the body is touched, so a missing story never writes.
    let story = orchestrator.ensure_story(story_id).await?;
    let mut ingestor = MultipartIngestor::new(multipart?, state.ingest.limits);

    let files = orchestrator.ingest_all(&story, &mut ingestor).await?;

    Ok(Json(UploadResponse {
        message: "Files uploaded successfully".to_string(),
        files,
    }))
}
