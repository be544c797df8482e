//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use iris_core::models;

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Iris Files API",
        version = "0.1.0",
        description = "Ingestion of story files: multipart uploads to object storage, linked to file metadata rows that can be listed, read, updated and deleted."
    ),
    paths(
        handlers::upload::upload_files,
        handlers::file_get::list_story_files,
        handlers::file_get::get_file,
        handlers::file_update::update_file,
        handlers::file_delete::delete_file,
        handlers::storage_probe::test_storage,
    ),
    components(
        schemas(
            models::FileType,
            models::FileSummary,
            models::FileResponse,
            models::StorySummary,
            models::UploadResponse,
            models::FileListResponse,
            models::FileEnvelope,
            models::UpdateFileRequest,
            models::MessageResponse,
            handlers::storage_probe::StorageProbeResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "files", description = "Story file ingestion and management")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_file_routes() {
        let spec = get_openapi_spec();
        for path in [
            "/files/upload/{story_id}",
            "/files/story/{story_id}",
            "/files/{id}",
            "/files/test",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
