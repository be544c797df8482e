//! Domain methods for the Iris API client.
//!
//! Response types come from `iris_core::models`; the storage probe body is
//! defined here since the server keeps it private.

use crate::transport::UploadFile;
use crate::ApiClient;
use anyhow::{Context, Result};
use iris_core::constants::UPLOAD_FIELD_NAME;
use iris_core::models::{
    FileEnvelope, FileListResponse, FileResponse, MessageResponse, UpdateFileRequest,
    UploadResponse,
};
use uuid::Uuid;

/// Body of `GET /files/test`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct StorageProbe {
    pub message: String,
    pub backend: String,
}

impl ApiClient {
    /// Upload files to a story in one multipart request, field `files` per part.
    pub async fn upload_files(
        &self,
        story_id: Uuid,
        files: &[UploadFile],
    ) -> Result<UploadResponse> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.data.to_vec())
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .with_context(|| format!("Invalid MIME type for {}", file.name))?;
            form = form.part(UPLOAD_FIELD_NAME, part);
        }

        tracing::debug!(story_id = %story_id, count = files.len(), "Uploading files");
        self.post_multipart(&format!("/files/upload/{}", story_id), form)
            .await
    }

    /// Files of a story, newest first.
    pub async fn story_files(&self, story_id: Uuid) -> Result<Vec<FileResponse>> {
        let body: FileListResponse = self.get(&format!("/files/story/{}", story_id)).await?;
        Ok(body.files)
    }

    pub async fn get_file(&self, id: Uuid) -> Result<FileResponse> {
        let body: FileEnvelope = self.get(&format!("/files/{}", id)).await?;
        Ok(body.file)
    }

    pub async fn update_file(&self, id: Uuid, update: &UpdateFileRequest) -> Result<FileResponse> {
        let body: FileEnvelope = self.put_json(&format!("/files/{}", id), update).await?;
        Ok(body.file)
    }

    pub async fn delete_file(&self, id: Uuid) -> Result<()> {
        let _: MessageResponse = self.delete(&format!("/files/{}", id)).await?;
        Ok(())
    }

    pub async fn test_storage(&self) -> Result<StorageProbe> {
        self.get("/files/test").await
    }
}
