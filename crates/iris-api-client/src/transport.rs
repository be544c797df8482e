//! Client-side upload handle.
//!
//! Holds the files a user picked (or a finished recording) and sends them to a
//! story in a single request. One upload runs at a time per handle.

use async_trait::async_trait;
use bytes::Bytes;
use iris_capture::Recording;
use iris_core::constants::{MAX_PARTS_PER_REQUEST, MAX_PART_SIZE_BYTES};
use iris_core::models::{FileSummary, UploadResponse};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::ApiClient;

/// One payload to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

impl From<&Recording> for UploadFile {
    fn from(recording: &Recording) -> Self {
        Self {
            name: recording.filename.clone(),
            mime_type: recording.mime_type.clone(),
            data: recording.data.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Pending,
    Success,
    Failed,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Idle => write!(f, "idle"),
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Success => write!(f, "success"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No files selected")]
    EmptySelection,

    #[error("File '{name}' exceeds maximum allowed size of {max_mb} MB")]
    FileTooLarge { name: String, max_mb: usize },

    #[error("At most {0} files may be uploaded at once")]
    TooManyFiles(usize),

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Sends a batch of files to a story.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, story_id: Uuid, files: &[UploadFile]) -> anyhow::Result<UploadResponse>;
}

#[async_trait]
impl FileUploader for ApiClient {
    async fn upload(&self, story_id: Uuid, files: &[UploadFile]) -> anyhow::Result<UploadResponse> {
        self.upload_files(story_id, files).await
    }
}

pub struct UploadTransport<U> {
    uploader: U,
    selection: Vec<UploadFile>,
    status: UploadStatus,
    error: Option<String>,
}

impl<U: FileUploader> UploadTransport<U> {
    pub fn new(uploader: U) -> Self {
        Self {
            uploader,
            selection: Vec::new(),
            status: UploadStatus::Idle,
            error: None,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Human-readable reason for the last failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selection(&self) -> &[UploadFile] {
        &self.selection
    }

    /// Add picked or dropped files. Nothing is added if any file is rejected.
    pub fn select(&mut self, files: Vec<UploadFile>) -> Result<(), TransportError> {
        match self.check_selection(self.selection.len(), &files) {
            Ok(()) => {
                self.selection.extend(files);
                self.error = None;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn check_selection(
        &self,
        existing: usize,
        files: &[UploadFile],
    ) -> Result<(), TransportError> {
        if existing + files.len() > MAX_PARTS_PER_REQUEST {
            return Err(TransportError::TooManyFiles(MAX_PARTS_PER_REQUEST));
        }
        if let Some(file) = files.iter().find(|f| f.data.len() > MAX_PART_SIZE_BYTES) {
            return Err(TransportError::FileTooLarge {
                name: file.name.clone(),
                max_mb: MAX_PART_SIZE_BYTES / 1024 / 1024,
            });
        }
        Ok(())
    }

    /// Replace the selection with a finished recording. A rejected recording
    /// leaves the selection as it was.
    pub fn select_recording(&mut self, recording: &Recording) -> Result<(), TransportError> {
        let files = vec![UploadFile::from(recording)];
        match self.check_selection(0, &files) {
            Ok(()) => {
                self.selection = files;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn clear(&mut self) {
        self.selection.clear();
        self.status = UploadStatus::Idle;
        self.error = None;
    }

    /// Upload the selection to `story_id`. The selection is cleared on success
    /// and kept on failure so the user can retry.
    pub async fn upload(&mut self, story_id: Uuid) -> Result<Vec<FileSummary>, TransportError> {
        if self.selection.is_empty() {
            self.error = Some(TransportError::EmptySelection.to_string());
            return Err(TransportError::EmptySelection);
        }

        self.status = UploadStatus::Pending;
        self.error = None;

        match self.uploader.upload(story_id, &self.selection).await {
            Ok(response) => {
                tracing::info!(
                    story_id = %story_id,
                    sent = self.selection.len(),
                    stored = response.files.len(),
                    "Upload finished"
                );
                self.selection.clear();
                self.status = UploadStatus::Success;
                Ok(response.files)
            }
            Err(err) => {
                tracing::warn!(story_id = %story_id, error = %err, "Upload failed");
                let message = err.to_string();
                self.status = UploadStatus::Failed;
                self.error = Some(message.clone());
                Err(TransportError::Upload(message))
            }
        }
    }

    pub async fn upload_recording(
        &mut self,
        story_id: Uuid,
        recording: &Recording,
    ) -> Result<Vec<FileSummary>, TransportError> {
        self.select_recording(recording)?;
        self.upload(story_id).await
    }
}
