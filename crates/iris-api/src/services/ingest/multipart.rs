use async_trait::async_trait;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use iris_core::constants::UPLOAD_FIELD_NAME;
use iris_core::{AppError, Config};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Per-request upload limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_part_size_bytes: usize,
    pub max_parts_per_request: usize,
}

impl UploadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_part_size_bytes: config.max_part_size_bytes(),
            max_parts_per_request: config.max_parts_per_request(),
        }
    }
}

/// A file part read completely into memory.
#[derive(Debug, Clone)]
pub struct BufferedFile {
    pub original_name: String,
    /// Declared content type of the part, used verbatim when storing.
    pub content_type: String,
    pub data: Bytes,
}

impl BufferedFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Yields file parts in arrival order.
#[async_trait]
pub trait PartSource: Send {
    /// Next file part, or `None` once the body is exhausted.
    async fn next_file(&mut self) -> Result<Option<BufferedFile>, AppError>;
}

/// Streams a multipart body part by part.
///
/// Only parts under the `files` field are read; other fields and parts without a
/// filename are skipped. Each file part is
/// buffered up to `max_part_size_bytes`; one more file part than
/// `max_parts_per_request` fails the request.
pub struct MultipartIngestor {
    multipart: Multipart,
    limits: UploadLimits,
    files_read: usize,
}

impl MultipartIngestor {
    pub fn new(multipart: Multipart, limits: UploadLimits) -> Self {
        Self {
            multipart,
            limits,
            files_read: 0,
        }
    }
}

#[async_trait]
impl PartSource for MultipartIngestor {
    async fn next_file(&mut self) -> Result<Option<BufferedFile>, AppError> {
        while let Some(field) = self.multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(UPLOAD_FIELD_NAME) {
                tracing::debug!(field = ?field.name(), "Skipping part outside the upload field");
                continue;
            }
            let Some(original_name) = field.file_name().map(str::to_string) else {
                tracing::debug!(field = ?field.name(), "Skipping non-file part");
                continue;
            };
            if original_name.trim().is_empty() {
                tracing::debug!(field = ?field.name(), "Skipping file part without a filename");
                continue;
            }

            if self.files_read >= self.limits.max_parts_per_request {
                return Err(AppError::PayloadTooLarge(format!(
                    "At most {} files may be uploaded per request",
                    self.limits.max_parts_per_request
                )));
            }

            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            let data = buffer_field(field, &original_name, self.limits.max_part_size_bytes).await?;
            self.files_read += 1;

            tracing::debug!(
                original_name = %original_name,
                content_type = %content_type,
                size = data.len(),
                "File part buffered"
            );

            return Ok(Some(BufferedFile {
                original_name,
                content_type,
                data,
            }));
        }
        Ok(None)
    }
}

async fn buffer_field(
    mut field: Field<'_>,
    original_name: &str,
    max_part_size_bytes: usize,
) -> Result<Bytes, AppError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buffer.len() + chunk.len() > max_part_size_bytes {
            tracing::warn!(
                original_name = %original_name,
                max_part_size_bytes,
                "File part exceeds size limit"
            );
            return Err(AppError::PayloadTooLarge(format!(
                "File '{}' exceeds maximum allowed size of {} MB",
                original_name,
                max_part_size_bytes / 1024 / 1024
            )));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

/// Body-limit failures surface as 413, anything else as a malformed request.
fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("Failed to read multipart body: {}", err.body_text()))
    }
}
