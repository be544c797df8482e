use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::story::StorySummary;

/// Kind of an ingested file, derived from its declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Image,
    Audio,
    Video,
    Document,
    WebClip,
    Note,
}

/// Map a declared MIME type to a [`FileType`].
///
/// `image/*`, `audio/*` and `video/*` map to their own kinds. Everything else,
/// including unknown and empty types, is a document. Uploads never produce
/// `WebClip` or `Note`; those rows are created outside the ingestion pipeline.
pub fn derive_file_type(mime_type: &str) -> FileType {
    let mime = mime_type.trim().to_ascii_lowercase();
    if mime.starts_with("image/") {
        FileType::Image
    } else if mime.starts_with("audio/") {
        FileType::Audio
    } else if mime.starts_with("video/") {
        FileType::Video
    } else {
        FileType::Document
    }
}

/// A file row as held by the metadata registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct IngestedFile {
    pub id: Uuid,
    /// Generated, storage-safe name (last segment of `storage_path`).
    pub filename: String,
    pub original_name: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub storage_path: String,
    pub story_id: Uuid,
    pub extracted_text: Option<String>,
    pub transcription: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a row once the object is stored.
#[derive(Debug, Clone)]
pub struct NewIngestedFile {
    pub filename: String,
    pub original_name: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub storage_path: String,
    pub story_id: Uuid,
}

/// Registry-level patch. `None` leaves a field untouched; `Some("")` clears a text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePatch {
    pub filename: Option<String>,
    pub extracted_text: Option<String>,
    pub transcription: Option<String>,
}

impl FilePatch {
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.extracted_text.is_none() && self.transcription.is_none()
    }

    /// Apply the patch in place. Returns true if anything was present.
    pub fn apply_to(&self, file: &mut IngestedFile) -> bool {
        if let Some(filename) = &self.filename {
            file.filename = filename.clone();
        }
        if let Some(text) = &self.extracted_text {
            file.extracted_text = Some(text.clone());
        }
        if let Some(transcription) = &self.transcription {
            file.transcription = Some(transcription.clone());
        }
        !self.is_empty()
    }
}

/// Body of `PUT /files/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    #[validate(length(min = 1, max = 255, message = "filename must not be empty"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

impl From<UpdateFileRequest> for FilePatch {
    fn from(req: UpdateFileRequest) -> Self {
        FilePatch {
            filename: req.filename,
            extracted_text: req.extracted_text,
            transcription: req.transcription,
        }
    }
}

/// Per-file entry of an upload response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
}

impl FileSummary {
    pub fn from_file(file: &IngestedFile, public_url: String) -> Self {
        FileSummary {
            id: file.id,
            filename: file.filename.clone(),
            original_name: file.original_name.clone(),
            file_type: file.file_type,
            file_size: file.file_size,
            mime_type: file.mime_type.clone(),
            public_url,
            created_at: file.created_at,
        }
    }
}

/// Full file representation returned by the read/update endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub storage_path: String,
    pub story_id: Uuid,
    pub extracted_text: Option<String>,
    pub transcription: Option<String>,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<StorySummary>,
}

impl FileResponse {
    pub fn from_file(file: IngestedFile, public_url: String) -> Self {
        FileResponse {
            id: file.id,
            filename: file.filename,
            original_name: file.original_name,
            file_type: file.file_type,
            file_size: file.file_size,
            mime_type: file.mime_type,
            storage_path: file.storage_path,
            story_id: file.story_id,
            extracted_text: file.extracted_text,
            transcription: file.transcription,
            public_url,
            created_at: file.created_at,
            updated_at: file.updated_at,
            story: None,
        }
    }

    pub fn with_story(mut self, story: Option<StorySummary>) -> Self {
        self.story = story;
        self
    }
}

/// `POST /files/upload/{storyId}` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<FileSummary>,
}

/// `GET /files/story/{storyId}` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
}

/// `GET|PUT /files/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileEnvelope {
    pub file: FileResponse,
}

/// Plain acknowledgement, e.g. for deletes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> IngestedFile {
        let now = Utc::now();
        IngestedFile {
            id: Uuid::new_v4(),
            filename: "0b5c-report.pdf".to_string(),
            original_name: "report.pdf".to_string(),
            file_type: FileType::Document,
            file_size: 1024,
            mime_type: "application/pdf".to_string(),
            storage_path: "stories/abc/0b5c-report.pdf".to_string(),
            story_id: Uuid::new_v4(),
            extracted_text: Some("hello".to_string()),
            transcription: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_derive_file_type() {
        assert_eq!(derive_file_type("image/png"), FileType::Image);
        assert_eq!(derive_file_type("application/pdf"), FileType::Document);
        assert_eq!(derive_file_type("audio/webm"), FileType::Audio);
        assert_eq!(derive_file_type("video/mp4"), FileType::Video);
        assert_eq!(derive_file_type("application/unknown"), FileType::Document);
    }

    #[test]
    fn test_derive_file_type_edge_cases() {
        assert_eq!(derive_file_type("Audio/OGG"), FileType::Audio);
        assert_eq!(derive_file_type("audio/webm;codecs=opus"), FileType::Audio);
        assert_eq!(derive_file_type("text/plain"), FileType::Document);
        assert_eq!(derive_file_type(""), FileType::Document);
    }

    #[test]
    fn test_file_type_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&FileType::WebClip).unwrap(),
            "\"WEB_CLIP\""
        );
        assert_eq!(
            serde_json::from_str::<FileType>("\"DOCUMENT\"").unwrap(),
            FileType::Document
        );
    }

    #[test]
    fn test_patch_absent_fields_are_untouched() {
        let mut file = sample_file();
        let patch = FilePatch {
            transcription: Some("spoken words".to_string()),
            ..Default::default()
        };
        assert!(patch.apply_to(&mut file));
        assert_eq!(file.filename, "0b5c-report.pdf");
        assert_eq!(file.extracted_text.as_deref(), Some("hello"));
        assert_eq!(file.transcription.as_deref(), Some("spoken words"));
    }

    #[test]
    fn test_patch_empty_string_clears_text() {
        let mut file = sample_file();
        let patch = FilePatch {
            extracted_text: Some(String::new()),
            ..Default::default()
        };
        patch.apply_to(&mut file);
        assert_eq!(file.extracted_text.as_deref(), Some(""));
        assert!(!FilePatch::default().apply_to(&mut file));
    }

    #[test]
    fn test_update_request_rejects_empty_filename() {
        let req = UpdateFileRequest {
            filename: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req: UpdateFileRequest =
            serde_json::from_str(r#"{"extractedText":"","transcription":"x"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.extracted_text.as_deref(), Some(""));
        assert!(req.filename.is_none());
    }

    #[test]
    fn test_file_response_is_camel_case() {
        let file = sample_file();
        let response = FileResponse::from_file(file, "http://cdn/x".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["originalName"], "report.pdf");
        assert_eq!(json["publicUrl"], "http://cdn/x");
        assert_eq!(json["fileType"], "DOCUMENT");
        assert!(json.get("story").is_none());
    }
}
