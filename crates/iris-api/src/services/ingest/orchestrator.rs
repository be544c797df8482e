use std::sync::Arc;
use std::time::Instant;

use iris_core::models::{
    FilePatch, FileResponse, FileSummary, IngestedFile, NewIngestedFile, StorySummary,
};
use iris_core::{derive_file_type, AppError, StorageBackend};
use iris_db::{FileRegistry, StoryDirectory};
use iris_storage::{generate_story_key, Storage};
use uuid::Uuid;

use super::multipart::{BufferedFile, PartSource};

/// Links stored objects to registry rows.
///
/// Objects are written before rows are created and deleted before rows are
/// removed. There is no cross-store transaction: a row insert that fails after
/// a successful store leaves the object behind, and it is logged with its key.
#[derive(Clone)]
pub struct IngestionOrchestrator {
    storage: Arc<dyn Storage>,
    files: Arc<dyn FileRegistry>,
    stories: Arc<dyn StoryDirectory>,
}

impl IngestionOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        files: Arc<dyn FileRegistry>,
        stories: Arc<dyn StoryDirectory>,
    ) -> Self {
        Self {
            storage,
            files,
            stories,
        }
    }

    /// Resolve the story an upload targets. Must run before any part is read.
    pub async fn ensure_story(&self, story_id: Uuid) -> Result<StorySummary, AppError> {
        self.stories.find(story_id).await?.ok_or_else(|| {
            tracing::debug!(story_id = %story_id, "Upload target story not found");
            AppError::NotFound("Story not found".to_string())
        })
    }

    /// Ingest every file part of a request, one at a time in arrival order.
    ///
    /// Files whose storage write fails are skipped. Errors from the part source
    /// (limits, malformed body) and from the registry end the request; files
    /// ingested before that point stay stored and registered.
    pub async fn ingest_all<S>(
        &self,
        story: &StorySummary,
        source: &mut S,
    ) -> Result<Vec<FileSummary>, AppError>
    where
        S: PartSource + ?Sized,
    {
        let mut ingested = Vec::new();
        let mut skipped = 0usize;

        while let Some(file) = source.next_file().await? {
            match self.ingest_one(story.id, file).await? {
                Some(summary) => ingested.push(summary),
                None => skipped += 1,
            }
        }

        tracing::info!(
            story_id = %story.id,
            ingested = ingested.len(),
            skipped,
            "Upload request processed"
        );
        Ok(ingested)
    }

    /// Store one buffered file and create its row.
    ///
    /// Returns `Ok(None)` when the storage write fails; nothing is registered
    /// for that file.
    pub async fn ingest_one(
        &self,
        story_id: Uuid,
        file: BufferedFile,
    ) -> Result<Option<FileSummary>, AppError> {
        let file_type = derive_file_type(&file.content_type);
        let story_key = generate_story_key(story_id, &file.original_name);
        let file_size = file.size();
        let started = Instant::now();

        if let Err(e) = self
            .storage
            .put(&story_key.key, file.data, &file.content_type)
            .await
        {
            tracing::warn!(
                error = %e,
                story_id = %story_id,
                original_name = %file.original_name,
                storage_key = %story_key.key,
                "Storage write failed, skipping file"
            );
            return Ok(None);
        }

        let new_file = NewIngestedFile {
            filename: story_key.filename,
            original_name: file.original_name,
            file_type,
            file_size: i64::try_from(file_size).unwrap_or(i64::MAX),
            mime_type: file.content_type,
            storage_path: story_key.key,
            story_id,
        };
        let storage_path = new_file.storage_path.clone();
        let original_name = new_file.original_name.clone();

        let row = match self.files.create(new_file).await {
            Ok(row) => row,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    story_id = %story_id,
                    original_name = %original_name,
                    storage_key = %storage_path,
                    "File row insert failed after store; object is orphaned"
                );
                return Err(e);
            }
        };

        tracing::info!(
            file_id = %row.id,
            story_id = %story_id,
            original_name = %row.original_name,
            file_type = ?row.file_type,
            file_size = row.file_size,
            duration_ms = started.elapsed().as_millis() as u64,
            "File ingested"
        );

        let public_url = self.storage.public_url(&row.storage_path);
        Ok(Some(FileSummary::from_file(&row, public_url)))
    }

    /// One file with its public URL and owning story.
    pub async fn get(&self, id: Uuid) -> Result<FileResponse, AppError> {
        let file = self.require_file(id).await?;
        let story = self.stories.find(file.story_id).await?;
        Ok(self.to_response(file).with_story(story))
    }

    /// Files of a story, newest first.
    pub async fn list(&self, story_id: Uuid) -> Result<Vec<FileResponse>, AppError> {
        let files = self.files.list_by_story(story_id).await?;
        Ok(files.into_iter().map(|f| self.to_response(f)).collect())
    }

    pub async fn update(&self, id: Uuid, patch: FilePatch) -> Result<FileResponse, AppError> {
        let file = self
            .files
            .update(id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
        Ok(self.to_response(file))
    }

    /// Delete the object, then the row. A failed object delete keeps the row.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let file = self.require_file(id).await?;

        if let Err(e) = self.storage.delete(&file.storage_path).await {
            tracing::error!(
                error = %e,
                file_id = %id,
                story_id = %file.story_id,
                storage_key = %file.storage_path,
                "Storage delete failed, keeping file row"
            );
            return Err(AppError::StorageDeleteFailed(e.to_string()));
        }

        if !self.files.delete(id).await? {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        tracing::info!(file_id = %id, story_id = %file.story_id, "File deleted");
        Ok(())
    }

    /// Round trip to the storage backend.
    pub async fn probe_storage(&self) -> Result<StorageBackend, AppError> {
        self.storage.probe().await.map_err(|e| {
            tracing::error!(error = %e, "Storage probe failed");
            AppError::Storage(format!("Storage connection failed: {}", e))
        })?;
        Ok(self.storage.backend_type())
    }

    async fn require_file(&self, id: Uuid) -> Result<IngestedFile, AppError> {
        self.files
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    fn to_response(&self, file: IngestedFile) -> FileResponse {
        let public_url = self.storage.public_url(&file.storage_path);
        FileResponse::from_file(file, public_url)
    }
}
