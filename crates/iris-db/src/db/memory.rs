//! Process-local registry used when `REGISTRY_BACKEND=memory` and in tests.

use std::collections::HashMap;

use chrono::Utc;
use iris_core::{
    models::{FilePatch, IngestedFile, NewIngestedFile, StorySummary},
    AppError,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FileRegistry, StoryDirectory};

/// Stories and file rows held in memory. Implements both registry seams.
#[derive(Default)]
pub struct InMemoryRegistry {
    stories: RwLock<HashMap<Uuid, StorySummary>>,
    // Insertion order is kept so ties on created_at still list newest first.
    files: RwLock<Vec<IngestedFile>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a story so uploads against it are accepted.
    pub async fn insert_story(&self, title: impl Into<String>) -> StorySummary {
        self.insert_story_with_id(Uuid::new_v4(), title).await
    }

    /// Register a story under a known id, replacing any previous title.
    pub async fn insert_story_with_id(&self, id: Uuid, title: impl Into<String>) -> StorySummary {
        let story = StorySummary {
            id,
            title: title.into(),
        };
        self.stories.write().await.insert(story.id, story.clone());
        story
    }

    pub async fn file_count(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait::async_trait]
impl StoryDirectory for InMemoryRegistry {
    async fn find(&self, story_id: Uuid) -> Result<Option<StorySummary>, AppError> {
        Ok(self.stories.read().await.get(&story_id).cloned())
    }
}

#[async_trait::async_trait]
impl FileRegistry for InMemoryRegistry {
    async fn create(&self, new_file: NewIngestedFile) -> Result<IngestedFile, AppError> {
        if !self.stories.read().await.contains_key(&new_file.story_id) {
            return Err(AppError::NotFound("Story not found".to_string()));
        }

        let now = Utc::now();
        let file = IngestedFile {
            id: Uuid::new_v4(),
            filename: new_file.filename,
            original_name: new_file.original_name,
            file_type: new_file.file_type,
            file_size: new_file.file_size,
            mime_type: new_file.mime_type,
            storage_path: new_file.storage_path,
            story_id: new_file.story_id,
            extracted_text: None,
            transcription: None,
            created_at: now,
            updated_at: now,
        };

        let mut files = self.files.write().await;
        if files.iter().any(|f| f.storage_path == file.storage_path) {
            return Err(AppError::Internal(format!(
                "Duplicate storage path: {}",
                file.storage_path
            )));
        }
        files.push(file.clone());

        tracing::debug!(file_id = %file.id, story_id = %file.story_id, "File row created");
        Ok(file)
    }

    async fn get(&self, id: Uuid) -> Result<Option<IngestedFile>, AppError> {
        Ok(self.files.read().await.iter().find(|f| f.id == id).cloned())
    }

    async fn list_by_story(&self, story_id: Uuid) -> Result<Vec<IngestedFile>, AppError> {
        let mut files: Vec<IngestedFile> = self
            .files
            .read()
            .await
            .iter()
            .rev()
            .filter(|f| f.story_id == story_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    async fn update(&self, id: Uuid, patch: &FilePatch) -> Result<Option<IngestedFile>, AppError> {
        let mut files = self.files.write().await;
        let Some(file) = files.iter_mut().find(|f| f.id == id) else {
            return Ok(None);
        };

        if patch.apply_to(file) {
            file.updated_at = Utc::now();
        }
        Ok(Some(file.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut files = self.files.write().await;
        let before = files.len();
        files.retain(|f| f.id != id);
        Ok(files.len() < before)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
