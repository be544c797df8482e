//! Database repositories for data access layer
//!
//! `StoryDirectory` and `FileRegistry` are the seams the ingestion pipeline
//! talks to. The Postgres repositories back them in production; the in-memory
//! registry backs both for local runs and tests.

pub mod files;
pub mod memory;
pub mod stories;

use iris_core::models::{FilePatch, IngestedFile, NewIngestedFile, StorySummary};
use iris_core::AppError;
use uuid::Uuid;

pub use files::PostgresFileRepository;
pub use memory::InMemoryRegistry;
pub use stories::PostgresStoryRepository;

/// Read-only access to stories (parent records).
#[async_trait::async_trait]
pub trait StoryDirectory: Send + Sync {
    async fn find(&self, story_id: Uuid) -> Result<Option<StorySummary>, AppError>;
}

/// Durable store of file metadata rows.
#[async_trait::async_trait]
pub trait FileRegistry: Send + Sync {
    async fn create(&self, new_file: NewIngestedFile) -> Result<IngestedFile, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<IngestedFile>, AppError>;

    /// Files of a story, newest first.
    async fn list_by_story(&self, story_id: Uuid) -> Result<Vec<IngestedFile>, AppError>;

    /// Apply a patch. Returns `None` if the row does not exist.
    async fn update(&self, id: Uuid, patch: &FilePatch) -> Result<Option<IngestedFile>, AppError>;

    /// Remove a row. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> Result<(), AppError>;
}
