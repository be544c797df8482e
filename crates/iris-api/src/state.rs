//! Application state.
//!
//! The ingestion pipeline only needs its three collaborators (object storage,
//! the file registry and the story directory) plus the upload limits.

use iris_core::Config;
use iris_db::{FileRegistry, StoryDirectory};
use iris_storage::Storage;
use std::sync::Arc;

use crate::services::ingest::{IngestionOrchestrator, UploadLimits};

/// Storage and registry handles shared by all file handlers.
#[derive(Clone)]
pub struct IngestState {
    pub storage: Arc<dyn Storage>,
    pub files: Arc<dyn FileRegistry>,
    pub stories: Arc<dyn StoryDirectory>,
    pub limits: UploadLimits,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ingest: IngestState,
}

impl AppState {
    pub fn new(config: Config, ingest: IngestState) -> Self {
        Self { config, ingest }
    }

    pub fn orchestrator(&self) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            self.ingest.storage.clone(),
            self.ingest.files.clone(),
            self.ingest.stories.clone(),
        )
    }
}
