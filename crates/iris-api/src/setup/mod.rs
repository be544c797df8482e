//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::services::ingest::UploadLimits;
use crate::state::{AppState, IngestState};
use anyhow::{Context, Result};
use iris_core::{Config, RegistryBackend};
use iris_db::{
    FileRegistry, InMemoryRegistry, PostgresFileRepository, PostgresStoryRepository,
    StoryDirectory,
};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let (files, stories) = setup_registry(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let ingest = IngestState {
        storage,
        files,
        stories,
        limits: UploadLimits::from_config(&config),
    };
    let state = Arc::new(AppState::new(config.clone(), ingest));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

async fn setup_registry(
    config: &Config,
) -> Result<(Arc<dyn FileRegistry>, Arc<dyn StoryDirectory>)> {
    match config.registry_backend() {
        RegistryBackend::Postgres => {
            let pool = database::setup_database(config).await?;
            Ok((
                Arc::new(PostgresFileRepository::new(pool.clone())),
                Arc::new(PostgresStoryRepository::new(pool)),
            ))
        }
        RegistryBackend::Memory => {
            tracing::warn!("Using in-memory registry; file rows are lost on restart");
            let registry = Arc::new(InMemoryRegistry::new());
            for story in config.memory_stories() {
                registry
                    .insert_story_with_id(story.id, story.title.clone())
                    .await;
            }
            if config.memory_stories().is_empty() {
                tracing::warn!(
                    "No stories registered; set MEMORY_REGISTRY_STORIES to accept uploads"
                );
            } else {
                tracing::info!(
                    stories = config.memory_stories().len(),
                    "Registered stories in memory registry"
                );
            }
            Ok((registry.clone(), registry))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::models::StorySummary;
    use iris_core::StorageBackend;
    use uuid::Uuid;

    fn memory_config(stories: Vec<StorySummary>) -> Config {
        Config {
            server_port: 0,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            registry_backend: RegistryBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            db_timeout_seconds: 5,
            memory_stories: stories,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/iris".to_string()),
            local_storage_base_url: Some("http://localhost:3000/media".to_string()),
            max_part_size_bytes: 1024,
            max_parts_per_request: 1,
        }
    }

    #[tokio::test]
    async fn test_memory_registry_is_seeded_from_config() {
        let id = Uuid::new_v4();
        let config = memory_config(vec![StorySummary {
            id,
            title: "Family recipes".to_string(),
        }]);

        let (_files, stories) = setup_registry(&config).await.unwrap();

        let story = stories.find(id).await.unwrap().unwrap();
        assert_eq!(story.title, "Family recipes");
        assert!(stories.find(Uuid::new_v4()).await.unwrap().is_none());
    }
}
