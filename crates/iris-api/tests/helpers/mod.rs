//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p iris-api`. Files go to a temp dir and
//! rows to the in-memory registry, so no external services are needed.

pub mod fixtures;
pub mod storage;

use axum_test::TestServer;
use iris_api::services::ingest::UploadLimits;
use iris_api::setup::routes;
use iris_api::state::{AppState, IngestState};
use iris_core::{Config, RegistryBackend, StorageBackend};
use iris_db::InMemoryRegistry;
use iris_storage::LocalStorage;
use std::sync::Arc;

use storage::{FlakyStorage, TestStorage};

/// Per-part limit used by tests (1 MiB).
pub const TEST_MAX_PART_BYTES: usize = 1024 * 1024;
/// Per-request file limit used by tests.
pub const TEST_MAX_PARTS: usize = 3;

/// Test application: server and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub registry: Arc<InMemoryRegistry>,
    pub storage: Arc<FlakyStorage>,
    pub test_storage: TestStorage,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of objects written under the storage root.
    pub fn object_count(&self) -> usize {
        self.test_storage.object_count()
    }
}

pub fn test_config(test_storage: &TestStorage) -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        registry_backend: RegistryBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        db_timeout_seconds: 5,
        memory_stories: Vec::new(),
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        local_storage_path: Some(test_storage.base_path_str()),
        local_storage_base_url: Some(test_storage.base_url.clone()),
        max_part_size_bytes: TEST_MAX_PART_BYTES,
        max_parts_per_request: TEST_MAX_PARTS,
    }
}

/// Setup test app with local storage in a temp dir and an in-memory registry.
pub async fn setup_test_app() -> TestApp {
    let test_storage = TestStorage::new();
    let config = test_config(&test_storage);
    config.validate().expect("Test config should be valid");

    let local = LocalStorage::new(test_storage.base_path.clone(), test_storage.base_url.clone())
        .await
        .expect("Failed to create local storage");
    let storage = Arc::new(FlakyStorage::new(local));
    let registry = Arc::new(InMemoryRegistry::new());

    let ingest = IngestState {
        storage: storage.clone(),
        files: registry.clone(),
        stories: registry.clone(),
        limits: UploadLimits::from_config(&config),
    };
    let state = Arc::new(AppState::new(config.clone(), ingest));

    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        registry,
        storage,
        test_storage,
    }
}
