//! Client tests against the real iris-api router served on a local port.
//!
//! Run with: `cargo test -p iris-api-client --test client_test`

use std::sync::Arc;

use iris_api::services::ingest::UploadLimits;
use iris_api::setup::routes;
use iris_api::state::{AppState, IngestState};
use iris_api_client::{ApiClient, UploadFile, UploadStatus, UploadTransport};
use iris_core::{Config, RegistryBackend, StorageBackend};
use iris_db::InMemoryRegistry;
use iris_storage::LocalStorage;
use tempfile::TempDir;
use tokio::net::TcpListener;
use uuid::Uuid;

struct TestServer {
    client: ApiClient,
    registry: Arc<InMemoryRegistry>,
    storage_dir: TempDir,
}

async fn spawn_server() -> TestServer {
    let storage_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let base_url = "http://localhost:3000/media".to_string();

    let config = Config {
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
        local_storage_path: Some(storage_dir.path().display().to_string()),
        local_storage_base_url: Some(base_url.clone()),
        max_part_size_bytes: 1024 * 1024,
        max_parts_per_request: 3,
    };

    let storage = Arc::new(
        LocalStorage::new(storage_dir.path(), base_url)
            .await
            .expect("Failed to create local storage"),
    );
    let registry = Arc::new(InMemoryRegistry::new());
    let ingest = IngestState {
        storage,
        files: registry.clone(),
        stories: registry.clone(),
        limits: UploadLimits::from_config(&config),
    };
    let state = Arc::new(AppState::new(config.clone(), ingest));
    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    let client = ApiClient::new(format!("http://{}", addr)).expect("Failed to create client");
    TestServer {
        client,
        registry,
        storage_dir,
    }
}

#[tokio::test]
async fn test_upload_sends_every_file_in_one_request() {
    let server = spawn_server().await;
    let story = server.registry.insert_story("Letters from the front").await;

    let mut transport = UploadTransport::new(server.client.clone());
    transport
        .select(vec![
            UploadFile::new("letter.pdf", "application/pdf", &b"%PDF-1.4 letter"[..]),
            UploadFile::new("portrait.png", "image/png", &b"png-bytes"[..]),
        ])
        .unwrap();

    let files = transport.upload(story.id).await.unwrap();
    assert_eq!(transport.status(), UploadStatus::Success);
    assert!(transport.selection().is_empty());

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].original_name, "letter.pdf");
    assert_eq!(files[0].mime_type, "application/pdf");
    assert_eq!(files[1].original_name, "portrait.png");
    assert_eq!(files[1].mime_type, "image/png");
    assert_eq!(server.registry.file_count().await, 2);

    let stored = server.client.get_file(files[0].id).await.unwrap();
    assert_eq!(stored.file_size, 15);
    assert!(server
        .storage_dir
        .path()
        .join(&stored.storage_path)
        .exists());

    let listed = server.client.story_files(story.id).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_upload_to_missing_story_surfaces_server_error() {
    let server = spawn_server().await;

    let err = server
        .client
        .upload_files(
            Uuid::new_v4(),
            &[UploadFile::new("a.pdf", "application/pdf", &b"%PDF"[..])],
        )
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("404"), "unexpected error: {}", message);
    assert!(message.contains("Story not found"), "unexpected error: {}", message);
    assert_eq!(server.registry.file_count().await, 0);
}

#[tokio::test]
async fn test_delete_file_removes_row_and_object() {
    let server = spawn_server().await;
    let story = server.registry.insert_story("Recipes").await;

    let response = server
        .client
        .upload_files(
            story.id,
            &[UploadFile::new("soup.pdf", "application/pdf", &b"%PDF soup"[..])],
        )
        .await
        .unwrap();
    let id = response.files[0].id;
    let storage_path = server.client.get_file(id).await.unwrap().storage_path;

    server.client.delete_file(id).await.unwrap();

    let err = server.client.get_file(id).await.unwrap_err();
    assert!(err.to_string().contains("File not found"));
    assert!(!server.storage_dir.path().join(storage_path).exists());
}

#[tokio::test]
async fn test_storage_check_reports_backend() {
    let server = spawn_server().await;

    let report = server.client.test_storage().await.unwrap();
    assert_eq!(report.message, "Storage connection working");
    assert_eq!(report.backend, "local");
}
