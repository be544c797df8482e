use async_trait::async_trait;
use bytes::Bytes;
use iris_core::StorageBackend;
use iris_storage::{LocalStorage, Storage, StorageError, StorageResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Name marker that makes [`FlakyStorage`] reject a write.
pub const BROKEN_MARKER: &str = "broken";

/// Test storage configuration.
pub struct TestStorage {
    pub temp_dir: TempDir,
    pub base_path: PathBuf,
    pub base_url: String,
}

impl TestStorage {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let base_path = temp_dir.path().to_path_buf();
        let base_url = "http://localhost:3000/media".to_string();
        Self {
            temp_dir,
            base_path,
            base_url,
        }
    }

    pub fn base_path_str(&self) -> String {
        self.base_path.to_string_lossy().to_string()
    }

    pub fn object_count(&self) -> usize {
        count_files(&self.base_path)
    }
}

impl Default for TestStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

/// Local storage with injectable faults: writes of keys whose name contains
/// [`BROKEN_MARKER`] fail, and deletes fail while `fail_deletes` is set.
pub struct FlakyStorage {
    inner: LocalStorage,
    fail_deletes: AtomicBool,
}

impl FlakyStorage {
    pub fn new(inner: LocalStorage) -> Self {
        Self {
            inner,
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        if storage_key.contains(BROKEN_MARKER) {
            return Err(StorageError::UploadFailed("simulated write failure".to_string()));
        }
        self.inner.put(storage_key, data, content_type).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("simulated delete failure".to_string()));
        }
        self.inner.delete(storage_key).await
    }

    fn public_url(&self, storage_key: &str) -> String {
        self.inner.public_url(storage_key)
    }

    async fn probe(&self) -> StorageResult<()> {
        self.inner.probe().await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}
