//! Test helpers: a temp workspace with a `LocalStorage` standing in for the
//! remote container, plus fakes that fail, stall, or refuse to list.
//!
//! Run with: `cargo test -p pairsync-transfer`

#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pairsync_core::config::MAPPING_FILE_NAME;
use pairsync_core::{StorageBackend, TransferConfig};
use pairsync_storage::{BlobStore, LocalStorage, StorageError, StorageResult};
use pairsync_transfer::{FsListing, Listing};
use tempfile::TempDir;

pub struct TestEnv {
    pub _temp_dir: TempDir,
    pub root: PathBuf,
    pub config: TransferConfig,
    pub store: Arc<LocalStorage>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();

        let config = TransferConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(root.join("remote")),
            batch_configs_dir: root.join("batch_configs"),
            ..TransferConfig::default()
        };
        let store = LocalStorage::new(root.join("remote").join(&config.container))
            .await
            .expect("Failed to create local store");

        Self {
            _temp_dir: temp_dir,
            root,
            config,
            store: Arc::new(store),
        }
    }

    pub fn blob_store(&self) -> Arc<dyn BlobStore> {
        self.store.clone()
    }

    pub fn output_root(&self) -> PathBuf {
        self.root.join("downloads")
    }

    pub fn results_root(&self) -> PathBuf {
        self.root.join("results")
    }

    /// Write a mapping document for `batch_id` with pairs in the given order.
    pub fn write_mapping(&self, batch_id: &str, pairs: &[(&str, &str)], batch_number: Option<u64>) {
        let entries: Vec<String> = pairs
            .iter()
            .map(|(video, image)| format!("{:?}: {:?}", video, image))
            .collect();
        let mut body = format!("{{\"mapping\": {{{}}}", entries.join(", "));
        if let Some(number) = batch_number {
            body.push_str(&format!(", \"batch_info\": {{\"batch_number\": {}}}", number));
        }
        body.push('}');

        let path = self.config.mapping_path(batch_id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        assert_eq!(path.file_name().unwrap(), MAPPING_FILE_NAME);
        std::fs::write(path, body).unwrap();
    }

    pub async fn put_video(&self, name: &str, data: &[u8]) {
        let key = format!("{}/{}", self.config.video_prefix, name);
        self.store.upload_with_key(&key, data.to_vec()).await.unwrap();
    }

    pub async fn put_image(&self, name: &str, data: &[u8]) {
        let key = format!("{}/{}", self.config.image_prefix, name);
        self.store.upload_with_key(&key, data.to_vec()).await.unwrap();
    }
}

pub fn write_file(path: &Path, data: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

/// Delegates to an inner store but fails reads and writes of selected keys.
pub struct FaultyStore {
    inner: Arc<dyn BlobStore>,
    failing_keys: HashSet<String>,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn BlobStore>, failing_keys: &[&str]) -> Self {
        Self {
            inner,
            failing_keys: failing_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn check(&self, key: &str) -> StorageResult<()> {
        if self.failing_keys.contains(key) {
            return Err(StorageError::BackendError(format!("injected fault for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FaultyStore {
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.check(key)?;
        self.inner.download(key).await
    }

    async fn upload_with_key(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.check(key)?;
        self.inner.upload_with_key(key, data).await
    }

    async fn content_length(&self, key: &str) -> StorageResult<Option<u64>> {
        self.check(key)?;
        self.inner.content_length(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    fn location(&self) -> String {
        format!("faulty+{}", self.inner.location())
    }
}

/// Delegates everything except `content_length`, which always errors.
pub struct SizeLookupFailingStore {
    inner: Arc<dyn BlobStore>,
}

impl SizeLookupFailingStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl BlobStore for SizeLookupFailingStore {
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.download(key).await
    }

    async fn upload_with_key(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.inner.upload_with_key(key, data).await
    }

    async fn content_length(&self, key: &str) -> StorageResult<Option<u64>> {
        Err(StorageError::BackendError(format!("head failed for {}", key)))
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

/// Sleeps for `delay` before every read and write.
pub struct SlowStore {
    inner: Arc<dyn BlobStore>,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: Arc<dyn BlobStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl BlobStore for SlowStore {
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        self.inner.download(key).await
    }

    async fn upload_with_key(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.upload_with_key(key, data).await
    }

    async fn content_length(&self, key: &str) -> StorageResult<Option<u64>> {
        self.inner.content_length(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    fn location(&self) -> String {
        format!("slow+{}", self.inner.location())
    }
}

/// The real filesystem, except that walking a directory with the given name fails.
pub struct UnwalkableListing {
    dir_name: String,
}

impl UnwalkableListing {
    pub fn new(dir_name: &str) -> Self {
        Self {
            dir_name: dir_name.to_string(),
        }
    }
}

impl Listing for UnwalkableListing {
    fn list_dirs(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        FsListing.list_dirs(root)
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if dir.file_name().is_some_and(|name| name == self.dir_name.as_str()) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
        }
        FsListing.walk_files(dir)
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        FsListing.file_size(path)
    }
}
