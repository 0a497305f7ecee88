//! Storage abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key-addressed byte storage.
///
/// Implementations hold no mutable state visible to callers and are shared
/// behind an `Arc<dyn BlobStore>`. Keys follow the layout described in the
/// crate root documentation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an object fully. Fails with `NotFound` when the key is absent.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Write an object, replacing any existing one.
    async fn upload_with_key(&self, key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Size in bytes of an object, `None` when it does not exist. Doubles as
    /// the existence check.
    async fn content_length(&self, key: &str) -> StorageResult<Option<u64>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Human-readable location, e.g. `azure://videos`
    fn location(&self) -> String;
}
