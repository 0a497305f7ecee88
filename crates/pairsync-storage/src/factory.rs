#[cfg(feature = "storage-azure")]
use crate::AzureStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{BlobStore, StorageBackend, StorageError, StorageResult};
use pairsync_core::TransferConfig;
use std::sync::Arc;

/// Create a blob store based on configuration
///
/// Credentials are resolved here, once, and only for backends that need them.
pub async fn create_blob_store(config: &TransferConfig) -> StorageResult<Arc<dyn BlobStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-azure")]
        StorageBackend::Azure => {
            let connection_string = config
                .credentials
                .resolve()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;

            let storage = AzureStorage::from_connection_string(
                &connection_string,
                config.container.clone(),
                config.transfer_timeout,
            )?;

            tracing::info!(
                location = %storage.location(),
                "Using Azure blob storage"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-azure"))]
        StorageBackend::Azure => Err(StorageError::ConfigError(
            "Azure storage backend not available (storage-azure feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("PAIRSYNC_LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let storage = LocalStorage::new(base_path.join(&config.container)).await?;

            tracing::info!(
                location = %storage.location(),
                "Using local blob storage"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
