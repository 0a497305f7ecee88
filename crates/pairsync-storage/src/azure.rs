use crate::keys::validate_key;
use crate::traits::{BlobStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::azure::{AzureConfigKey, MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ClientOptions, ObjectStoreExt, PutPayload, Result as ObjectResult};
use pairsync_core::AzureConnectionString;
use std::time::Duration;

/// Azure Blob Storage implementation
pub struct AzureStorage {
    store: MicrosoftAzure,
    container: String,
    account: String,
}

impl AzureStorage {
    /// Create a new AzureStorage instance
    ///
    /// # Arguments
    /// * `connection_string` - Parsed Azure Storage connection string
    /// * `container` - Blob container name
    /// * `request_timeout` - Upper bound for a single HTTP request
    pub fn new(
        connection_string: &AzureConnectionString,
        container: String,
        request_timeout: Duration,
    ) -> StorageResult<Self> {
        let mut builder = MicrosoftAzureBuilder::new()
            .with_container_name(container.clone())
            .with_client_options(ClientOptions::new().with_timeout(request_timeout));

        if connection_string.use_development_storage {
            builder = builder.with_use_emulator(true);
        }
        if let Some(ref account) = connection_string.account_name {
            builder = builder.with_account(account.clone());
        }
        if let Some(ref key) = connection_string.account_key {
            builder = builder.with_access_key(key.clone());
        }
        if let Some(ref sas) = connection_string.sas_token {
            builder = builder.with_config(AzureConfigKey::SasKey, sas.trim_start_matches('?'));
        }
        if let Some(endpoint) = connection_string.custom_endpoint() {
            builder = builder.with_endpoint(endpoint);
        }
        if connection_string.allows_http() {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let account = connection_string
            .account_name
            .clone()
            .unwrap_or_else(|| "devstoreaccount1".to_string());

        Ok(AzureStorage {
            store,
            container,
            account,
        })
    }

    /// Parse a raw connection string and build the store from it.
    pub fn from_connection_string(
        raw: &str,
        container: String,
        request_timeout: Duration,
    ) -> StorageResult<Self> {
        let parsed = AzureConnectionString::parse(raw)
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        Self::new(&parsed, container, request_timeout)
    }
}

#[async_trait]
impl BlobStore for AzureStorage {
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        validate_key(storage_key)?;
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    container = %self.container,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Azure download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        let size = bytes.len() as u64;

        tracing::debug!(
            container = %self.container,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Azure download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn upload_with_key(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<()> {
        validate_key(storage_key)?;
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(bytes)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                container = %self.container,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Azure upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::debug!(
            container = %self.container,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Azure upload successful"
        );

        Ok(())
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<Option<u64>> {
        validate_key(storage_key)?;
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(meta.size)),
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Azure
    }

    fn location(&self) -> String {
        format!("azure://{}/{}", self.account, self.container)
    }
}
