//! Pairsync Storage Library
//!
//! This crate provides the `BlobStore` abstraction the transfer engine runs
//! against, with implementations for Azure Blob Storage and the local filesystem.
//!
//! # Key format
//!
//! Keys are flat strings inside one container. All backends share the layout
//! produced by the `keys` module:
//!
//! - **Source videos**: `{video_prefix}/{video_file}`
//! - **Reference images**: `{image_prefix}/{image_file}`
//! - **Results**: `{results_prefix}/batch_{batch_id}/{item_id}/{relative_path}`
//!
//! Keys must not contain `..` or a leading `/`.

#[cfg(feature = "storage-azure")]
pub mod azure;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-azure")]
pub use azure::AzureStorage;
pub use factory::create_blob_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use pairsync_core::StorageBackend;
pub use traits::{BlobStore, StorageError, StorageResult};
