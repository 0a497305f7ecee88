//! Pairsync Core Library
//!
//! This crate provides the configuration, credential handling, error types and
//! data model shared by the storage backends, the transfer engine and the CLI.

pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{IntegrityCheck, TransferConfig};
pub use credentials::{AzureConnectionString, CredentialProvider};
pub use error::{ItemErrorKind, PairsyncError, Result};
pub use models::{
    BatchInfo, BatchMapping, CompletenessRecord, CompletenessStatus, Endpoint, ItemFailure,
    MappingEntry, TransferDirection, TransferItem, TransferPair, TransferReport, TransferStats,
};
pub use storage_types::StorageBackend;
