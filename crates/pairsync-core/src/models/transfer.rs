use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Blob store → local disk
    Download,
    /// Local disk → blob store
    Upload,
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransferDirection::Download => write!(f, "download"),
            TransferDirection::Upload => write!(f, "upload"),
        }
    }
}

/// One side of a copy: a blob key or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Remote(String),
    Local(PathBuf),
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Endpoint::Remote(key) => write!(f, "blob:{}", key),
            Endpoint::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPair {
    pub source: Endpoint,
    pub destination: Endpoint,
}

/// A unit of work: every pair must succeed for the item to succeed.
///
/// Download items pair remote keys with local paths, upload items pair local
/// paths with remote keys; the constructors enforce that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    id: String,
    direction: TransferDirection,
    pairs: Vec<TransferPair>,
    /// Set when the item's files could not be enumerated
    listing_error: Option<String>,
}

impl TransferItem {
    pub fn download(id: impl Into<String>, pairs: Vec<(String, PathBuf)>) -> Self {
        Self {
            id: id.into(),
            direction: TransferDirection::Download,
            pairs: pairs
                .into_iter()
                .map(|(key, path)| TransferPair {
                    source: Endpoint::Remote(key),
                    destination: Endpoint::Local(path),
                })
                .collect(),
            listing_error: None,
        }
    }

    pub fn upload(id: impl Into<String>, pairs: Vec<(PathBuf, String)>) -> Self {
        Self {
            id: id.into(),
            direction: TransferDirection::Upload,
            pairs: pairs
                .into_iter()
                .map(|(path, key)| TransferPair {
                    source: Endpoint::Local(path),
                    destination: Endpoint::Remote(key),
                })
                .collect(),
            listing_error: None,
        }
    }

    /// An upload item whose source directory could not be listed.
    pub fn unlisted_upload(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            direction: TransferDirection::Upload,
            pairs: Vec::new(),
            listing_error: Some(error.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn pairs(&self) -> &[TransferPair] {
        &self.pairs
    }

    pub fn listing_error(&self) -> Option<&str> {
        self.listing_error.as_deref()
    }
}
