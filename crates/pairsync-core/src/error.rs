//! Error types module
//!
//! Two layers of failure exist in a transfer run:
//!
//! - [`PairsyncError`] is run-level and fatal. It is returned before any item is
//!   attempted (bad batch file, missing credentials, unusable results directory)
//!   and propagates to the caller.
//! - [`ItemErrorKind`] classifies a single item's failure. Those are recorded in
//!   the run statistics and never escape the engine.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum PairsyncError {
    /// Invalid or missing configuration (batch file, mapping key, settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable storage credentials
    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PairsyncError {
    pub fn config(message: impl Into<String>) -> Self {
        PairsyncError::Config(message.into())
    }
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, PairsyncError>;

/// Classification of a failed transfer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    /// Source object or file is absent
    NotFound,
    /// I/O, network or timeout failure while reading or writing
    Transfer,
}

impl Display for ItemErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ItemErrorKind::NotFound => write!(f, "not_found"),
            ItemErrorKind::Transfer => write!(f, "transfer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err = PairsyncError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "IO error: gone");
    }

    #[test]
    fn item_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ItemErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
