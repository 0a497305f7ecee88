//! Configuration module
//!
//! [`TransferConfig`] carries everything the storage factory, the planner and the
//! engine need. It is built once (from the environment and CLI overrides) and
//! passed down explicitly; nothing below the CLI reads the environment.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialProvider;
use crate::error::{PairsyncError, Result};
use crate::storage_types::StorageBackend;

const CONTAINER: &str = "videos";
const VIDEO_PREFIX: &str = "ruijian-research/raw";
const IMAGE_PREFIX: &str = "ruijian-research/celeba-hq";
const RESULTS_PREFIX: &str = "ruijian-research/batch_results";
const BATCH_CONFIGS_DIR: &str = "batch_configs";
const VIDEO_SUFFIX: &str = ".0_processed.mp4";
const RESULT_DIR_PREFIX: &str = "00000500";
const REQUIRED_RESULT_FILES: &str = "part2_output/inpainted_video.mp4,part2_output/masked_area_filled.mp4,part2_output/inpainted_frame.png";
const MIN_RESULT_BYTES: u64 = 1000;
const SIZE_CHECK_TIMEOUT_SECS: u64 = 30;
const TRANSFER_TIMEOUT_SECS: u64 = 600;

/// File name of the mapping document inside each `batch_<id>` directory
pub const MAPPING_FILE_NAME: &str = "video_image_mapping.json";

/// How strictly an existing destination must match its source before a
/// transfer is skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityCheck {
    /// Equal byte size is treated as identical content
    #[default]
    Size,
    /// Equal byte size and equal SHA-256 digest
    Sha256,
}

impl FromStr for IntegrityCheck {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "size" => Ok(IntegrityCheck::Size),
            "sha256" | "hash" => Ok(IntegrityCheck::Sha256),
            _ => Err(anyhow::anyhow!("Invalid integrity check: {}", s)),
        }
    }
}

impl Display for IntegrityCheck {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            IntegrityCheck::Size => write!(f, "size"),
            IntegrityCheck::Sha256 => write!(f, "sha256"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TransferConfig {
    pub storage_backend: StorageBackend,
    /// Blob container (bucket) name
    pub container: String,
    /// Remote prefix holding source videos
    pub video_prefix: String,
    /// Remote prefix holding reference images
    pub image_prefix: String,
    /// Remote prefix receiving uploaded results
    pub results_prefix: String,
    /// Directory containing `batch_<id>/video_image_mapping.json`
    pub batch_configs_dir: PathBuf,
    /// Root directory for the local backend
    pub local_storage_path: Option<PathBuf>,
    pub credentials: CredentialProvider,
    /// Stripped from a video filename to form its item id
    pub video_suffix: String,
    /// Result directories considered for upload start with this
    pub result_dir_prefix: String,
    pub required_result_files: Vec<String>,
    pub min_result_bytes: u64,
    pub size_check_timeout: Duration,
    pub transfer_timeout: Duration,
    pub integrity_check: IntegrityCheck,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Azure,
            container: CONTAINER.to_string(),
            video_prefix: VIDEO_PREFIX.to_string(),
            image_prefix: IMAGE_PREFIX.to_string(),
            results_prefix: RESULTS_PREFIX.to_string(),
            batch_configs_dir: PathBuf::from(BATCH_CONFIGS_DIR),
            local_storage_path: None,
            credentials: CredentialProvider::default_chain(None, None),
            video_suffix: VIDEO_SUFFIX.to_string(),
            result_dir_prefix: RESULT_DIR_PREFIX.to_string(),
            required_result_files: split_list(REQUIRED_RESULT_FILES),
            min_result_bytes: MIN_RESULT_BYTES,
            size_check_timeout: Duration::from_secs(SIZE_CHECK_TIMEOUT_SECS),
            transfer_timeout: Duration::from_secs(TRANSFER_TIMEOUT_SECS),
            integrity_check: IntegrityCheck::Size,
        }
    }
}

impl TransferConfig {
    /// Load configuration from `PAIRSYNC_*` environment variables (and `.env`).
    ///
    /// Unset variables fall back to defaults; unparsable numbers fall back to
    /// defaults as well, invalid enum values are errors.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let storage_backend = match env::var("PAIRSYNC_STORAGE_BACKEND") {
            Ok(value) => value
                .parse::<StorageBackend>()
                .map_err(|e| PairsyncError::config(e.to_string()))?,
            Err(_) => defaults.storage_backend,
        };

        let integrity_check = match env::var("PAIRSYNC_INTEGRITY_CHECK") {
            Ok(value) => value
                .parse::<IntegrityCheck>()
                .map_err(|e| PairsyncError::config(e.to_string()))?,
            Err(_) => defaults.integrity_check,
        };

        let secrets_file = env::var("PAIRSYNC_CREDENTIALS_FILE").ok().map(PathBuf::from);

        let required_result_files = env::var("PAIRSYNC_REQUIRED_RESULT_FILES")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.required_result_files);

        let min_result_bytes = env::var("PAIRSYNC_MIN_RESULT_BYTES")
            .unwrap_or_else(|_| MIN_RESULT_BYTES.to_string())
            .parse::<u64>()
            .unwrap_or(MIN_RESULT_BYTES);

        let size_check_timeout_secs = env::var("PAIRSYNC_SIZE_CHECK_TIMEOUT_SECS")
            .unwrap_or_else(|_| SIZE_CHECK_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(SIZE_CHECK_TIMEOUT_SECS);

        let transfer_timeout_secs = env::var("PAIRSYNC_TRANSFER_TIMEOUT_SECS")
            .unwrap_or_else(|_| TRANSFER_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(TRANSFER_TIMEOUT_SECS);

        let config = TransferConfig {
            storage_backend,
            container: env::var("PAIRSYNC_CONTAINER").unwrap_or(defaults.container),
            video_prefix: env::var("PAIRSYNC_VIDEO_PREFIX").unwrap_or(defaults.video_prefix),
            image_prefix: env::var("PAIRSYNC_IMAGE_PREFIX").unwrap_or(defaults.image_prefix),
            results_prefix: env::var("PAIRSYNC_RESULTS_PREFIX").unwrap_or(defaults.results_prefix),
            batch_configs_dir: env::var("PAIRSYNC_BATCH_CONFIGS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.batch_configs_dir),
            local_storage_path: env::var("PAIRSYNC_LOCAL_STORAGE_PATH").ok().map(PathBuf::from),
            credentials: CredentialProvider::default_chain(None, secrets_file),
            video_suffix: env::var("PAIRSYNC_VIDEO_SUFFIX").unwrap_or(defaults.video_suffix),
            result_dir_prefix: env::var("PAIRSYNC_RESULT_DIR_PREFIX")
                .unwrap_or(defaults.result_dir_prefix),
            required_result_files,
            min_result_bytes,
            size_check_timeout: Duration::from_secs(size_check_timeout_secs),
            transfer_timeout: Duration::from_secs(transfer_timeout_secs),
            integrity_check,
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("container", &self.container),
            ("video prefix", &self.video_prefix),
            ("image prefix", &self.image_prefix),
            ("results prefix", &self.results_prefix),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(PairsyncError::config(format!("{} must not be empty", name)));
            }
        }

        if self.size_check_timeout.is_zero() || self.transfer_timeout.is_zero() {
            return Err(PairsyncError::config("timeouts must be greater than zero"));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(PairsyncError::config(
                "local storage backend requires PAIRSYNC_LOCAL_STORAGE_PATH",
            ));
        }

        if self.required_result_files.is_empty() {
            return Err(PairsyncError::config(
                "at least one required result file must be configured",
            ));
        }

        Ok(())
    }

    /// Path of the mapping document for `batch_id`.
    pub fn mapping_path(&self, batch_id: &str) -> PathBuf {
        self.batch_configs_dir
            .join(format!("batch_{}", batch_id))
            .join(MAPPING_FILE_NAME)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = TransferConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.required_result_files.len(), 3);
        assert_eq!(config.min_result_bytes, 1000);
    }

    #[test]
    fn local_backend_requires_path() {
        let mut config = TransferConfig {
            storage_backend: StorageBackend::Local,
            ..TransferConfig::default()
        };
        assert!(config.validate().is_err());

        config.local_storage_path = Some(PathBuf::from("/tmp/blobs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = TransferConfig {
            size_check_timeout: Duration::ZERO,
            ..TransferConfig::default()
        };
        assert!(matches!(config.validate(), Err(PairsyncError::Config(_))));
    }

    #[test]
    fn mapping_path_layout() {
        let config = TransferConfig {
            batch_configs_dir: PathBuf::from("/data/configs"),
            ..TransferConfig::default()
        };
        assert_eq!(
            config.mapping_path("007"),
            PathBuf::from("/data/configs/batch_007/video_image_mapping.json")
        );
    }

    #[test]
    fn integrity_check_parse() {
        assert_eq!("SIZE".parse::<IntegrityCheck>().unwrap(), IntegrityCheck::Size);
        assert_eq!("hash".parse::<IntegrityCheck>().unwrap(), IntegrityCheck::Sha256);
        assert!("md5".parse::<IntegrityCheck>().is_err());
    }

    #[test]
    fn split_list_skips_blanks() {
        assert_eq!(split_list(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }
}
