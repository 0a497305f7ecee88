use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use pairsync_core::{IntegrityCheck, StorageBackend, TransferConfig};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flags that override `PAIRSYNC_*` environment settings.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Storage backend: azure or local
    #[arg(long, global = true, value_name = "BACKEND")]
    pub backend: Option<StorageBackend>,

    /// Blob container name
    #[arg(long, global = true)]
    pub container: Option<String>,

    /// Root directory for the local backend
    #[arg(long, global = true, value_name = "DIR")]
    pub local_storage_path: Option<PathBuf>,

    /// Directory holding batch_<id>/video_image_mapping.json
    #[arg(long, global = true, value_name = "DIR")]
    pub batch_configs: Option<PathBuf>,

    /// Skip check for existing files: size or sha256
    #[arg(long, global = true, value_name = "MODE")]
    pub integrity: Option<IntegrityCheck>,

    /// Azure storage connection string (or AZURE_STORAGE_CONNECTION_STRING / .env)
    #[arg(long, global = true, value_name = "CONN")]
    pub connection_string: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut TransferConfig) {
        if let Some(backend) = self.backend {
            config.storage_backend = backend;
        }
        if let Some(container) = self.container {
            config.container = container;
        }
        if let Some(path) = self.local_storage_path {
            config.local_storage_path = Some(path);
        }
        if let Some(dir) = self.batch_configs {
            config.batch_configs_dir = dir;
        }
        if let Some(integrity) = self.integrity {
            config.integrity_check = integrity;
        }
        if let Some(value) = self.connection_string {
            config.credentials = config.credentials.clone().with_explicit(value);
        }
    }
}

/// Initialize tracing for the CLI binary: stderr always, plus `log_file`
/// (appended, no ANSI) when given.
pub fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let (dir, name) = split_log_path(path)
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name)
                .build(&dir)
                .with_context(|| format!("Open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(appender))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Directory and file name of a log path. A bare file name lives in the
/// current directory.
fn split_log_path(path: &Path) -> Option<(PathBuf, String)> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_splits_into_dir_and_name() {
        assert_eq!(
            split_log_path(Path::new("/var/log/pairsync/download.log")),
            Some((PathBuf::from("/var/log/pairsync"), "download.log".to_string()))
        );
        assert_eq!(
            split_log_path(Path::new("upload.log")),
            Some((PathBuf::from("."), "upload.log".to_string()))
        );
        assert_eq!(split_log_path(Path::new("/")), None);
        assert_eq!(split_log_path(Path::new("logs/..")), None);
    }

    #[test]
    fn empty_overrides_keep_config() {
        let mut config = TransferConfig::default();
        ConfigOverrides::default().apply(&mut config);
        assert_eq!(config.container, "videos");
        assert_eq!(config.storage_backend, StorageBackend::Azure);
    }

    #[test]
    fn overrides_replace_fields() {
        let mut config = TransferConfig::default();
        ConfigOverrides {
            backend: Some(StorageBackend::Local),
            container: Some("staging".to_string()),
            local_storage_path: Some(PathBuf::from("/data")),
            integrity: Some(IntegrityCheck::Sha256),
            connection_string: Some("AccountName=a;AccountKey=k".to_string()),
            ..ConfigOverrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.storage_backend, StorageBackend::Local);
        assert_eq!(config.container, "staging");
        assert_eq!(config.local_storage_path, Some(PathBuf::from("/data")));
        assert_eq!(config.integrity_check, IntegrityCheck::Sha256);
        assert_eq!(
            config.credentials.resolve().unwrap(),
            "AccountName=a;AccountKey=k"
        );
    }
}
