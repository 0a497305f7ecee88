//! Sequential transfer engine.
//!
//! Items run one after another. A failing pair is recorded against its item
//! and the run moves on; nothing below [`TransferEngine::run`] returns an
//! error to the caller.

use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pairsync_core::{
    Endpoint, IntegrityCheck, ItemErrorKind, ItemFailure, TransferConfig, TransferItem,
    TransferPair, TransferStats,
};
use pairsync_storage::{BlobStore, StorageError};
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::plan::TransferPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Bound on a single remote size lookup
    pub size_check_timeout: Duration,
    /// Bound on a single object read or write
    pub transfer_timeout: Duration,
    pub integrity_check: IntegrityCheck,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&TransferConfig::default())
    }
}

impl From<&TransferConfig> for EngineOptions {
    fn from(config: &TransferConfig) -> Self {
        Self {
            size_check_timeout: config.size_check_timeout,
            transfer_timeout: config.transfer_timeout,
            integrity_check: config.integrity_check,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairOutcome {
    Transferred(u64),
    /// Destination already identical; size attributed to throughput
    Skipped(u64),
}

impl PairOutcome {
    fn bytes(self) -> u64 {
        match self {
            PairOutcome::Transferred(bytes) | PairOutcome::Skipped(bytes) => bytes,
        }
    }
}

#[derive(Debug)]
struct PairError {
    kind: ItemErrorKind,
    message: String,
}

impl PairError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ItemErrorKind::NotFound,
            message: message.into(),
        }
    }

    fn transfer(message: impl Into<String>) -> Self {
        Self {
            kind: ItemErrorKind::Transfer,
            message: message.into(),
        }
    }
}

impl From<StorageError> for PairError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            PairError::not_found(err.to_string())
        } else {
            PairError::transfer(err.to_string())
        }
    }
}

type PairResult<T> = Result<T, PairError>;

pub struct TransferEngine {
    store: Arc<dyn BlobStore>,
    options: EngineOptions,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn BlobStore>, options: EngineOptions) -> Self {
        Self { store, options }
    }

    /// Execute every item of `plan` in order and return the finalized statistics.
    pub async fn run(&self, plan: &TransferPlan) -> TransferStats {
        let total = plan.len();
        let mut stats = TransferStats::start(total);

        tracing::info!(
            batch_id = %plan.batch_id(),
            items = total,
            location = %self.store.location(),
            "Starting transfer run"
        );

        for (index, item) in plan.items().iter().enumerate() {
            tracing::info!(
                item_id = %item.id(),
                direction = %item.direction(),
                "[{}/{}] Processing {}",
                index + 1,
                total,
                item.id()
            );
            self.execute_item(item, &mut stats).await;
        }

        stats.finish();

        tracing::info!(
            batch_id = %plan.batch_id(),
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped,
            success_rate = %format!("{:.1}", stats.success_rate()),
            total_size_mb = %format!("{:.1}", stats.total_size_mb()),
            elapsed_sec = %format!("{:.1}", stats.elapsed().as_secs_f64()),
            "Transfer run finished"
        );

        stats
    }

    async fn execute_item(&self, item: &TransferItem, stats: &mut TransferStats) {
        if let Some(error) = item.listing_error() {
            tracing::error!(item_id = %item.id(), error = %error, "Cannot list files");
            stats.record_failure(vec![ItemFailure {
                item_id: item.id().to_string(),
                kind: ItemErrorKind::Transfer,
                message: error.to_string(),
            }]);
            return;
        }

        if item.pairs().is_empty() {
            tracing::error!(item_id = %item.id(), "No files to transfer");
            stats.record_failure(vec![ItemFailure {
                item_id: item.id().to_string(),
                kind: ItemErrorKind::NotFound,
                message: "no files to transfer".to_string(),
            }]);
            return;
        }

        let mut bytes = 0u64;
        let mut all_skipped = true;
        let mut failures = Vec::new();

        for pair in item.pairs() {
            match self.execute_pair(pair).await {
                Ok(outcome) => {
                    let skipped = matches!(outcome, PairOutcome::Skipped(_));
                    all_skipped &= skipped;
                    bytes += outcome.bytes();
                    stats.record_file(skipped);
                }
                Err(err) => {
                    tracing::error!(
                        item_id = %item.id(),
                        source = %pair.source,
                        destination = %pair.destination,
                        kind = %err.kind,
                        error = %err.message,
                        "Transfer failed"
                    );
                    failures.push(ItemFailure {
                        item_id: item.id().to_string(),
                        kind: err.kind,
                        message: format!("{} -> {}: {}", pair.source, pair.destination, err.message),
                    });
                }
            }
        }

        if failures.is_empty() {
            stats.record_success(bytes, all_skipped);
            if all_skipped {
                tracing::info!(item_id = %item.id(), size_bytes = bytes, "Already present, skipped");
            } else {
                tracing::info!(
                    item_id = %item.id(),
                    files = item.pairs().len(),
                    size_bytes = bytes,
                    "Transferred"
                );
            }
        } else {
            tracing::warn!(item_id = %item.id(), failed_files = failures.len(), "Failed");
            stats.record_failure(failures);
        }
    }

    async fn execute_pair(&self, pair: &TransferPair) -> PairResult<PairOutcome> {
        match (&pair.source, &pair.destination) {
            (Endpoint::Remote(key), Endpoint::Local(path)) => self.download_pair(key, path).await,
            (Endpoint::Local(path), Endpoint::Remote(key)) => self.upload_pair(path, key).await,
            _ => Err(PairError::transfer(
                "unsupported pair: exactly one side must be remote",
            )),
        }
    }

    async fn download_pair(&self, key: &str, path: &Path) -> PairResult<PairOutcome> {
        let mut prefetched = None;

        if let Some(local_size) = local_file_size(path).await {
            match self.remote_size(key).await {
                Ok(Some(remote_size)) if remote_size == local_size => {
                    match self.options.integrity_check {
                        IntegrityCheck::Size => {
                            tracing::debug!(key = %key, size_bytes = local_size, "Skipping download, sizes match");
                            return Ok(PairOutcome::Skipped(local_size));
                        }
                        IntegrityCheck::Sha256 => {
                            let remote = self.read_remote(key).await?;
                            match fs::read(path).await {
                                Ok(local) if same_digest(&local, &remote) => {
                                    tracing::debug!(key = %key, size_bytes = local_size, "Skipping download, digests match");
                                    return Ok(PairOutcome::Skipped(local_size));
                                }
                                Ok(_) => {
                                    tracing::debug!(key = %key, "Digest mismatch at equal size");
                                }
                                Err(e) => verification_skipped(key, &e.to_string()),
                            }
                            prefetched = Some(remote);
                        }
                    }
                }
                Ok(_) => {}
                Err(reason) => verification_skipped(key, &reason),
            }
        }

        let data = match prefetched {
            Some(data) => data,
            None => self.read_remote(key).await?,
        };
        let size = data.len() as u64;

        self.bounded("write", write_local(path, data)).await??;

        tracing::debug!(key = %key, path = %path.display(), size_bytes = size, "Downloaded");
        Ok(PairOutcome::Transferred(size))
    }

    async fn upload_pair(&self, path: &Path, key: &str) -> PairResult<PairOutcome> {
        let local_size = match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Err(PairError::not_found(format!("{} is not a file", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PairError::not_found(format!("{} not found", path.display())))
            }
            Err(e) => return Err(PairError::transfer(e.to_string())),
        };

        match self.remote_size(key).await {
            Ok(Some(remote_size)) if remote_size == local_size => match self.options.integrity_check {
                IntegrityCheck::Size => {
                    tracing::debug!(key = %key, size_bytes = local_size, "Skipping upload, sizes match");
                    return Ok(PairOutcome::Skipped(local_size));
                }
                IntegrityCheck::Sha256 => match self.bounded("read", self.store.download(key)).await {
                    Ok(Ok(remote)) => {
                        let local = read_local(path).await?;
                        if same_digest(&local, &remote) {
                            tracing::debug!(key = %key, size_bytes = local_size, "Skipping upload, digests match");
                            return Ok(PairOutcome::Skipped(local_size));
                        }
                        return self.write_remote(key, local).await;
                    }
                    Ok(Err(e)) => verification_skipped(key, &e.to_string()),
                    Err(e) => verification_skipped(key, &e.message),
                },
            },
            Ok(_) => {}
            Err(reason) => verification_skipped(key, &reason),
        }

        let data = read_local(path).await?;
        self.write_remote(key, data).await
    }

    /// Remote size, or the reason it could not be determined.
    async fn remote_size(&self, key: &str) -> Result<Option<u64>, String> {
        match tokio::time::timeout(self.options.size_check_timeout, self.store.content_length(key)).await {
            Ok(Ok(size)) => Ok(size),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "size lookup timed out after {}s",
                self.options.size_check_timeout.as_secs_f64()
            )),
        }
    }

    async fn read_remote(&self, key: &str) -> PairResult<Vec<u8>> {
        Ok(self.bounded("read", self.store.download(key)).await??)
    }

    async fn write_remote(&self, key: &str, data: Vec<u8>) -> PairResult<PairOutcome> {
        let size = data.len() as u64;
        self.bounded("write", self.store.upload_with_key(key, data))
            .await??;
        tracing::debug!(key = %key, size_bytes = size, "Uploaded");
        Ok(PairOutcome::Transferred(size))
    }

    /// Run `fut` under the transfer timeout; elapsing is a transfer error.
    async fn bounded<F, T>(&self, operation: &str, fut: F) -> PairResult<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.options.transfer_timeout, fut)
            .await
            .map_err(|_| {
                PairError::transfer(format!(
                    "{} timed out after {}s",
                    operation,
                    self.options.transfer_timeout.as_secs_f64()
                ))
            })
    }
}

fn verification_skipped(key: &str, reason: &str) {
    tracing::debug!(key = %key, reason = %reason, "Verification skipped, transferring anyway");
}

fn same_digest(a: &[u8], b: &[u8]) -> bool {
    let left = Sha256::digest(a);
    let right = Sha256::digest(b);
    if left != right {
        tracing::trace!(left = %hex::encode(left), right = %hex::encode(right), "Digests differ");
    }
    left == right
}

async fn local_file_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .await
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
}

async fn read_local(path: &Path) -> PairResult<Vec<u8>> {
    fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => PairError::not_found(format!("{} not found", path.display())),
        _ => PairError::transfer(format!("failed to read {}: {}", path.display(), e)),
    })
}

async fn write_local(path: &Path, data: Vec<u8>) -> PairResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            PairError::transfer(format!("failed to create {}: {}", parent.display(), e))
        })?;
    }
    fs::write(path, data)
        .await
        .map_err(|e| PairError::transfer(format!("failed to write {}: {}", path.display(), e)))
}
