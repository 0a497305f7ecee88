//! Batch-level operations: load inputs, plan, run the engine, write the report.
//!
//! Anything that fails here before the engine starts is fatal and returned as a
//! [`PairsyncError`]. Once the engine runs, item failures only show up in the
//! returned report. Directory scans run on the blocking pool.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pairsync_core::config::MAPPING_FILE_NAME;
use pairsync_core::{
    BatchMapping, CompletenessRecord, PairsyncError, Result, TransferConfig, TransferDirection,
    TransferReport,
};
use pairsync_storage::{keys, BlobStore};

use crate::completeness::{CompletenessChecker, CompletenessSummary};
use crate::engine::{EngineOptions, TransferEngine};
use crate::listing::{select_dirs, FsListing, Listing};
use crate::plan::{download_output_dir, PlanFilters, TransferPlan};
use crate::report::{download_report_path, log_summary, upload_report_path, write_report};

const BATCH_DIR_PREFIX: &str = "batch_";

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub batch_id: String,
    /// Parent of the `batch_<id>_data` directory
    pub output_root: PathBuf,
    pub filters: PlanFilters,
    /// Mapping document to use instead of the one under the batch configs dir
    pub mapping_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub batch_id: String,
    /// Directory holding one subdirectory per result item
    pub results_root: PathBuf,
    pub filters: PlanFilters,
    /// Upload only directories that pass the completeness check
    pub complete_only: bool,
}

/// Download every video/image pair named in the batch mapping.
pub async fn download_batch(
    config: &TransferConfig,
    store: Arc<dyn BlobStore>,
    request: &DownloadRequest,
) -> Result<TransferReport> {
    let mapping_path = request
        .mapping_path
        .clone()
        .unwrap_or_else(|| config.mapping_path(&request.batch_id));
    let mapping = load_mapping(&mapping_path).await?;

    tracing::info!(
        batch_id = %request.batch_id,
        batch_number = ?mapping.batch_number(),
        output_root = %request.output_root.display(),
        "Planning download"
    );

    let plan = TransferPlan::for_download(
        &request.batch_id,
        &mapping,
        config,
        &request.output_root,
        &request.filters,
    );

    let output_dir = download_output_dir(&request.output_root, &request.batch_id);
    tokio::fs::create_dir_all(&output_dir).await?;

    let engine = TransferEngine::new(store, EngineOptions::from(config));
    let stats = engine.run(&plan).await;

    let report = TransferReport::from_stats(
        &request.batch_id,
        TransferDirection::Download,
        output_dir.display().to_string(),
        &stats,
    )
    .with_batch_number(mapping.batch_number().cloned());

    write_report(&report, &download_report_path(&output_dir)).await?;
    log_summary(&report);
    Ok(report)
}

/// Read and parse a mapping document; a missing or unreadable file is a
/// configuration error.
pub async fn load_mapping(path: &Path) -> Result<BatchMapping> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            PairsyncError::config(format!("batch config not found: {}", path.display()))
        }
        _ => PairsyncError::config(format!("failed to read {}: {}", path.display(), e)),
    })?;
    let mapping = BatchMapping::from_json(&raw)?;

    tracing::info!(
        path = %path.display(),
        pairs = mapping.len(),
        batch_number = ?mapping.batch_number(),
        "Loaded batch mapping"
    );

    Ok(mapping)
}

/// Upload result directories found under `request.results_root`.
pub async fn upload_batch(
    config: &TransferConfig,
    store: Arc<dyn BlobStore>,
    listing: Arc<dyn Listing>,
    request: &UploadRequest,
) -> Result<TransferReport> {
    let results_root = &request.results_root;
    if !tokio::fs::metadata(results_root)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
    {
        return Err(PairsyncError::config(format!(
            "Results directory not found: {}",
            results_root.display()
        )));
    }

    let (plan, completeness) = {
        let config = config.clone();
        let request = request.clone();
        run_blocking(move || plan_upload(&config, listing.as_ref(), &request)).await?
    };

    let engine = TransferEngine::new(store, EngineOptions::from(config));
    let stats = engine.run(&plan).await;

    let destination = keys::results_root(&config.results_prefix, &request.batch_id);
    let mut report = TransferReport::from_stats(
        &request.batch_id,
        TransferDirection::Upload,
        destination,
        &stats,
    );
    if let Some(summary) = completeness {
        report = report.with_completeness(summary.complete, summary.incomplete);
    }

    write_report(&report, &upload_report_path(results_root, &request.batch_id)).await?;
    log_summary(&report);
    Ok(report)
}

/// Completeness records for every result directory under `results_root`.
pub async fn check_results(
    config: &TransferConfig,
    listing: Arc<dyn Listing>,
    results_root: &Path,
) -> Result<Vec<CompletenessRecord>> {
    let checker = CompletenessChecker::from_config(config);
    let root = results_root.to_path_buf();
    run_blocking(move || checker.scan(&root, listing.as_ref())).await
}

fn plan_upload(
    config: &TransferConfig,
    listing: &dyn Listing,
    request: &UploadRequest,
) -> Result<(TransferPlan, Option<CompletenessSummary>)> {
    let results_root = &request.results_root;
    if !request.complete_only {
        let plan = TransferPlan::for_upload(
            &request.batch_id,
            results_root,
            listing,
            config,
            &request.filters,
        )?;
        return Ok((plan, None));
    }

    let records = CompletenessChecker::from_config(config).scan(results_root, listing)?;
    let summary = CompletenessSummary::of(&records);
    tracing::info!(
        batch_id = %request.batch_id,
        complete = summary.complete,
        incomplete = summary.incomplete,
        "Uploading complete results only"
    );

    let ids = records
        .into_iter()
        .filter(|record| record.is_complete())
        .map(|record| record.id)
        .collect();
    let plan = TransferPlan::for_upload_ids(
        &request.batch_id,
        ids,
        results_root,
        listing,
        config,
        &request.filters,
    );
    Ok((plan, Some(summary)))
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PairsyncError::Io(io::Error::other(e)))?
}

/// Batch ids under `configs_dir` that have a mapping file, sorted.
///
/// A missing directory yields an empty list.
pub fn list_available_batches(configs_dir: &Path) -> Result<Vec<String>> {
    if !configs_dir.is_dir() {
        tracing::warn!(dir = %configs_dir.display(), "Batch configs directory not found");
        return Ok(Vec::new());
    }

    let dirs = select_dirs(FsListing.list_dirs(configs_dir)?, BATCH_DIR_PREFIX);
    let batches = dirs
        .into_iter()
        .filter(|(_, path)| path.join(MAPPING_FILE_NAME).is_file())
        .filter_map(|(name, _)| name.strip_prefix(BATCH_DIR_PREFIX).map(str::to_string))
        .collect();
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_only_batches_with_mapping() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["batch_2", "batch_1", "batch_3"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("batch_1").join(MAPPING_FILE_NAME), "{}").unwrap();
        fs::write(dir.path().join("batch_2").join(MAPPING_FILE_NAME), "{}").unwrap();
        fs::create_dir_all(dir.path().join("other")).unwrap();

        let batches = list_available_batches(dir.path()).unwrap();
        assert_eq!(batches, vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn load_mapping_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MAPPING_FILE_NAME);
        fs::write(&path, r#"{"mapping": {"v1.mp4": "img1.jpg"}}"#).unwrap();

        let mapping = load_mapping(&path).await.unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.entries()[0].image, "img1.jpg");
    }

    #[tokio::test]
    async fn missing_mapping_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_mapping(&dir.path().join("batch_001").join(MAPPING_FILE_NAME))
            .await
            .unwrap_err();
        assert!(matches!(err, PairsyncError::Config(msg) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn check_results_scans_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("000005000001")).unwrap();

        let records = check_results(&TransferConfig::default(), Arc::new(FsListing), dir.path())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_complete());
    }

    #[test]
    fn missing_configs_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let batches = list_available_batches(&dir.path().join("absent")).unwrap();
        assert!(batches.is_empty());
    }
}
