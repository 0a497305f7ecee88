use std::path::{Path, PathBuf};

use pairsync_core::{Result, TransferReport};
use tokio::fs;

const DOWNLOAD_REPORT_NAME: &str = "download_report.json";

/// `<output_dir>/download_report.json`
pub fn download_report_path(output_dir: &Path) -> PathBuf {
    output_dir.join(DOWNLOAD_REPORT_NAME)
}

/// `<results_root>/upload_report_batch_<id>.json`
pub fn upload_report_path(results_root: &Path, batch_id: &str) -> PathBuf {
    results_root.join(format!("upload_report_batch_{}.json", batch_id))
}

/// Write `report` as pretty JSON, replacing any previous report at `path`.
pub async fn write_report(report: &TransferReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(report)?;
    fs::write(path, body).await?;

    tracing::info!(path = %path.display(), "Report written");
    Ok(())
}

pub fn log_summary(report: &TransferReport) {
    tracing::info!(
        batch_id = %report.batch_id,
        direction = %report.direction,
        requested = report.total_requested,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        success_rate = report.success_rate,
        total_size_mb = report.total_size_mb,
        elapsed_time_sec = report.elapsed_time_sec,
        destination = %report.destination,
        "Batch {} {} complete: {}/{} succeeded",
        report.batch_id,
        report.direction,
        report.succeeded,
        report.total_requested
    );
    for failure in &report.failures {
        tracing::warn!(
            item_id = %failure.item_id,
            kind = %failure.kind,
            "{}",
            failure.message
        );
    }
}
