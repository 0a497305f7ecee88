use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::stats::{ItemFailure, TransferStats};
use super::transfer::TransferDirection;

/// Durable summary of one run, written as JSON when the run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReport {
    pub batch_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub batch_number: Option<JsonValue>,
    pub direction: TransferDirection,
    pub total_requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Percentage, one decimal
    pub success_rate: f64,
    pub files_transferred: usize,
    pub files_skipped: usize,
    pub total_size_mb: f64,
    pub elapsed_time_sec: f64,
    /// Output directory for downloads, remote prefix for uploads
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub complete_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub incomplete_skipped: Option<usize>,
    pub generated_at: DateTime<Utc>,
    pub failures: Vec<ItemFailure>,
}

impl TransferReport {
    pub fn from_stats(
        batch_id: impl Into<String>,
        direction: TransferDirection,
        destination: impl Into<String>,
        stats: &TransferStats,
    ) -> Self {
        Self {
            batch_id: batch_id.into(),
            batch_number: None,
            direction,
            total_requested: stats.requested,
            succeeded: stats.succeeded,
            failed: stats.failed,
            skipped: stats.skipped,
            success_rate: round_one_decimal(stats.success_rate()),
            files_transferred: stats.files_transferred,
            files_skipped: stats.files_skipped,
            total_size_mb: round_two_decimals(stats.total_size_mb()),
            elapsed_time_sec: round_two_decimals(stats.elapsed().as_secs_f64()),
            destination: destination.into(),
            complete_found: None,
            incomplete_skipped: None,
            generated_at: Utc::now(),
            failures: stats.failures.clone(),
        }
    }

    pub fn with_batch_number(mut self, batch_number: Option<JsonValue>) -> Self {
        self.batch_number = batch_number;
        self
    }

    /// Attach completeness counts for complete-only uploads.
    pub fn with_completeness(mut self, complete_found: usize, incomplete_skipped: usize) -> Self {
        self.complete_found = Some(complete_found);
        self.incomplete_skipped = Some(incomplete_skipped);
        self
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemErrorKind;

    #[test]
    fn rounds_success_rate_to_one_decimal() {
        let mut stats = TransferStats::start(3);
        stats.record_success(0, false);
        stats.record_success(0, false);
        stats.record_failure(vec![ItemFailure {
            item_id: "x".to_string(),
            kind: ItemErrorKind::Transfer,
            message: "timeout".to_string(),
        }]);
        stats.finish();

        let report = TransferReport::from_stats("001", TransferDirection::Download, "/out", &stats);
        assert_eq!(report.success_rate, 66.7);
        assert_eq!(report.total_requested, 3);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn optional_fields_omitted_from_json() {
        let stats = TransferStats::start(0);
        let report = TransferReport::from_stats("002", TransferDirection::Upload, "p/", &stats);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("complete_found").is_none());
        assert!(json.get("batch_number").is_none());
        assert_eq!(json["direction"], "upload");

        let json = serde_json::to_value(report.with_completeness(4, 1)).unwrap();
        assert_eq!(json["complete_found"], 4);
        assert_eq!(json["incomplete_skipped"], 1);
    }
}
