use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::ItemErrorKind;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Why one pair of an item failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub kind: ItemErrorKind,
    pub message: String,
}

/// Per-run accumulator owned by the engine.
#[derive(Debug, Clone)]
pub struct TransferStats {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Succeeded items whose every pair was already present
    pub skipped: usize,
    pub files_transferred: usize,
    pub files_skipped: usize,
    pub bytes: u64,
    pub failures: Vec<ItemFailure>,
    started: Instant,
    elapsed: Option<Duration>,
}

impl TransferStats {
    pub fn start(requested: usize) -> Self {
        Self {
            requested,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            files_transferred: 0,
            files_skipped: 0,
            bytes: 0,
            failures: Vec::new(),
            started: Instant::now(),
            elapsed: None,
        }
    }

    pub fn record_success(&mut self, bytes: u64, all_skipped: bool) {
        self.succeeded += 1;
        self.bytes += bytes;
        if all_skipped {
            self.skipped += 1;
        }
    }

    /// Count one failed item; each entry describes one failing pair.
    pub fn record_failure(&mut self, failures: Vec<ItemFailure>) {
        self.failed += 1;
        self.failures.extend(failures);
    }

    pub fn record_file(&mut self, skipped: bool) {
        if skipped {
            self.files_skipped += 1;
        } else {
            self.files_transferred += 1;
        }
    }

    /// Close the duration timer. Idempotent.
    pub fn finish(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    /// Percentage of attempted items that succeeded.
    pub fn success_rate(&self) -> f64 {
        let attempted = (self.succeeded + self.failed).max(1);
        100.0 * self.succeeded as f64 / attempted as f64
    }

    pub fn total_size_mb(&self) -> f64 {
        self.bytes as f64 / BYTES_PER_MIB
    }
}
