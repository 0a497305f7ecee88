//! Result directory completeness checks.

use std::path::Path;

use pairsync_core::{CompletenessRecord, Result, TransferConfig};

use crate::listing::{select_dirs, Listing};

/// Decides whether a result directory holds every required artifact.
///
/// A required file counts as present only when it exists and holds at least
/// `min_bytes`.
#[derive(Debug, Clone)]
pub struct CompletenessChecker {
    id_prefix: String,
    required: Vec<String>,
    min_bytes: u64,
}

impl CompletenessChecker {
    pub fn new(id_prefix: impl Into<String>, required: Vec<String>, min_bytes: u64) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            required,
            min_bytes,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self::new(
            config.result_dir_prefix.clone(),
            config.required_result_files.clone(),
            config.min_result_bytes,
        )
    }

    /// One record per matching directory under `root`, sorted by id.
    pub fn scan(&self, root: &Path, listing: &dyn Listing) -> Result<Vec<CompletenessRecord>> {
        let dirs = select_dirs(listing.list_dirs(root)?, &self.id_prefix);

        let records: Vec<CompletenessRecord> = dirs
            .into_iter()
            .map(|(id, dir)| self.check_dir(id, &dir, listing))
            .collect();

        let summary = CompletenessSummary::of(&records);
        tracing::info!(
            root = %root.display(),
            complete = summary.complete,
            incomplete = summary.incomplete,
            "Completeness scan finished"
        );

        Ok(records)
    }

    pub fn check_dir(&self, id: String, dir: &Path, listing: &dyn Listing) -> CompletenessRecord {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|relative| {
                let present = listing
                    .file_size(&dir.join(relative.as_str()))
                    .is_some_and(|size| size >= self.min_bytes);
                !present
            })
            .cloned()
            .collect();

        if !missing.is_empty() {
            tracing::debug!(item_id = %id, missing = ?missing, "Result directory incomplete");
        }
        CompletenessRecord::new(id, missing)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletenessSummary {
    pub complete: usize,
    pub incomplete: usize,
}

impl CompletenessSummary {
    pub fn of(records: &[CompletenessRecord]) -> Self {
        let complete = records.iter().filter(|r| r.is_complete()).count();
        Self {
            complete,
            incomplete: records.len() - complete,
        }
    }
}
