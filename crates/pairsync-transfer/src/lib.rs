//! Pairsync Transfer Library
//!
//! Resolves a batch into a [`TransferPlan`], runs it through the
//! [`TransferEngine`] against any [`pairsync_storage::BlobStore`], and emits a
//! JSON report. Result directories can be screened with the
//! [`CompletenessChecker`] before upload.

pub mod completeness;
pub mod engine;
pub mod jobs;
pub mod listing;
pub mod plan;
pub mod report;

pub use completeness::{CompletenessChecker, CompletenessSummary};
pub use engine::{EngineOptions, TransferEngine};
pub use jobs::{
    check_results, download_batch, list_available_batches, load_mapping, upload_batch,
    DownloadRequest, UploadRequest,
};
pub use listing::{FsListing, Listing};
pub use plan::{PlanFilters, TransferPlan};
pub use report::{download_report_path, upload_report_path, write_report};
