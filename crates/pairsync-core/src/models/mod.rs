pub mod completeness;
pub mod mapping;
pub mod report;
pub mod stats;
pub mod transfer;

pub use completeness::{CompletenessRecord, CompletenessStatus};
pub use mapping::{BatchInfo, BatchMapping, MappingEntry};
pub use report::TransferReport;
pub use stats::{ItemFailure, TransferStats};
pub use transfer::{Endpoint, TransferDirection, TransferItem, TransferPair};
