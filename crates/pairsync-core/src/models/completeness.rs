use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletenessStatus {
    Complete,
    Incomplete,
}

/// Whether a result directory holds every required artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessRecord {
    pub id: String,
    pub status: CompletenessStatus,
    pub missing_files: Vec<String>,
}

impl CompletenessRecord {
    /// Status follows from `missing_files`: complete iff nothing is missing.
    pub fn new(id: impl Into<String>, missing_files: Vec<String>) -> Self {
        let status = if missing_files.is_empty() {
            CompletenessStatus::Complete
        } else {
            CompletenessStatus::Incomplete
        };
        Self {
            id: id.into(),
            status,
            missing_files,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == CompletenessStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derived_from_missing_files() {
        assert!(CompletenessRecord::new("a", vec![]).is_complete());
        let record = CompletenessRecord::new("b", vec!["x.png".to_string()]);
        assert_eq!(record.status, CompletenessStatus::Incomplete);
    }
}
