//! Shared key generation for storage backends.
//!
//! Every key the engine reads or writes is produced here so all backends see
//! the same layout.

use crate::{StorageError, StorageResult};

/// Reject keys that could escape a container or a local root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Join key segments with `/`, dropping empty segments and stray slashes.
pub fn join(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// `{prefix}/{filename}` for a source video or reference image.
pub fn source_key(prefix: &str, filename: &str) -> String {
    join(&[prefix, filename])
}

/// `{results_prefix}/batch_{batch_id}/`, the destination root of an upload run.
pub fn results_root(results_prefix: &str, batch_id: &str) -> String {
    format!("{}/", join(&[results_prefix, &format!("batch_{}", batch_id)]))
}

/// `{results_prefix}/batch_{batch_id}/{item_id}/{relative_path}`
pub fn result_key(results_prefix: &str, batch_id: &str, item_id: &str, relative_path: &str) -> String {
    join(&[
        results_prefix,
        &format!("batch_{}", batch_id),
        item_id,
        relative_path,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_key_layout() {
        assert_eq!(
            result_key("research/batch_results/", "001", "000005000016", "part2_output/frame.png"),
            "research/batch_results/batch_001/000005000016/part2_output/frame.png"
        );
        assert_eq!(
            results_root("research/batch_results", "001"),
            "research/batch_results/batch_001/"
        );
    }

    #[test]
    fn source_key_trims_slashes() {
        assert_eq!(source_key("raw/", "v.mp4"), "raw/v.mp4");
        assert_eq!(source_key("", "v.mp4"), "v.mp4");
    }

    #[test]
    fn traversal_rejected() {
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("raw/v.mp4").is_ok());
    }
}
