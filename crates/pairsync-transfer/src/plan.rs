//! Turning a batch mapping or a results directory into an ordered list of
//! transfer items.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use pairsync_core::{BatchMapping, MappingEntry, Result, TransferConfig, TransferItem};
use pairsync_storage::keys;

use crate::listing::{relative_key_path, select_dirs, Listing};

/// Count limit and resume cursor applied to a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanFilters {
    pub limit: Option<NonZeroUsize>,
    /// Start at the first item whose id contains this substring
    pub resume_after: Option<String>,
}

impl PlanFilters {
    pub fn new(limit: Option<NonZeroUsize>, resume_after: Option<String>) -> Self {
        Self {
            limit,
            resume_after: resume_after.filter(|cursor| !cursor.is_empty()),
        }
    }
}

/// Result of applying [`PlanFilters`] to an ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<T> {
    pub selected: Vec<T>,
    /// A resume cursor was given and matched nothing
    pub cursor_not_found: bool,
}

/// Apply resume cursor, then limit. Order is preserved.
pub fn apply_filters<T, F>(entries: Vec<T>, filters: &PlanFilters, id_of: F) -> Selection<T>
where
    F: Fn(&T) -> &str,
{
    let mut selected = entries;
    let mut cursor_not_found = false;

    if let Some(cursor) = filters.resume_after.as_deref() {
        match selected.iter().position(|entry| id_of(entry).contains(cursor)) {
            Some(start) => {
                selected.drain(..start);
            }
            None => {
                cursor_not_found = true;
                selected.clear();
            }
        }
    }

    if let Some(limit) = filters.limit {
        selected.truncate(limit.get());
    }

    Selection {
        selected,
        cursor_not_found,
    }
}

/// Item id for a video file: the configured suffix stripped, else the file stem.
pub fn video_item_id(video: &str, suffix: &str) -> String {
    if !suffix.is_empty() {
        if let Some(stripped) = video.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    Path::new(video)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(video)
        .to_string()
}

/// Local directory receiving a downloaded batch.
pub fn download_output_dir(output_root: &Path, batch_id: &str) -> PathBuf {
    output_root.join(format!("batch_{}_data", batch_id))
}

#[derive(Debug, Clone)]
pub struct TransferPlan {
    batch_id: String,
    items: Vec<TransferItem>,
    cursor_not_found: bool,
}

impl TransferPlan {
    /// Plan downloads of every video/image pair in `mapping`.
    ///
    /// The resume cursor is matched against the video filename, as listed in
    /// the mapping document.
    pub fn for_download(
        batch_id: &str,
        mapping: &BatchMapping,
        config: &TransferConfig,
        output_root: &Path,
        filters: &PlanFilters,
    ) -> Self {
        let output_dir = download_output_dir(output_root, batch_id);
        let selection = apply_filters(mapping.entries().to_vec(), filters, |e: &MappingEntry| {
            e.video.as_str()
        });

        let items = selection
            .selected
            .into_iter()
            .map(|entry| {
                let item_id = video_item_id(&entry.video, &config.video_suffix);
                let item_dir = output_dir.join(&item_id);
                TransferItem::download(
                    item_id,
                    vec![
                        (
                            keys::source_key(&config.video_prefix, &entry.video),
                            item_dir.join(&entry.video),
                        ),
                        (
                            keys::source_key(&config.image_prefix, &entry.image),
                            item_dir.join(&entry.image),
                        ),
                    ],
                )
            })
            .collect();

        Self::finish(batch_id, items, selection.cursor_not_found, filters)
    }

    /// Plan uploads of every result directory under `results_root` whose name
    /// starts with the configured prefix.
    pub fn for_upload(
        batch_id: &str,
        results_root: &Path,
        listing: &dyn Listing,
        config: &TransferConfig,
        filters: &PlanFilters,
    ) -> Result<Self> {
        let dirs = select_dirs(listing.list_dirs(results_root)?, &config.result_dir_prefix);
        let ids = dirs.into_iter().map(|(name, _)| name).collect();
        Ok(Self::for_upload_ids(
            batch_id,
            ids,
            results_root,
            listing,
            config,
            filters,
        ))
    }

    /// Plan uploads for an explicit, already ordered list of result directory ids.
    pub fn for_upload_ids(
        batch_id: &str,
        ids: Vec<String>,
        results_root: &Path,
        listing: &dyn Listing,
        config: &TransferConfig,
        filters: &PlanFilters,
    ) -> Self {
        let selection = apply_filters(ids, filters, |id: &String| id.as_str());

        let items = selection
            .selected
            .into_iter()
            .map(|item_id| {
                let item_dir = results_root.join(&item_id);
                let files = match listing.walk_files(&item_dir) {
                    Ok(files) => files,
                    Err(e) => {
                        tracing::warn!(
                            item_id = %item_id,
                            dir = %item_dir.display(),
                            error = %e,
                            "Failed to list result files"
                        );
                        let message = format!("failed to list {}: {}", item_dir.display(), e);
                        return TransferItem::unlisted_upload(item_id, message);
                    }
                };

                let pairs = files
                    .into_iter()
                    .filter_map(|file| {
                        let relative = relative_key_path(&item_dir, &file)?;
                        let key =
                            keys::result_key(&config.results_prefix, batch_id, &item_id, &relative);
                        Some((file, key))
                    })
                    .collect();

                TransferItem::upload(item_id, pairs)
            })
            .collect();

        Self::finish(batch_id, items, selection.cursor_not_found, filters)
    }

    fn finish(
        batch_id: &str,
        items: Vec<TransferItem>,
        cursor_not_found: bool,
        filters: &PlanFilters,
    ) -> Self {
        if cursor_not_found {
            tracing::warn!(
                batch_id = %batch_id,
                resume_after = ?filters.resume_after,
                "Resume cursor matched no item; nothing to transfer"
            );
        } else if let Some(cursor) = &filters.resume_after {
            tracing::info!(batch_id = %batch_id, resume_after = %cursor, "Resuming from cursor");
        }
        if let Some(limit) = filters.limit {
            tracing::info!(batch_id = %batch_id, limit = limit.get(), "Plan limited");
        }

        Self {
            batch_id: batch_id.to_string(),
            items,
            cursor_not_found,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor_not_found(&self) -> bool {
        self.cursor_not_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairsync_core::Endpoint;
    use std::collections::BTreeMap;
    use std::io;

    fn limit(n: usize) -> Option<NonZeroUsize> {
        NonZeroUsize::new(n)
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("video_{:02}", i)).collect()
    }

    #[test]
    fn limit_takes_prefix() {
        for total in 0..6 {
            for l in 1..8 {
                let filters = PlanFilters::new(limit(l), None);
                let selection = apply_filters(ids(total), &filters, |s| s.as_str());
                assert_eq!(selection.selected.len(), total.min(l));
                assert_eq!(selection.selected, ids(total)[..total.min(l)].to_vec());
            }
        }
    }

    #[test]
    fn resume_starts_at_first_match_inclusive() {
        let filters = PlanFilters::new(None, Some("_03".to_string()));
        let selection = apply_filters(ids(6), &filters, |s| s.as_str());
        assert_eq!(selection.selected, ids(6)[3..].to_vec());
        assert!(!selection.cursor_not_found);
    }

    #[test]
    fn resume_uses_first_of_several_matches() {
        let filters = PlanFilters::new(None, Some("video".to_string()));
        let selection = apply_filters(ids(4), &filters, |s| s.as_str());
        assert_eq!(selection.selected, ids(4));
    }

    #[test]
    fn unmatched_cursor_yields_empty_plan() {
        let filters = PlanFilters::new(limit(2), Some("nope".to_string()));
        let selection = apply_filters(ids(4), &filters, |s| s.as_str());
        assert!(selection.selected.is_empty());
        assert!(selection.cursor_not_found);
    }

    #[test]
    fn resume_applies_before_limit() {
        let filters = PlanFilters::new(limit(2), Some("_01".to_string()));
        let selection = apply_filters(ids(5), &filters, |s| s.as_str());
        assert_eq!(selection.selected, vec!["video_01".to_string(), "video_02".to_string()]);
    }

    #[test]
    fn empty_cursor_is_ignored() {
        assert_eq!(PlanFilters::new(None, Some(String::new())).resume_after, None);
    }

    #[test]
    fn video_item_id_strips_suffix_or_extension() {
        assert_eq!(
            video_item_id("000005000016.0_processed.mp4", ".0_processed.mp4"),
            "000005000016"
        );
        assert_eq!(video_item_id("clip.mov", ".0_processed.mp4"), "clip");
        assert_eq!(video_item_id("noext", ""), "noext");
    }

    #[test]
    fn download_plan_example() {
        let mapping = BatchMapping::from_pairs([("v1.mp4", "img1.jpg"), ("v2.mp4", "img2.jpg")]);
        let config = TransferConfig::default();
        let plan = TransferPlan::for_download(
            "001",
            &mapping,
            &config,
            Path::new("/out"),
            &PlanFilters::new(limit(1), None),
        );

        assert_eq!(plan.len(), 1);
        let item = &plan.items()[0];
        assert_eq!(item.id(), "v1");
        assert_eq!(
            item.pairs()[0].source,
            Endpoint::Remote("ruijian-research/raw/v1.mp4".to_string())
        );
        assert_eq!(
            item.pairs()[1].source,
            Endpoint::Remote("ruijian-research/celeba-hq/img1.jpg".to_string())
        );
        assert_eq!(
            item.pairs()[1].destination,
            Endpoint::Local(PathBuf::from("/out/batch_001_data/v1/img1.jpg"))
        );
    }

    /// In-memory tree: directory -> files (path, size)
    struct FakeListing {
        dirs: BTreeMap<PathBuf, Vec<(PathBuf, u64)>>,
    }

    impl Listing for FakeListing {
        fn list_dirs(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
            Ok(self
                .dirs
                .keys()
                .filter(|d| d.parent() == Some(root))
                .rev()
                .cloned()
                .collect())
        }

        fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
            self.dirs
                .get(dir)
                .map(|files| files.iter().map(|(p, _)| p.clone()).collect())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no dir"))
        }

        fn file_size(&self, path: &Path) -> Option<u64> {
            self.dirs
                .values()
                .flatten()
                .find(|(p, _)| p == path)
                .map(|(_, size)| *size)
        }
    }

    #[test]
    fn upload_plan_from_listing() {
        let root = PathBuf::from("/results");
        let mut dirs = BTreeMap::new();
        dirs.insert(
            root.join("000005000002"),
            vec![(root.join("000005000002/part2_output/a.mp4"), 10)],
        );
        dirs.insert(
            root.join("000005000001"),
            vec![
                (root.join("000005000001/log.txt"), 1),
                (root.join("000005000001/part2_output/a.mp4"), 10),
            ],
        );
        dirs.insert(root.join("scratch"), vec![]);
        let listing = FakeListing { dirs };

        let config = TransferConfig::default();
        let plan =
            TransferPlan::for_upload("007", &root, &listing, &config, &PlanFilters::default())
                .unwrap();

        let ids: Vec<_> = plan.items().iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["000005000001", "000005000002"]);
        assert_eq!(
            plan.items()[0].pairs()[1].destination,
            Endpoint::Remote(
                "ruijian-research/batch_results/batch_007/000005000001/part2_output/a.mp4"
                    .to_string()
            )
        );
    }

    #[test]
    fn unreadable_result_dir_keeps_listing_error() {
        let listing = FakeListing {
            dirs: BTreeMap::new(),
        };
        let plan = TransferPlan::for_upload_ids(
            "001",
            vec!["000005000009".to_string()],
            Path::new("/results"),
            &listing,
            &TransferConfig::default(),
            &PlanFilters::default(),
        );
        assert_eq!(plan.len(), 1);
        assert!(plan.items()[0].pairs().is_empty());
        let error = plan.items()[0].listing_error().unwrap();
        assert!(error.contains("/results/000005000009"));
        assert!(error.contains("no dir"));
    }
}
