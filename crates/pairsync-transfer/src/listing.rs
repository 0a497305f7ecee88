//! Local directory inspection behind a trait, so planning and completeness
//! checks can run against an in-memory tree in tests.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub trait Listing: Send + Sync {
    /// Immediate subdirectories of `root`, in no particular order.
    fn list_dirs(&self, root: &Path) -> io::Result<Vec<PathBuf>>;

    /// Every regular file below `dir`, recursively, sorted by path.
    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Size of a regular file, `None` if absent or not a file.
    fn file_size(&self, path: &Path) -> Option<u64>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsListing;

impl Listing for FsListing {
    fn list_dirs(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path)
            .ok()
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
    }
}

/// Keep directories whose name starts with `prefix`, sorted by name.
///
/// Returns `(name, path)` pairs; names that are not valid UTF-8 are skipped.
pub fn select_dirs(entries: Vec<PathBuf>, prefix: &str) -> Vec<(String, PathBuf)> {
    let mut selected: Vec<(String, PathBuf)> = entries
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            name.starts_with(prefix).then_some((name, path))
        })
        .collect();
    selected.sort_by(|a, b| a.0.cmp(&b.0));
    selected
}

/// `relative` rendered with `/` separators, as used in blob keys.
pub fn relative_key_path(base: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(base).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    let joined = parts?.join("/");
    (!joined.is_empty()).then_some(joined)
}
