//! Directory traversal for staging-tree summaries.

use std::path::Path;
use walkdir::WalkDir;

/// File count and total size of a directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Walk `root` (symlinks not followed) and total its regular files.
///
/// A missing root summarises as empty.
pub fn summarize(root: &Path) -> std::io::Result<TreeSummary> {
    let mut summary = TreeSummary::default();
    if !root.exists() {
        return Ok(summary);
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        summary.files += 1;
        summary.bytes += entry.metadata()?.len();
    }

    Ok(summary)
}

/// Names of the immediate sub-directories of `root`, sorted.
pub fn subdirectories(root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}
