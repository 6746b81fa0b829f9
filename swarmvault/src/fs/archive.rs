//! Gzip tar archives and archive retention.

use crate::session::{ARCHIVE_PREFIX, ARCHIVE_SUFFIX};
use crate::utils::{Result, VaultError};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Write `src` as a gzip tar at `dest`, with every member rooted at `root_name`.
///
/// A partially written `dest` is removed on failure.
pub fn pack_directory(src: &Path, root_name: &str, dest: &Path) -> Result<()> {
    let result = write_archive(src, root_name, dest);
    if result.is_err() && dest.is_file() {
        let _ = std::fs::remove_file(dest);
    }
    result
}

fn write_archive(src: &Path, root_name: &str, dest: &Path) -> Result<()> {
    let file = File::create(dest).map_err(|e| {
        VaultError::Archive(format!("cannot create {}: {}", dest.display(), e))
    })?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);
    builder.append_dir_all(root_name, src).map_err(|e| {
        VaultError::Archive(format!(
            "cannot add {} to {}: {}",
            src.display(),
            dest.display(),
            e
        ))
    })?;

    let encoder = builder.into_inner()?;
    encoder.finish()?.sync_all()?;
    Ok(())
}

/// [`pack_directory`] on the blocking thread pool.
pub async fn pack_directory_blocking(src: PathBuf, root_name: String, dest: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || pack_directory(&src, &root_name, &dest))
        .await
        .map_err(|e| VaultError::Archive(format!("archive task failed: {}", e)))?
}

/// Keep the newest `keep` session archives in `backup_root`, delete the rest.
///
/// Archive names embed a sortable timestamp, so name order is age order.
/// Returns the names that were removed.
pub fn prune_archives(backup_root: &Path, keep: usize) -> std::io::Result<Vec<String>> {
    let mut archives: Vec<_> = std::fs::read_dir(backup_root)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.starts_with(ARCHIVE_PREFIX) && name.ends_with(ARCHIVE_SUFFIX)
        })
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();

    archives.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = Vec::new();
    for old in archives.into_iter().skip(keep) {
        let name = old.file_name().to_string_lossy().to_string();
        match std::fs::remove_file(old.path()) {
            Ok(()) => {
                tracing::info!(archive = %name, "Removed old archive");
                removed.push(name);
            }
            Err(e) => tracing::warn!(archive = %name, error = %e, "Failed to remove old archive"),
        }
    }

    Ok(removed)
}
