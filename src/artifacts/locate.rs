//! Lockfile location
//!
//! A manifest's lockfile is either its sibling or, in a workspace, the
//! lockfile of an enclosing directory. The nearest one wins.

use crate::error::FsError;
use crate::fs::{EntryKind, FileSystem};
use std::path::{Path, PathBuf};

/// Directories searched for a manifest, nearest first
///
/// Always starts with the manifest's own directory; with `search_ancestors`
/// continues up to and including the repository root.
pub fn candidate_dirs(manifest: &Path, search_ancestors: bool) -> Vec<PathBuf> {
    let start = manifest.parent().unwrap_or(Path::new(""));
    if !search_ancestors {
        return vec![start.to_path_buf()];
    }
    let mut dirs: Vec<PathBuf> = start.ancestors().map(Path::to_path_buf).collect();
    // The empty path stands for the repository root
    if dirs.last().is_some_and(|d| !d.as_os_str().is_empty()) {
        dirs.push(PathBuf::new());
    }
    dirs
}

/// Find the nearest file called `lockfile_name` for a manifest
pub async fn find_lockfile(
    fs: &dyn FileSystem,
    manifest: &Path,
    lockfile_name: &str,
    search_ancestors: bool,
) -> Result<Option<PathBuf>, FsError> {
    for dir in candidate_dirs(manifest, search_ancestors) {
        let candidate = dir.join(lockfile_name);
        match fs.stat(&candidate).await? {
            Some(EntryKind::File) => {
                tracing::debug!("found {} for {}", candidate.display(), manifest.display());
                return Ok(Some(candidate));
            }
            Some(EntryKind::Directory) | None => {
                tracing::debug!("{} not found", candidate.display());
            }
        }
    }
    Ok(None)
}
