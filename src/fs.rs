//! Filesystem collaborator
//!
//! All paths handed to a [`FileSystem`] are relative to the repository root.

use crate::error::FsError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Kind of entry found by [`FileSystem::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Repository-relative file access
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Entry kind at the path, `None` if nothing exists there
    async fn stat(&self, path: &Path) -> Result<Option<EntryKind>, FsError>;

    /// Read a file as UTF-8 text
    async fn read_file(&self, path: &Path) -> Result<String, FsError>;

    /// Write a file, creating parent directories as needed
    async fn output_file(&self, path: &Path, contents: &str) -> Result<(), FsError>;
}

/// [`FileSystem`] over a local checkout
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Create a filesystem rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a repository-relative path, rejecting escapes from the root
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, FsError> {
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(FsError::OutsideRoot {
                path: path.to_path_buf(),
            });
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn stat(&self, path: &Path) -> Result<Option<EntryKind>, FsError> {
        let full = self.resolve(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FsError::read_error(path, e)),
        }
    }

    async fn read_file(&self, path: &Path) -> Result<String, FsError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| FsError::read_error(path, e))
    }

    async fn output_file(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::write_error(path, e))?;
        }
        tokio::fs::write(&full, contents)
            .await
            .map_err(|e| FsError::write_error(path, e))?;
        tracing::debug!("wrote {}", path.display());
        Ok(())
    }
}
