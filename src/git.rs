//! Version control collaborator
//!
//! Only used to read the committed content of a file, which serves as the
//! baseline when deciding whether a regenerated lockfile changed.

use crate::exec::{child_process_env, CommandRunner, ExecOptions, SystemRunner};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read access to committed files
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Content of the file at `HEAD`, `None` if it is not tracked or unreadable
    async fn get_file(&self, path: &Path) -> Option<String>;
}

/// [`Vcs`] backed by the `git` command line
pub struct GitCli {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl GitCli {
    /// Create a git reader for the repository at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            runner: Arc::new(SystemRunner::new()),
        }
    }

    /// Use a different process runner (builder pattern)
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Object spec for a path relative to the checkout root
    ///
    /// The `./` prefix makes git resolve it from the working directory, so a
    /// checkout nested inside a larger repository reads its own files.
    fn object_spec(path: &Path) -> String {
        let path = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        format!("HEAD:./{}", path)
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn get_file(&self, path: &Path) -> Option<String> {
        let args = vec!["show".to_string(), Self::object_spec(path)];
        let options = ExecOptions {
            cwd: self.root.clone(),
            env: child_process_env(&[], &BTreeMap::new()),
        };
        match self.runner.run("git", &args, &options).await {
            Ok(output) => Some(output.stdout),
            Err(e) => {
                tracing::debug!("no committed content for {}: {}", path.display(), e);
                None
            }
        }
    }
}
