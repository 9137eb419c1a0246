//! Artifact update engine
//!
//! Regenerates the lockfile(s) that belong to a rewritten manifest:
//! locate the lockfile, capture its committed content, write the manifest,
//! run the ecosystem tool, then diff. The sequence is identical for every
//! ecosystem; [`ArtifactStrategy`] supplies what differs.
//!
//! Failures never escape [`ArtifactEngine::update_artifacts`]; they become
//! [`ArtifactOutcome::Failed`] so one broken manifest cannot abort a batch.

mod locate;

pub use locate::{candidate_dirs, find_lockfile};

use crate::config::AdminConfig;
use crate::domain::{ArtifactOutcome, LockfileUpdate, UpdateArtifactsConfig};
use crate::error::ArtifactError;
use crate::exec::{ToolCommand, ToolExecutor, ToolImage};
use crate::fs::{FileSystem, LocalFs};
use crate::git::{GitCli, Vcs};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Input for building an ecosystem's commands
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// The update being applied
    pub config: &'a UpdateArtifactsConfig,
    /// Manifest path relative to the lockfile directory
    pub manifest: &'a Path,
}

/// What an ecosystem contributes to artifact regeneration
pub trait ArtifactStrategy: Send + Sync {
    /// Name of the owning manager
    fn manager(&self) -> &'static str;

    /// Lockfile names, primary first
    ///
    /// Only the primary is used to locate the lockfile directory.
    fn lockfile_names(&self) -> &'static [&'static str];

    /// Whether enclosing directories may hold the lockfile
    fn search_ancestors(&self) -> bool {
        true
    }

    /// Tool needed to run the commands
    fn tool(&self) -> ToolImage;

    /// Commands regenerating the lockfile, run from the lockfile directory
    fn commands(&self, ctx: &CommandContext<'_>) -> Vec<ToolCommand>;
}

/// Runs artifact updates against one repository checkout
pub struct ArtifactEngine {
    fs: Arc<dyn FileSystem>,
    vcs: Arc<dyn Vcs>,
    executor: ToolExecutor,
}

impl ArtifactEngine {
    /// Create an engine over the local checkout named in the admin configuration
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            fs: Arc::new(LocalFs::new(&config.local_dir)),
            vcs: Arc::new(GitCli::new(&config.local_dir)),
            executor: ToolExecutor::new(config),
        }
    }

    /// Create an engine from explicit collaborators
    pub fn with_collaborators(
        fs: Arc<dyn FileSystem>,
        vcs: Arc<dyn Vcs>,
        executor: ToolExecutor,
    ) -> Self {
        Self { fs, vcs, executor }
    }

    /// Regenerate the lockfiles for one manifest update
    pub async fn update_artifacts(
        &self,
        strategy: &dyn ArtifactStrategy,
        config: &UpdateArtifactsConfig,
    ) -> ArtifactOutcome {
        let manifest = config.package_file_name.as_path();
        let maintenance = config.update_type.is_lockfile_maintenance();

        if !maintenance && config.updated_deps.is_empty() {
            tracing::debug!("{}: no updated dependencies, nothing to do", manifest.display());
            return ArtifactOutcome::NoOp;
        }

        let Some(primary) = strategy.lockfile_names().first() else {
            return ArtifactOutcome::NoOp;
        };
        let sibling = manifest
            .parent()
            .unwrap_or(Path::new(""))
            .join(primary);

        let lockfile = match find_lockfile(
            self.fs.as_ref(),
            manifest,
            primary,
            strategy.search_ancestors(),
        )
        .await
        {
            Ok(Some(lockfile)) => lockfile,
            Ok(None) if maintenance => {
                tracing::debug!("no {} found, generating {}", primary, sibling.display());
                sibling
            }
            Ok(None) => {
                tracing::debug!("no {} found for {}", primary, manifest.display());
                return ArtifactOutcome::NoOp;
            }
            Err(e) => return failed(strategy, sibling, ArtifactError::from(e)),
        };

        match self.regenerate(strategy, config, &lockfile).await {
            Ok(lockfiles) if lockfiles.is_empty() => {
                tracing::debug!("{} is unchanged", lockfile.display());
                ArtifactOutcome::NoOp
            }
            Ok(lockfiles) => {
                tracing::info!(
                    "{}: updated {} lockfile(s) for {}",
                    strategy.manager(),
                    lockfiles.len(),
                    manifest.display()
                );
                ArtifactOutcome::Updated { lockfiles }
            }
            Err(e) => failed(strategy, lockfile, e),
        }
    }

    async fn regenerate(
        &self,
        strategy: &dyn ArtifactStrategy,
        config: &UpdateArtifactsConfig,
        lockfile: &Path,
    ) -> Result<Vec<LockfileUpdate>, ArtifactError> {
        let manifest = config.package_file_name.as_path();
        let lock_dir = lockfile.parent().unwrap_or(Path::new(""));

        let mut baselines: Vec<(PathBuf, Option<String>)> = Vec::new();
        for name in strategy.lockfile_names() {
            let path = lock_dir.join(name);
            let committed = self.vcs.get_file(&path).await;
            baselines.push((path, committed));
        }

        self.fs
            .output_file(manifest, &config.new_package_file_content)
            .await?;

        let relative_manifest = manifest.strip_prefix(lock_dir).unwrap_or(manifest);
        let commands = strategy.commands(&CommandContext {
            config,
            manifest: relative_manifest,
        });
        self.executor
            .exec(&strategy.tool(), &commands, lock_dir)
            .await?;

        let mut updates = Vec::new();
        for (index, (path, committed)) in baselines.into_iter().enumerate() {
            let contents = match self.fs.read_file(&path).await {
                Ok(contents) => contents,
                // Secondary lockfiles the tool did not produce are fine
                Err(e) if index > 0 && e.is_not_found() => {
                    tracing::debug!("{} not present after update", path.display());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if committed.as_deref() == Some(contents.as_str()) {
                continue;
            }
            updates.push(LockfileUpdate { path, contents });
        }

        Ok(updates)
    }
}

fn failed(strategy: &dyn ArtifactStrategy, lockfile: PathBuf, error: ArtifactError) -> ArtifactOutcome {
    tracing::warn!(
        "{}: failed to update {}: {}",
        strategy.manager(),
        lockfile.display(),
        error
    );
    ArtifactOutcome::failed(lockfile, error.diagnostic())
}
