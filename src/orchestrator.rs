//! Command orchestration
//!
//! This module provides:
//! - Release lookups through the datasource registry, with host-rule credentials
//! - Manifest extraction through the manager registry
//! - Artifact updates for a manifest edited in the repository checkout

use crate::artifacts::ArtifactEngine;
use crate::cli::{CliArgs, Command};
use crate::config::AdminConfig;
use crate::datasource::DatasourceRegistry;
use crate::domain::{
    ArtifactOutcome, LookupRequest, ManagerExtractResult, ReleaseResult, UpdateArtifactsConfig,
};
use crate::error::{AppError, FsError};
use crate::fs::{FileSystem, LocalFs};
use crate::host_rules::{HostRuleQuery, HostRules};
use crate::manager::{ManagerId, ManagerRegistry};
use crate::progress::Progress;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of one command
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Lookup {
        datasource: String,
        package: String,
        result: Option<ReleaseResult>,
    },
    Extract {
        file: PathBuf,
        manager: ManagerId,
        result: Option<ManagerExtractResult>,
    },
    Artifacts {
        manifest: PathBuf,
        outcome: ArtifactOutcome,
    },
}

impl Report {
    /// Whether the command completed but its work failed
    pub fn is_failure(&self) -> bool {
        matches!(self, Report::Artifacts { outcome, .. } if outcome.is_failed())
    }
}

/// Runs one CLI command against the admin configuration
pub struct Orchestrator {
    config: AdminConfig,
    show_progress: bool,
}

impl Orchestrator {
    /// Create an orchestrator from parsed CLI arguments
    pub fn new(args: &CliArgs) -> Result<Self, AppError> {
        Ok(Self {
            config: args.admin_config()?,
            show_progress: !args.quiet && !args.json,
        })
    }

    /// Create an orchestrator from an explicit configuration
    pub fn with_config(config: AdminConfig) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    /// Run a command
    pub async fn run(&self, command: &Command) -> Result<Report, AppError> {
        match command {
            Command::Lookup {
                datasource,
                package,
                registry_url,
                constraints,
            } => {
                self.lookup(datasource, package, registry_url.as_deref(), constraints)
                    .await
            }
            Command::Extract { file } => self.extract(file).await,
            Command::Artifacts {
                manifest,
                deps,
                maintenance,
            } => self.artifacts(manifest, deps, *maintenance).await,
        }
    }

    async fn lookup(
        &self,
        datasource: &str,
        package: &str,
        registry_url: Option<&str>,
        constraints: &[(String, String)],
    ) -> Result<Report, AppError> {
        let registry = DatasourceRegistry::global()?;
        let capability = registry.get(datasource)?;

        let mut request = LookupRequest::new(datasource, package);
        if let Some(url) = registry_url {
            request = request.with_registry_url(url);
        }
        for (key, value) in constraints {
            request = request.with_constraint(key, value);
        }
        let host = request
            .registry_url_or(capability.default_registry_url())
            .to_string();
        let query = HostRuleQuery::typed(capability.id().host_type(), &host);
        if let Some(credentials) = self.config.host_rules.find(&query) {
            tracing::debug!("using credentials for {}: {:?}", host, credentials);
            request = request.with_credentials(credentials);
        }

        let mut progress = Progress::new(self.show_progress);
        progress.spinner(&format!("Looking up {} in {}...", package, datasource));
        let result = registry.get_releases(&request).await;
        progress.finish_and_clear();

        Ok(Report::Lookup {
            datasource: datasource.to_string(),
            package: package.to_string(),
            result: result?,
        })
    }

    async fn extract(&self, file: &Path) -> Result<Report, AppError> {
        let managers = self.managers();
        let manager = managers
            .for_file(file)
            .ok_or_else(|| AppError::UnsupportedFile {
                path: file.to_path_buf(),
            })?;

        let content = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| FsError::read_error(file, e))?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        Ok(Report::Extract {
            file: file.to_path_buf(),
            manager: manager.id(),
            result: manager.extract_package_file(Some(&content), &file_name),
        })
    }

    async fn artifacts(
        &self,
        manifest: &Path,
        dep_names: &[String],
        maintenance: bool,
    ) -> Result<Report, AppError> {
        let config = self.config.clone().validate()?;
        let manifest = self.relative_manifest(&config, manifest)?;

        let managers = self.managers();
        let manager = managers
            .for_file(&manifest)
            .ok_or_else(|| AppError::UnsupportedFile {
                path: manifest.clone(),
            })?;
        let strategy = manager.artifacts().ok_or_else(|| AppError::NoArtifacts {
            manager: manager.id().to_string(),
        })?;

        let content = LocalFs::new(&config.local_dir)
            .read_file(&manifest)
            .await?;

        let update = if maintenance {
            UpdateArtifactsConfig::lockfile_maintenance(manifest.clone(), content)
        } else {
            let file_name = manifest
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default();
            let mut deps = manager
                .extract_package_file(Some(&content), &file_name)
                .map(|result| result.deps)
                .unwrap_or_default();
            if !dep_names.is_empty() {
                deps.retain(|dep| {
                    dep_names
                        .iter()
                        .any(|name| name == &dep.dep_name || name == dep.package_name())
                });
                for name in dep_names {
                    if !deps
                        .iter()
                        .any(|d| &d.dep_name == name || d.package_name() == name)
                    {
                        tracing::warn!("{} is not a dependency of {}", name, manifest.display());
                    }
                }
            }
            UpdateArtifactsConfig::new(manifest.clone(), deps, content)
        };

        let mut progress = Progress::new(self.show_progress);
        progress.spinner(&format!("Updating artifacts for {}...", manifest.display()));
        let outcome = ArtifactEngine::new(&config)
            .update_artifacts(strategy, &update)
            .await;
        progress.finish_and_clear();

        Ok(Report::Artifacts { manifest, outcome })
    }

    fn managers(&self) -> ManagerRegistry {
        let host_rules: Arc<dyn HostRules> = Arc::new(self.config.host_rules.clone());
        ManagerRegistry::new(host_rules)
    }

    /// Manifest path relative to the checkout
    fn relative_manifest(
        &self,
        config: &AdminConfig,
        manifest: &Path,
    ) -> Result<PathBuf, AppError> {
        if manifest.is_relative() {
            return Ok(manifest.to_path_buf());
        }
        [&self.config.local_dir, &config.local_dir]
            .into_iter()
            .find_map(|root| manifest.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                FsError::OutsideRoot {
                    path: manifest.to_path_buf(),
                }
                .into()
            })
    }
}
