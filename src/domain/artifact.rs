//! Artifact update configuration and outcome types

use super::DependencyDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What kind of update drives the artifact regeneration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateType {
    /// One or more dependencies changed in the manifest
    #[default]
    Ordinary,
    /// Regenerate the lockfile from the manifest as-is, refreshing transitive pins
    LockfileMaintenance,
}

impl UpdateType {
    /// Returns true for lockfile maintenance
    pub fn is_lockfile_maintenance(&self) -> bool {
        matches!(self, UpdateType::LockfileMaintenance)
    }
}

/// Input for one artifact update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateArtifactsConfig {
    /// Manifest path relative to the repository root
    pub package_file_name: PathBuf,
    /// Dependencies changed in the new manifest content
    pub updated_deps: Vec<DependencyDescriptor>,
    /// Rewritten manifest text
    pub new_package_file_content: String,
    /// Ordinary update or lockfile maintenance
    pub update_type: UpdateType,
}

impl UpdateArtifactsConfig {
    /// Creates an ordinary update
    pub fn new(
        package_file_name: impl Into<PathBuf>,
        updated_deps: Vec<DependencyDescriptor>,
        new_package_file_content: impl Into<String>,
    ) -> Self {
        Self {
            package_file_name: package_file_name.into(),
            updated_deps,
            new_package_file_content: new_package_file_content.into(),
            update_type: UpdateType::Ordinary,
        }
    }

    /// Creates a lockfile maintenance update
    pub fn lockfile_maintenance(
        package_file_name: impl Into<PathBuf>,
        new_package_file_content: impl Into<String>,
    ) -> Self {
        Self {
            package_file_name: package_file_name.into(),
            updated_deps: Vec::new(),
            new_package_file_content: new_package_file_content.into(),
            update_type: UpdateType::LockfileMaintenance,
        }
    }
}

/// New content for one lockfile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockfileUpdate {
    /// Lockfile path relative to the repository root
    pub path: PathBuf,
    /// Complete new content
    pub contents: String,
}

/// Why an artifact update failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFailure {
    /// Lockfile the update was targeting
    pub lockfile: PathBuf,
    /// Captured tool output or error message
    pub diagnostic: String,
}

/// Result of one artifact update attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    /// Nothing to regenerate, or the regenerated content is unchanged
    NoOp,
    /// One entry per lockfile whose content changed
    Updated { lockfiles: Vec<LockfileUpdate> },
    /// Regeneration failed; the batch continues
    Failed(ArtifactFailure),
}

impl ArtifactOutcome {
    /// Creates a Failed outcome
    pub fn failed(lockfile: impl Into<PathBuf>, diagnostic: impl Into<String>) -> Self {
        ArtifactOutcome::Failed(ArtifactFailure {
            lockfile: lockfile.into(),
            diagnostic: diagnostic.into(),
        })
    }

    /// Returns true for NoOp
    pub fn is_no_op(&self) -> bool {
        matches!(self, ArtifactOutcome::NoOp)
    }

    /// Returns true for Updated
    pub fn is_updated(&self) -> bool {
        matches!(self, ArtifactOutcome::Updated { .. })
    }

    /// Returns true for Failed
    pub fn is_failed(&self) -> bool {
        matches!(self, ArtifactOutcome::Failed(_))
    }

    /// Updated lockfiles, empty unless Updated
    pub fn lockfiles(&self) -> &[LockfileUpdate] {
        match self {
            ArtifactOutcome::Updated { lockfiles } => lockfiles,
            _ => &[],
        }
    }
}

impl fmt::Display for ArtifactOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactOutcome::NoOp => write!(f, "no changes"),
            ArtifactOutcome::Updated { lockfiles } => {
                let paths: Vec<String> = lockfiles
                    .iter()
                    .map(|l| l.path.display().to_string())
                    .collect();
                write!(f, "updated {}", paths.join(", "))
            }
            ArtifactOutcome::Failed(failure) => {
                write!(f, "failed to update {}", failure.lockfile.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DatasourceId;

    #[test]
    fn test_update_type_default_is_ordinary() {
        assert_eq!(UpdateType::default(), UpdateType::Ordinary);
        assert!(!UpdateType::Ordinary.is_lockfile_maintenance());
        assert!(UpdateType::LockfileMaintenance.is_lockfile_maintenance());
    }

    #[test]
    fn test_lockfile_maintenance_config_has_no_deps() {
        let cfg = UpdateArtifactsConfig::lockfile_maintenance("Cargo.toml", "{}");
        assert!(cfg.updated_deps.is_empty());
        assert!(cfg.update_type.is_lockfile_maintenance());
    }

    #[test]
    fn test_ordinary_config() {
        let dep = DependencyDescriptor::new("dep1", "1.0", DatasourceId::Crate);
        let cfg = UpdateArtifactsConfig::new("crates/one/Cargo.toml", vec![dep], "{}");
        assert_eq!(cfg.package_file_name, PathBuf::from("crates/one/Cargo.toml"));
        assert_eq!(cfg.update_type, UpdateType::Ordinary);
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(ArtifactOutcome::NoOp.is_no_op());
        assert!(ArtifactOutcome::failed("Cargo.lock", "boom").is_failed());

        let updated = ArtifactOutcome::Updated {
            lockfiles: vec![LockfileUpdate {
                path: PathBuf::from("Cargo.lock"),
                contents: "New Cargo.lock".to_string(),
            }],
        };
        assert!(updated.is_updated());
        assert_eq!(updated.lockfiles().len(), 1);
        assert!(ArtifactOutcome::NoOp.lockfiles().is_empty());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(format!("{}", ArtifactOutcome::NoOp), "no changes");
        assert_eq!(
            format!("{}", ArtifactOutcome::failed("Cargo.lock", "boom")),
            "failed to update Cargo.lock"
        );
    }

    #[test]
    fn test_outcome_serde_tag() {
        let json = serde_json::to_string(&ArtifactOutcome::NoOp).unwrap();
        assert_eq!(json, r#"{"outcome":"no_op"}"#);

        let json = serde_json::to_string(&ArtifactOutcome::failed("Cargo.lock", "boom")).unwrap();
        assert!(json.contains(r#""outcome":"failed""#));
        assert!(json.contains(r#""diagnostic":"boom""#));
    }
}
