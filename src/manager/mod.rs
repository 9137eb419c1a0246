//! Package managers
//!
//! A manager knows one manifest format: which files it owns, how to extract
//! dependency descriptors from them, and optionally how to regenerate the
//! lockfile that belongs to them.

pub mod cargo;
pub mod gomod;
pub mod pre_commit;

use crate::artifacts::ArtifactStrategy;
use crate::domain::ManagerExtractResult;
use crate::error::ConfigError;
use crate::host_rules::HostRules;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Key of a registered manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagerId {
    Cargo,
    Gomod,
    PreCommit,
}

impl ManagerId {
    /// Every registered manager
    pub const ALL: [ManagerId; 3] = [ManagerId::Cargo, ManagerId::Gomod, ManagerId::PreCommit];

    /// Returns the manager name
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerId::Cargo => "cargo",
            ManagerId::Gomod => "gomod",
            ManagerId::PreCommit => "pre-commit",
        }
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ManagerId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ManagerId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownManager {
                name: s.to_string(),
            })
    }
}

/// Extraction contract shared by all managers
///
/// Extraction never fails: absent, empty or unparsable content and files
/// without usable entries all yield `None`.
pub trait Manager: Send + Sync {
    /// Manager key
    fn id(&self) -> ManagerId;

    /// Whether the manager owns a file with this name
    fn matches_file(&self, file_name: &str) -> bool;

    /// Extract dependency descriptors from manifest content
    fn extract_package_file(
        &self,
        content: Option<&str>,
        file_name: &str,
    ) -> Option<ManagerExtractResult>;

    /// Lockfile regeneration, if the ecosystem has a lockfile
    fn artifacts(&self) -> Option<&dyn ArtifactStrategy> {
        None
    }
}

fn create_manager(id: ManagerId, host_rules: &Arc<dyn HostRules>) -> Arc<dyn Manager> {
    match id {
        ManagerId::Cargo => Arc::new(cargo::CargoManager::new()),
        ManagerId::Gomod => Arc::new(gomod::GomodManager::new()),
        ManagerId::PreCommit => Arc::new(pre_commit::PreCommitManager::new(Arc::clone(host_rules))),
    }
}

/// All managers, built once
pub struct ManagerRegistry {
    managers: HashMap<ManagerId, Arc<dyn Manager>>,
}

impl ManagerRegistry {
    /// Build every manager, sharing one credentials source
    pub fn new(host_rules: Arc<dyn HostRules>) -> Self {
        let managers = ManagerId::ALL
            .into_iter()
            .map(|id| (id, create_manager(id, &host_rules)))
            .collect();
        Self { managers }
    }

    /// Manager by id
    pub fn get(&self, id: ManagerId) -> Option<&Arc<dyn Manager>> {
        self.managers.get(&id)
    }

    /// First manager owning the file at `path`
    pub fn for_file(&self, path: &Path) -> Option<&Arc<dyn Manager>> {
        let file_name = path.file_name()?.to_str()?;
        ManagerId::ALL
            .iter()
            .filter_map(|id| self.managers.get(id))
            .find(|manager| manager.matches_file(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_rules::HostRuleSet;

    fn registry() -> ManagerRegistry {
        ManagerRegistry::new(Arc::new(HostRuleSet::default()))
    }

    #[test]
    fn test_manager_id_round_trip() {
        for id in ManagerId::ALL {
            assert_eq!(id.as_str().parse::<ManagerId>().unwrap(), id);
        }
        assert!("npm".parse::<ManagerId>().is_err());
    }

    #[test]
    fn test_registry_has_every_manager() {
        let registry = registry();
        for id in ManagerId::ALL {
            assert_eq!(registry.get(id).map(|m| m.id()), Some(id));
        }
    }

    #[test]
    fn test_for_file() {
        let registry = registry();
        let id = |p: &str| registry.for_file(Path::new(p)).map(|m| m.id());

        assert_eq!(id("crates/one/Cargo.toml"), Some(ManagerId::Cargo));
        assert_eq!(id("go.mod"), Some(ManagerId::Gomod));
        assert_eq!(id(".pre-commit-config.yaml"), Some(ManagerId::PreCommit));
        assert_eq!(id("package.json"), None);
    }

    #[test]
    fn test_artifact_support() {
        let registry = registry();
        assert!(registry.get(ManagerId::Cargo).unwrap().artifacts().is_some());
        assert!(registry.get(ManagerId::Gomod).unwrap().artifacts().is_some());
        assert!(registry.get(ManagerId::PreCommit).unwrap().artifacts().is_none());
    }
}
