//! Dependency information structures

use super::DatasourceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a dependency is used by the project declaring it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DepType {
    /// Regular runtime dependency
    #[default]
    Normal,
    /// Test/development-only dependency
    Dev,
    /// Build-script dependency
    Build,
    /// A whole repository pinned by ref (pre-commit hooks)
    Repository,
}

impl DepType {
    /// Returns the label used in output
    pub fn label(&self) -> &'static str {
        match self {
            DepType::Normal => "normal",
            DepType::Dev => "dev",
            DepType::Build => "build",
            DepType::Repository => "repository",
        }
    }
}

/// One dependency found in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    /// Name as written in the manifest
    pub dep_name: String,
    /// Declared version or range
    pub current_value: String,
    /// Datasource used to resolve available releases
    pub datasource: DatasourceId,
    /// Dependency classification
    pub dep_type: DepType,
    /// Name to query the datasource with, when it differs from `dep_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_name: Option<String>,
    /// Registry URLs overriding the datasource default
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registry_urls: Vec<String>,
}

impl DependencyDescriptor {
    /// Creates a new descriptor
    pub fn new(
        dep_name: impl Into<String>,
        current_value: impl Into<String>,
        datasource: DatasourceId,
    ) -> Self {
        Self {
            dep_name: dep_name.into(),
            current_value: current_value.into(),
            datasource,
            dep_type: DepType::Normal,
            lookup_name: None,
            registry_urls: Vec::new(),
        }
    }

    /// Sets the dependency type (builder pattern)
    pub fn with_dep_type(mut self, dep_type: DepType) -> Self {
        self.dep_type = dep_type;
        self
    }

    /// Sets the lookup name (builder pattern)
    pub fn with_lookup_name(mut self, lookup_name: impl Into<String>) -> Self {
        self.lookup_name = Some(lookup_name.into());
        self
    }

    /// Adds a registry URL (builder pattern)
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_urls.push(url.into());
        self
    }

    /// Name to resolve the package by: the lookup name if present, else the display name
    pub fn package_name(&self) -> &str {
        self.lookup_name.as_deref().unwrap_or(&self.dep_name)
    }

    /// Returns true if the package is known under another name upstream
    pub fn is_renamed(&self) -> bool {
        self.lookup_name
            .as_deref()
            .is_some_and(|name| name != self.dep_name)
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dep_marker = match self.dep_type {
            DepType::Normal => String::new(),
            other => format!(" ({})", other.label()),
        };
        write!(
            f,
            "{}@{}{} [{}]",
            self.dep_name, self.current_value, dep_marker, self.datasource
        )
    }
}

/// Dependencies extracted from one package file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ManagerExtractResult {
    /// Extracted dependencies; never empty when returned from a manager
    pub deps: Vec<DependencyDescriptor>,
}

impl ManagerExtractResult {
    /// Wraps a dependency list, returning None when it is empty
    pub fn from_deps(deps: Vec<DependencyDescriptor>) -> Option<Self> {
        if deps.is_empty() {
            None
        } else {
            Some(Self { deps })
        }
    }
}
