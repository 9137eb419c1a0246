//! Datasource identifiers

use crate::error::DatasourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key of a registered datasource
///
/// The set is closed: every variant has exactly one capability in the
/// registry, and strings that match no variant are rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasourceId {
    /// crates.io
    Crate,
    /// npm registry
    Npm,
    /// PyPI
    Pypi,
    /// Go module proxy
    Go,
    /// RubyGems
    Rubygems,
    /// Packagist
    Packagist,
    /// Maven Central
    Maven,
    /// NuGet
    Nuget,
    /// pub.dev
    Dart,
    /// Tags of a GitHub repository
    GithubTags,
    /// Releases of a GitHub repository
    GithubReleases,
    /// Tags of a GitLab project
    GitlabTags,
    /// Docker Hub image tags
    Docker,
}

impl DatasourceId {
    /// Every registered datasource, in registration order
    pub const ALL: [DatasourceId; 13] = [
        DatasourceId::Crate,
        DatasourceId::Npm,
        DatasourceId::Pypi,
        DatasourceId::Go,
        DatasourceId::Rubygems,
        DatasourceId::Packagist,
        DatasourceId::Maven,
        DatasourceId::Nuget,
        DatasourceId::Dart,
        DatasourceId::GithubTags,
        DatasourceId::GithubReleases,
        DatasourceId::GitlabTags,
        DatasourceId::Docker,
    ];

    /// Returns the stable string key
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasourceId::Crate => "crate",
            DatasourceId::Npm => "npm",
            DatasourceId::Pypi => "pypi",
            DatasourceId::Go => "go",
            DatasourceId::Rubygems => "rubygems",
            DatasourceId::Packagist => "packagist",
            DatasourceId::Maven => "maven",
            DatasourceId::Nuget => "nuget",
            DatasourceId::Dart => "dart",
            DatasourceId::GithubTags => "github-tags",
            DatasourceId::GithubReleases => "github-releases",
            DatasourceId::GitlabTags => "gitlab-tags",
            DatasourceId::Docker => "docker",
        }
    }

    /// Host type used when matching host rules
    pub fn host_type(&self) -> &'static str {
        match self {
            DatasourceId::GithubTags | DatasourceId::GithubReleases => "github",
            DatasourceId::GitlabTags => "gitlab",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for DatasourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasourceId {
    type Err = DatasourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasourceId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| DatasourceError::unknown_datasource(s))
    }
}
