//! Version ordering
//!
//! Datasources return releases in whatever order the upstream registry uses.
//! This module normalizes and compares version strings per scheme so callers
//! can sort them and pick the newest stable release.

use crate::domain::{DatasourceId, ReleaseRecord};
use semver::Version;
use std::cmp::Ordering;

/// Pre-release markers recognised by the loose scheme
const PRERELEASE_MARKERS: &[&str] = &[
    "alpha", "beta", "rc", "pre", "preview", "dev", "canary", "nightly", "snapshot", "milestone",
];

/// Version scheme used to order a datasource's releases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Versioning {
    /// Semantic versioning; invalid strings fall back to loose ordering
    Semver,
    /// Dot/dash separated numeric components, optional `v` prefix
    Loose,
}

impl Versioning {
    /// Default scheme for a datasource
    pub fn for_datasource(datasource: DatasourceId) -> Self {
        match datasource {
            DatasourceId::Crate
            | DatasourceId::Npm
            | DatasourceId::Packagist
            | DatasourceId::Dart
            | DatasourceId::Go => Versioning::Semver,
            _ => Versioning::Loose,
        }
    }

    /// Returns true if the string parses under this scheme
    pub fn is_valid(&self, version: &str) -> bool {
        match self {
            Versioning::Semver => parse_semver(version).is_some(),
            Versioning::Loose => !numeric_parts(version).is_empty(),
        }
    }

    /// Returns true if the version is not a pre-release
    pub fn is_stable(&self, version: &str) -> bool {
        match self {
            Versioning::Semver => match parse_semver(version) {
                Some(v) => v.pre.is_empty(),
                None => !is_prerelease_version(version),
            },
            Versioning::Loose => !is_prerelease_version(version),
        }
    }

    /// Compare two version strings
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Versioning::Semver => match (parse_semver(a), parse_semver(b)) {
                (Some(va), Some(vb)) => va.cmp(&vb),
                _ => compare_versions(a, b),
            },
            Versioning::Loose => compare_versions(a, b),
        }
    }

    /// Sort releases ascending by version
    pub fn sort_releases(&self, releases: &mut [ReleaseRecord]) {
        releases.sort_by(|a, b| self.compare(&a.version, &b.version));
    }

    /// Newest stable, non-deprecated release
    pub fn latest_stable<'a>(&self, releases: &'a [ReleaseRecord]) -> Option<&'a ReleaseRecord> {
        releases
            .iter()
            .filter(|r| !r.deprecated() && self.is_stable(&r.version))
            .max_by(|a, b| self.compare(&a.version, &b.version))
    }
}

fn parse_semver(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

fn numeric_parts(version: &str) -> Vec<u64> {
    // Remove leading 'v' if present
    let s = version.strip_prefix('v').unwrap_or(version);
    // Split by . and - and take only the numeric parts
    s.split(['.', '-', '+']).filter_map(|p| p.parse().ok()).collect()
}

/// Compare two version strings using semver-like rules
///
/// Numeric components are compared in order; when all shared components are
/// equal, a release sorts after its pre-releases and otherwise the longer
/// version is greater.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a = numeric_parts(a);
    let parts_b = numeric_parts(b);

    // Compare each part
    for (pa, pb) in parts_a.iter().zip(parts_b.iter()) {
        match pa.cmp(pb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    match (is_prerelease_version(a), is_prerelease_version(b)) {
        (true, false) if parts_a.len() <= parts_b.len() => return Ordering::Less,
        (false, true) if parts_b.len() <= parts_a.len() => return Ordering::Greater,
        _ => {}
    }

    // If all common parts are equal, the longer version is greater
    parts_a.len().cmp(&parts_b.len())
}

/// Returns true if the version string carries a pre-release marker
pub fn is_prerelease_version(version: &str) -> bool {
    let lower = version.to_ascii_lowercase();
    lower
        .split(|c: char| !c.is_ascii_alphabetic())
        .any(|word| PRERELEASE_MARKERS.contains(&word))
}
