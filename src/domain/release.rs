//! Release information returned by datasources

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One discoverable version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// The version string (e.g., "1.2.3")
    pub version: String,
    /// When this version was released
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_timestamp: Option<DateTime<Utc>>,
    /// Whether the registry marks this version deprecated or yanked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deprecated: Option<bool>,
    /// Source repository URL recorded for this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Registry-specific digest or checksum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ReleaseRecord {
    /// Create a release with only a version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_timestamp: None,
            is_deprecated: None,
            source_url: None,
            digest: None,
        }
    }

    /// Sets the release timestamp (builder pattern)
    pub fn with_timestamp(mut self, released_at: DateTime<Utc>) -> Self {
        self.release_timestamp = Some(released_at);
        self
    }

    /// Parses and sets an RFC 3339 timestamp, ignoring unparseable values
    pub fn with_timestamp_str(mut self, released_at: Option<&str>) -> Self {
        self.release_timestamp = released_at.and_then(|s| s.parse::<DateTime<Utc>>().ok());
        self
    }

    /// Sets the deprecated flag (builder pattern)
    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.is_deprecated = Some(deprecated);
        self
    }

    /// Sets the source URL (builder pattern)
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Sets the digest (builder pattern)
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Returns true if the registry flagged this release deprecated
    pub fn deprecated(&self) -> bool {
        self.is_deprecated.unwrap_or(false)
    }
}

/// Result of a datasource lookup
///
/// Release order carries no meaning; callers sort with [`crate::versioning`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReleaseResult {
    /// Every release the datasource knows about
    pub releases: Vec<ReleaseRecord>,
    /// Package homepage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Package source repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Named tags such as npm's dist-tags (`latest` → `4.17.21`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl ReleaseResult {
    /// Create a result from a list of releases
    pub fn new(releases: Vec<ReleaseRecord>) -> Self {
        Self {
            releases,
            ..Default::default()
        }
    }

    /// Sets the homepage (builder pattern)
    pub fn with_homepage(mut self, homepage: Option<String>) -> Self {
        self.homepage = homepage.filter(|h| !h.is_empty());
        self
    }

    /// Sets the source URL (builder pattern)
    pub fn with_source_url(mut self, source_url: Option<String>) -> Self {
        self.source_url = source_url.filter(|s| !s.is_empty());
        self
    }

    /// Adds a named tag (builder pattern)
    pub fn with_tag(mut self, tag: impl Into<String>, version: impl Into<String>) -> Self {
        self.tags.insert(tag.into(), version.into());
        self
    }

    /// Returns the release with the given version string
    pub fn find(&self, version: &str) -> Option<&ReleaseRecord> {
        self.releases.iter().find(|r| r.version == version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_release_record_builders() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let release = ReleaseRecord::new("1.2.3")
            .with_timestamp(date)
            .with_deprecated(true)
            .with_source_url("https://github.com/serde-rs/serde")
            .with_digest("sha256:abc");

        assert_eq!(release.version, "1.2.3");
        assert_eq!(release.release_timestamp, Some(date));
        assert!(release.deprecated());
        assert_eq!(release.digest.as_deref(), Some("sha256:abc"));
    }

    #[test]
    fn test_with_timestamp_str() {
        let release = ReleaseRecord::new("1.0.0").with_timestamp_str(Some("2024-01-15T10:00:00Z"));
        assert_eq!(
            release.release_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
        );

        let release = ReleaseRecord::new("1.0.0").with_timestamp_str(Some("yesterday"));
        assert!(release.release_timestamp.is_none());
    }

    #[test]
    fn test_deprecated_defaults_to_false() {
        assert!(!ReleaseRecord::new("1.0.0").deprecated());
    }

    #[test]
    fn test_release_result_find_and_tags() {
        let result = ReleaseResult::new(vec![ReleaseRecord::new("1.0.0"), ReleaseRecord::new("2.0.0")])
            .with_tag("latest", "2.0.0")
            .with_homepage(Some(String::new()));

        assert!(result.find("2.0.0").is_some());
        assert!(result.find("3.0.0").is_none());
        assert_eq!(result.tags.get("latest").map(String::as_str), Some("2.0.0"));
        assert!(result.homepage.is_none());
    }

    #[test]
    fn test_serde_release_result() {
        let result = ReleaseResult::new(vec![ReleaseRecord::new("1.0.0")]);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"releases":[{"version":"1.0.0"}]}"#);

        let parsed: ReleaseResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
