//! PyPI JSON API datasource
//!
//! Fetches package version information from PyPI.
//! API endpoint: https://pypi.org/pypi/{package}/json

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// PyPI base URL
const PYPI_URL: &str = "https://pypi.org";

/// PyPI datasource
pub struct PypiDatasource {
    client: HttpClient,
}

/// PyPI package metadata response
#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
    /// Release files keyed by version
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Deserialize)]
struct PypiInfo {
    home_page: Option<String>,
    #[serde(default)]
    project_urls: Option<HashMap<String, String>>,
}

/// Release file information
#[derive(Debug, Deserialize)]
struct ReleaseFile {
    /// Upload time for the release file
    upload_time_iso_8601: Option<String>,
    #[serde(default)]
    yanked: bool,
}

impl PypiDatasource {
    /// Create a new PyPI datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the URL for a package
    fn build_url(&self, base: &str, package: &str) -> String {
        format!("{}/pypi/{}/json", base, normalize_name(package))
    }
}

/// Normalize a project name the way PyPI does (PEP 503)
fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
            }
            in_separator = true;
        } else {
            normalized.extend(ch.to_lowercase());
            in_separator = false;
        }
    }
    normalized
}

fn source_url(project_urls: &HashMap<String, String>) -> Option<String> {
    ["Source", "Source Code", "Repository", "Code"]
        .iter()
        .find_map(|key| project_urls.get(*key).cloned())
}

#[async_trait]
impl Datasource for PypiDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Pypi
    }

    fn default_registry_url(&self) -> &'static str {
        PYPI_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let url = self.build_url(request.registry_url_or(PYPI_URL), &request.package_name);
        let ctx = RequestContext::new(request, self.id());
        let Some(response) = self.client.get_json::<PypiResponse>(&url, &ctx).await? else {
            return Ok(None);
        };

        let releases = response
            .releases
            .into_iter()
            .map(|(version, files)| {
                // Get the earliest upload time from release files
                let earliest = files
                    .iter()
                    .filter_map(|f| f.upload_time_iso_8601.as_deref())
                    .filter_map(|t| t.parse::<DateTime<Utc>>().ok())
                    .min();
                let yanked = !files.is_empty() && files.iter().all(|f| f.yanked);

                let release = ReleaseRecord::new(version).with_deprecated(yanked);
                match earliest {
                    Some(released_at) => release.with_timestamp(released_at),
                    None => release,
                }
            })
            .collect();

        let project_urls = response.info.project_urls.unwrap_or_default();
        Ok(Some(
            ReleaseResult::new(releases)
                .with_homepage(response.info.home_page)
                .with_source_url(source_url(&project_urls)),
        ))
    }
}
