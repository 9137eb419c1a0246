//! GitHub tags and releases datasources
//!
//! API endpoints:
//! - Tags: https://api.github.com/repos/{owner}/{repo}/tags
//! - Releases: https://api.github.com/repos/{owner}/{repo}/releases
//!
//! GitHub Enterprise hosts are addressed through `{host}/api/v3`.

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// Public GitHub web URL
const GITHUB_URL: &str = "https://github.com";

/// Public GitHub API URL
const GITHUB_API_URL: &str = "https://api.github.com";

/// Items requested per page
const PER_PAGE: u32 = 100;

/// Upper bound on pages followed per lookup
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct GithubTag {
    name: String,
    commit: Option<GithubCommit>,
}

#[derive(Debug, Deserialize)]
struct GithubCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    published_at: Option<String>,
    #[serde(default)]
    draft: bool,
}

/// Resolve the API base for a registry URL
fn api_base(registry_url: &str) -> String {
    if registry_url == GITHUB_URL || registry_url == GITHUB_API_URL {
        GITHUB_API_URL.to_string()
    } else if registry_url.ends_with("/api/v3") {
        registry_url.to_string()
    } else {
        format!("{}/api/v3", registry_url)
    }
}

fn validate_repo(package: &str) -> Result<(), DatasourceError> {
    match package.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok(())
        }
        _ => Err(DatasourceError::invalid_package_name(
            package,
            "expected format 'owner/repo'",
        )),
    }
}

fn repo_url(registry_url: &str, package: &str) -> String {
    if registry_url == GITHUB_API_URL {
        format!("{}/{}", GITHUB_URL, package)
    } else {
        format!("{}/{}", registry_url.trim_end_matches("/api/v3"), package)
    }
}

/// Tags of a GitHub repository
pub struct GithubTagsDatasource {
    client: HttpClient,
}

impl GithubTagsDatasource {
    /// Create a new GitHub tags datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Datasource for GithubTagsDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::GithubTags
    }

    fn default_registry_url(&self) -> &'static str {
        GITHUB_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        validate_repo(&request.package_name)?;
        let registry_url = request.registry_url_or(GITHUB_URL);
        let url = format!(
            "{}/repos/{}/tags?per_page={}",
            api_base(registry_url),
            request.package_name,
            PER_PAGE
        );
        let ctx = RequestContext::new(request, self.id());
        let Some(tags) = self
            .client
            .get_json_pages::<GithubTag>(&url, &ctx, MAX_PAGES)
            .await?
        else {
            return Ok(None);
        };

        let releases = tags
            .into_iter()
            .map(|tag| {
                let release = ReleaseRecord::new(tag.name);
                match tag.commit {
                    Some(commit) => release.with_digest(commit.sha),
                    None => release,
                }
            })
            .collect();

        Ok(Some(
            ReleaseResult::new(releases)
                .with_source_url(Some(repo_url(registry_url, &request.package_name))),
        ))
    }
}

/// Releases of a GitHub repository
pub struct GithubReleasesDatasource {
    client: HttpClient,
}

impl GithubReleasesDatasource {
    /// Create a new GitHub releases datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Datasource for GithubReleasesDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::GithubReleases
    }

    fn default_registry_url(&self) -> &'static str {
        GITHUB_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        validate_repo(&request.package_name)?;
        let registry_url = request.registry_url_or(GITHUB_URL);
        let url = format!(
            "{}/repos/{}/releases?per_page={}",
            api_base(registry_url),
            request.package_name,
            PER_PAGE
        );
        let ctx = RequestContext::new(request, self.id());
        let Some(items) = self
            .client
            .get_json_pages::<GithubRelease>(&url, &ctx, MAX_PAGES)
            .await?
        else {
            return Ok(None);
        };

        let releases = items
            .into_iter()
            .filter(|r| !r.draft)
            .map(|r| ReleaseRecord::new(r.tag_name).with_timestamp_str(r.published_at.as_deref()))
            .collect();

        Ok(Some(
            ReleaseResult::new(releases)
                .with_source_url(Some(repo_url(registry_url, &request.package_name))),
        ))
    }
}
