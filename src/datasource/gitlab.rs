//! GitLab tags datasource
//!
//! API endpoint: https://gitlab.com/api/v4/projects/{url-encoded path}/repository/tags

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// Public GitLab URL
const GITLAB_URL: &str = "https://gitlab.com";

/// Items requested per page
const PER_PAGE: u32 = 100;

/// Upper bound on pages followed per lookup
const MAX_PAGES: usize = 10;

/// Tags of a GitLab project
pub struct GitlabTagsDatasource {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct GitlabTag {
    name: String,
    commit: Option<GitlabCommit>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitlabCommit {
    id: Option<String>,
    created_at: Option<String>,
}

impl GitlabTagsDatasource {
    /// Create a new GitLab tags datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn build_url(base: &str, project: &str) -> String {
        format!(
            "{}/api/v4/projects/{}/repository/tags?per_page={}",
            base.trim_end_matches("/api/v4"),
            project.replace('/', "%2F"),
            PER_PAGE
        )
    }
}

#[async_trait]
impl Datasource for GitlabTagsDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::GitlabTags
    }

    fn default_registry_url(&self) -> &'static str {
        GITLAB_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        if !request.package_name.contains('/') {
            return Err(DatasourceError::invalid_package_name(
                &request.package_name,
                "expected format 'group/project'",
            ));
        }

        let base = request.registry_url_or(GITLAB_URL);
        let url = Self::build_url(base, &request.package_name);
        let ctx = RequestContext::new(request, self.id());
        let Some(tags) = self
            .client
            .get_json_pages::<GitlabTag>(&url, &ctx, MAX_PAGES)
            .await?
        else {
            return Ok(None);
        };

        let releases = tags
            .into_iter()
            .map(|tag| {
                // Annotated tags carry their own date; lightweight ones use the commit's
                let created_at = tag
                    .created_at
                    .or_else(|| tag.commit.as_ref().and_then(|c| c.created_at.clone()));
                let release = ReleaseRecord::new(tag.name).with_timestamp_str(created_at.as_deref());
                match tag.commit.and_then(|c| c.id) {
                    Some(sha) => release.with_digest(sha),
                    None => release,
                }
            })
            .collect();

        let source_url = format!(
            "{}/{}",
            base.trim_end_matches("/api/v4"),
            request.package_name
        );
        Ok(Some(ReleaseResult::new(releases).with_source_url(Some(source_url))))
    }
}
