//! Docker image tags datasource
//!
//! Docker Hub images are listed through the Hub API:
//! https://hub.docker.com/v2/repositories/{namespace}/{name}/tags
//!
//! Any other registry is queried through the distribution API:
//! {registry}/v2/{name}/tags/list

use crate::datasource::{Datasource, HttpClient, Page, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// Docker Hub API URL
const DOCKER_HUB_URL: &str = "https://hub.docker.com";

/// Hosts that alias Docker Hub
const DOCKER_HUB_HOSTS: &[&str] = &[
    "docker.io",
    "index.docker.io",
    "registry-1.docker.io",
    "hub.docker.com",
];

/// Items requested per page
const PAGE_SIZE: u32 = 100;

/// Upper bound on pages followed per lookup
const MAX_PAGES: usize = 10;

/// Docker datasource
pub struct DockerDatasource {
    client: HttpClient,
    hub_url: String,
}

#[derive(Debug, Deserialize)]
struct HubTagsPage {
    next: Option<String>,
    #[serde(default)]
    results: Vec<HubTag>,
}

#[derive(Debug, Deserialize)]
struct HubTag {
    name: String,
    last_updated: Option<String>,
    digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl DockerDatasource {
    /// Create a new Docker datasource
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            hub_url: DOCKER_HUB_URL.to_string(),
        }
    }

    /// Point Docker Hub lookups at another API base
    pub fn with_hub_url(mut self, url: impl Into<String>) -> Self {
        self.hub_url = url.into();
        self
    }

    /// Official images live under the `library` namespace
    fn hub_repository(image: &str) -> String {
        if image.contains('/') {
            image.to_string()
        } else {
            format!("library/{}", image)
        }
    }

    fn is_docker_hub(registry_url: Option<&str>) -> bool {
        let Some(url) = registry_url else {
            return true;
        };
        let host = url
            .split_once("://")
            .map_or(url, |(_, rest)| rest)
            .split('/')
            .next()
            .unwrap_or_default();
        DOCKER_HUB_HOSTS.contains(&host)
    }

    async fn hub_tags(
        &self,
        image: &str,
        ctx: &RequestContext<'_>,
    ) -> Result<Option<Vec<ReleaseRecord>>, DatasourceError> {
        let mut url = Some(format!(
            "{}/v2/repositories/{}/tags?page_size={}",
            self.hub_url.trim_end_matches('/'),
            Self::hub_repository(image),
            PAGE_SIZE
        ));
        let mut releases = Vec::new();
        let mut pages = 0;

        while let Some(current) = url.take() {
            if pages >= MAX_PAGES {
                break;
            }
            let Some(page) = self.client.get_json::<HubTagsPage>(&current, ctx).await? else {
                if pages == 0 {
                    return Ok(None);
                }
                break;
            };
            pages += 1;
            releases.extend(page.results.into_iter().map(|tag| {
                let release =
                    ReleaseRecord::new(tag.name).with_timestamp_str(tag.last_updated.as_deref());
                match tag.digest {
                    Some(digest) => release.with_digest(digest),
                    None => release,
                }
            }));
            url = page.next;
        }

        Ok(Some(releases))
    }

    async fn registry_tags(
        &self,
        base: &str,
        image: &str,
        ctx: &RequestContext<'_>,
    ) -> Result<Option<Vec<ReleaseRecord>>, DatasourceError> {
        let mut url = Some(format!("{}/v2/{}/tags/list?n={}", base, image, PAGE_SIZE));
        let mut releases = Vec::new();
        let mut pages = 0;

        while let Some(current) = url.take() {
            if pages >= MAX_PAGES {
                break;
            }
            let Some(Page { body, next }) =
                self.client.get_json_page::<TagList>(&current, ctx).await?
            else {
                if pages == 0 {
                    return Ok(None);
                }
                break;
            };
            pages += 1;
            releases.extend(body.tags.unwrap_or_default().into_iter().map(ReleaseRecord::new));
            // Distribution registries return relative next links
            url = next.map(|n| {
                if n.starts_with('/') {
                    format!("{}{}", base, n)
                } else {
                    n
                }
            });
        }

        Ok(Some(releases))
    }
}

#[async_trait]
impl Datasource for DockerDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Docker
    }

    fn default_registry_url(&self) -> &'static str {
        DOCKER_HUB_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let image = request.package_name.as_str();
        if image.is_empty() || image.contains(':') || image.contains('@') {
            return Err(DatasourceError::invalid_package_name(
                image,
                "expected an image name without tag or digest",
            ));
        }

        let ctx = RequestContext::new(request, self.id());
        let registry_url = request.registry_url.as_deref();
        let releases = if Self::is_docker_hub(registry_url) {
            self.hub_tags(image, &ctx).await?
        } else {
            self.registry_tags(request.registry_url_or(DOCKER_HUB_URL), image, &ctx)
                .await?
        };

        Ok(releases.map(ReleaseResult::new))
    }
}
