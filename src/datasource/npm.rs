//! npm Registry datasource
//!
//! Fetches package version information from the npm registry.
//! API endpoint: https://registry.npmjs.org/{package}

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// npm registry base URL
const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// npm Registry datasource
pub struct NpmDatasource {
    client: HttpClient,
}

/// npm package metadata response
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    /// Version time information
    #[serde(default)]
    time: HashMap<String, String>,
    /// Available versions
    #[serde(default)]
    versions: HashMap<String, NpmVersion>,
    /// Named tags such as `latest`
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    homepage: Option<String>,
    repository: Option<NpmRepository>,
}

#[derive(Debug, Deserialize)]
struct NpmVersion {
    /// Deprecation message, present only on deprecated versions
    deprecated: Option<serde_json::Value>,
    dist: Option<NpmDist>,
}

#[derive(Debug, Deserialize)]
struct NpmDist {
    integrity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NpmRepository {
    Url(String),
    Object { url: String },
}

impl NpmRepository {
    fn url(self) -> String {
        let url = match self {
            NpmRepository::Url(url) | NpmRepository::Object { url } => url,
        };
        url.trim_start_matches("git+")
            .trim_end_matches(".git")
            .to_string()
    }
}

impl NpmDatasource {
    /// Create a new npm datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the URL for a package
    ///
    /// Scoped packages keep their `@` but the separating slash is escaped.
    fn build_url(&self, base: &str, package: &str) -> String {
        format!("{}/{}", base, package.replace('/', "%2F"))
    }
}

#[async_trait]
impl Datasource for NpmDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Npm
    }

    fn default_registry_url(&self) -> &'static str {
        NPM_REGISTRY_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let url = self.build_url(request.registry_url_or(NPM_REGISTRY_URL), &request.package_name);
        let ctx = RequestContext::new(request, self.id());
        let Some(response) = self.client.get_json::<NpmPackageResponse>(&url, &ctx).await? else {
            return Ok(None);
        };

        let releases = response
            .versions
            .into_iter()
            .map(|(version, info)| {
                // Get the publish time for this version
                let released_at = response.time.get(&version).map(String::as_str);
                let mut release = ReleaseRecord::new(&version)
                    .with_timestamp_str(released_at)
                    .with_deprecated(info.deprecated.is_some());
                if let Some(integrity) = info.dist.and_then(|d| d.integrity) {
                    release = release.with_digest(integrity);
                }
                release
            })
            .collect();

        let mut result = ReleaseResult::new(releases)
            .with_homepage(response.homepage)
            .with_source_url(response.repository.map(NpmRepository::url));
        for (tag, version) in response.dist_tags {
            result = result.with_tag(tag, version);
        }

        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn datasource() -> NpmDatasource {
        NpmDatasource::new(HttpClient::new().unwrap().with_max_retries(0))
    }

    #[test]
    fn test_npm_datasource_id() {
        assert_eq!(datasource().id(), DatasourceId::Npm);
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            datasource().build_url(NPM_REGISTRY_URL, "lodash"),
            "https://registry.npmjs.org/lodash"
        );
    }

    #[test]
    fn test_build_url_scoped_package() {
        assert_eq!(
            datasource().build_url(NPM_REGISTRY_URL, "@types/node"),
            "https://registry.npmjs.org/@types%2Fnode"
        );
    }

    #[test]
    fn test_repository_url_normalization() {
        let repo = NpmRepository::Object {
            url: "git+https://github.com/lodash/lodash.git".to_string(),
        };
        assert_eq!(repo.url(), "https://github.com/lodash/lodash");
    }

    #[tokio::test]
    async fn test_get_releases_parses_packument() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lodash"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "dist-tags": {"latest": "4.17.21"},
                "homepage": "https://lodash.com/",
                "repository": {"type": "git", "url": "git+https://github.com/lodash/lodash.git"},
                "time": {
                    "created": "2012-04-23T16:37:11.912Z",
                    "4.17.20": "2020-08-13T16:53:54.152Z",
                    "4.17.21": "2021-02-20T15:42:16.891Z"
                },
                "versions": {
                    "4.17.20": {"deprecated": "use 4.17.21", "dist": {"integrity": "sha512-aaa"}},
                    "4.17.21": {"dist": {"integrity": "sha512-bbb"}}
                }
            })))
            .mount(&server)
            .await;

        let request = LookupRequest::new("npm", "lodash").with_registry_url(server.uri());
        let result = datasource().get_releases(&request).await.unwrap().unwrap();

        assert_eq!(result.releases.len(), 2);
        assert_eq!(result.tags.get("latest").map(String::as_str), Some("4.17.21"));
        assert_eq!(result.source_url.as_deref(), Some("https://github.com/lodash/lodash"));
        assert!(result.find("4.17.20").unwrap().deprecated());
        let latest = result.find("4.17.21").unwrap();
        assert!(!latest.deprecated());
        assert_eq!(latest.digest.as_deref(), Some("sha512-bbb"));
        assert!(latest.release_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_get_releases_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request = LookupRequest::new("npm", "nope").with_registry_url(server.uri());
        assert!(datasource().get_releases(&request).await.unwrap().is_none());
    }
}
