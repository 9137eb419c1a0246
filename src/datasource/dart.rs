//! pub.dev datasource
//!
//! API endpoint: https://pub.dev/api/packages/{package}

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// pub.dev base URL
const PUB_DEV_URL: &str = "https://pub.dev";

/// pub.dev datasource
pub struct DartDatasource {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct PubPackageResponse {
    latest: Option<PubVersion>,
    #[serde(default)]
    versions: Vec<PubVersion>,
    #[serde(default, rename = "isDiscontinued")]
    is_discontinued: bool,
}

#[derive(Debug, Deserialize)]
struct PubVersion {
    version: String,
    published: Option<String>,
    #[serde(default)]
    retracted: bool,
    pubspec: Option<PubSpec>,
}

#[derive(Debug, Deserialize)]
struct PubSpec {
    homepage: Option<String>,
    repository: Option<String>,
}

impl DartDatasource {
    /// Create a new pub.dev datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn build_url(&self, base: &str, package: &str) -> String {
        format!("{}/api/packages/{}", base, package)
    }
}

#[async_trait]
impl Datasource for DartDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Dart
    }

    fn default_registry_url(&self) -> &'static str {
        PUB_DEV_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let url = self.build_url(request.registry_url_or(PUB_DEV_URL), &request.package_name);
        let ctx = RequestContext::new(request, self.id());
        let Some(response) = self.client.get_json::<PubPackageResponse>(&url, &ctx).await? else {
            return Ok(None);
        };

        let (homepage, source_url) = response
            .latest
            .as_ref()
            .and_then(|latest| latest.pubspec.as_ref())
            .map(|spec| (spec.homepage.clone(), spec.repository.clone()))
            .unwrap_or_default();

        let mut result = ReleaseResult::new(
            response
                .versions
                .into_iter()
                .map(|v| {
                    ReleaseRecord::new(v.version)
                        .with_timestamp_str(v.published.as_deref())
                        .with_deprecated(v.retracted || response.is_discontinued)
                })
                .collect(),
        )
        .with_homepage(homepage)
        .with_source_url(source_url);
        if let Some(latest) = response.latest {
            result = result.with_tag("latest", latest.version);
        }

        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_releases() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/packages/http"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "http",
                "latest": {
                    "version": "1.2.0",
                    "pubspec": {"repository": "https://github.com/dart-lang/http"}
                },
                "versions": [
                    {"version": "1.1.0", "published": "2023-08-01T00:00:00.000Z", "retracted": true},
                    {"version": "1.2.0", "published": "2024-01-10T00:00:00.000Z"}
                ]
            })))
            .mount(&server)
            .await;

        let datasource = DartDatasource::new(HttpClient::new().unwrap().with_max_retries(0));
        let request = LookupRequest::new("dart", "http").with_registry_url(server.uri());
        let result = datasource.get_releases(&request).await.unwrap().unwrap();

        assert_eq!(result.releases.len(), 2);
        assert_eq!(result.tags.get("latest").map(String::as_str), Some("1.2.0"));
        assert_eq!(result.source_url.as_deref(), Some("https://github.com/dart-lang/http"));
        assert!(result.find("1.1.0").unwrap().deprecated());
        assert!(!result.find("1.2.0").unwrap().deprecated());
    }
}
