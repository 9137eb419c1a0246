//! Maven Central Search API datasource
//!
//! Fetches Java package version information from Maven Central.
//! API endpoint: https://search.maven.org/solrsearch/select
//!
//! Query format: q=g:{groupId}+AND+a:{artifactId}&core=gav&rows=100&wt=json

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Maven Central Search base URL
const MAVEN_SEARCH_URL: &str = "https://search.maven.org";

/// Maximum number of versions to fetch
const MAX_VERSIONS: u32 = 100;

/// Maven Central datasource
pub struct MavenDatasource {
    client: HttpClient,
}

/// Maven Central search response
#[derive(Debug, Deserialize)]
struct MavenSearchResponse {
    response: MavenResponseBody,
}

/// Maven Central response body
#[derive(Debug, Deserialize)]
struct MavenResponseBody {
    docs: Vec<MavenVersionDoc>,
}

/// Maven Central version document
#[derive(Debug, Deserialize)]
struct MavenVersionDoc {
    /// Version string
    v: String,
    /// Timestamp in milliseconds since epoch
    timestamp: Option<i64>,
}

impl MavenDatasource {
    /// Create a new Maven Central datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build search URL for group:artifact
    fn build_url(&self, base: &str, package: &str) -> Result<String, DatasourceError> {
        // package format: "group:artifact" (e.g., "org.apache.wicket:wicket-core")
        let parts: Vec<&str> = package.split(':').collect();
        let [group, artifact] = parts.as_slice() else {
            return Err(DatasourceError::invalid_package_name(
                package,
                "expected format 'groupId:artifactId'",
            ));
        };
        Ok(format!(
            "{}/solrsearch/select?q=g:{}+AND+a:{}&core=gav&rows={}&wt=json",
            base, group, artifact, MAX_VERSIONS
        ))
    }

    /// Convert timestamp in milliseconds to DateTime<Utc>
    fn timestamp_to_datetime(timestamp_ms: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(timestamp_ms).single()
    }
}

#[async_trait]
impl Datasource for MavenDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Maven
    }

    fn default_registry_url(&self) -> &'static str {
        MAVEN_SEARCH_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let url = self.build_url(
            request.registry_url_or(MAVEN_SEARCH_URL),
            &request.package_name,
        )?;
        let ctx = RequestContext::new(request, self.id());
        let Some(response) = self.client.get_json::<MavenSearchResponse>(&url, &ctx).await?
        else {
            return Ok(None);
        };

        // The search index answers unknown coordinates with zero documents
        if response.response.docs.is_empty() {
            return Ok(None);
        }

        let releases = response
            .response
            .docs
            .into_iter()
            .map(|doc| {
                let release = ReleaseRecord::new(doc.v);
                match doc.timestamp.and_then(Self::timestamp_to_datetime) {
                    Some(released_at) => release.with_timestamp(released_at),
                    None => release,
                }
            })
            .collect();

        Ok(Some(ReleaseResult::new(releases)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn datasource() -> MavenDatasource {
        MavenDatasource::new(HttpClient::new().unwrap().with_max_retries(0))
    }

    #[test]
    fn test_build_url() {
        let url = datasource()
            .build_url(MAVEN_SEARCH_URL, "org.apache.wicket:wicket-core")
            .unwrap();
        assert!(url.starts_with("https://search.maven.org/solrsearch/select"));
        assert!(url.contains("q=g:org.apache.wicket+AND+a:wicket-core"));
        assert!(url.contains("core=gav"));
        assert!(url.contains("wt=json"));
    }

    #[test]
    fn test_build_url_invalid_format() {
        // Missing artifact
        assert!(datasource().build_url(MAVEN_SEARCH_URL, "org.apache.wicket").is_err());
        // Too many parts
        assert!(datasource().build_url(MAVEN_SEARCH_URL, "a:b:c").is_err());
    }

    #[test]
    fn test_timestamp_to_datetime() {
        // 2024-01-15T10:30:00Z = 1705314600000 ms
        let dt = MavenDatasource::timestamp_to_datetime(1705314600000_i64).unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
    }

    #[tokio::test]
    async fn test_get_releases_parses_docs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solrsearch/select"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {
                    "docs": [
                        {"v": "9.12.0", "timestamp": 1705314600000_i64},
                        {"v": "9.11.0", "timestamp": 1702722600000_i64}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let request = LookupRequest::new("maven", "org.apache.wicket:wicket-core")
            .with_registry_url(server.uri());
        let result = datasource().get_releases(&request).await.unwrap().unwrap();
        assert_eq!(result.releases.len(), 2);
        assert!(result.find("9.12.0").unwrap().release_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_get_releases_no_docs_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": {"docs": []}})),
            )
            .mount(&server)
            .await;

        let request = LookupRequest::new("maven", "com.example:missing").with_registry_url(server.uri());
        assert!(datasource().get_releases(&request).await.unwrap().is_none());
    }
}
