//! RubyGems Registry datasource
//!
//! Fetches package version information from the RubyGems registry.
//! API endpoint: https://rubygems.org/api/v1/versions/{gem}.json

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// RubyGems registry base URL
const RUBYGEMS_URL: &str = "https://rubygems.org";

/// RubyGems Registry datasource
pub struct RubygemsDatasource {
    client: HttpClient,
}

/// One entry of the versions endpoint
#[derive(Debug, Deserialize)]
struct GemVersion {
    number: String,
    created_at: Option<String>,
    sha: Option<String>,
    /// Platform-specific builds share a version number with the ruby build
    #[serde(default)]
    platform: Option<String>,
}

impl RubygemsDatasource {
    /// Create a new RubyGems datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the URL for a gem
    fn build_url(&self, base: &str, gem: &str) -> String {
        format!("{}/api/v1/versions/{}.json", base, gem)
    }
}

#[async_trait]
impl Datasource for RubygemsDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Rubygems
    }

    fn default_registry_url(&self) -> &'static str {
        RUBYGEMS_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let url = self.build_url(request.registry_url_or(RUBYGEMS_URL), &request.package_name);
        let ctx = RequestContext::new(request, self.id());
        let Some(versions) = self.client.get_json::<Vec<GemVersion>>(&url, &ctx).await? else {
            return Ok(None);
        };

        let releases = versions
            .into_iter()
            .filter(|v| v.platform.as_deref().is_none_or(|p| p == "ruby"))
            .map(|v| {
                let release = ReleaseRecord::new(v.number).with_timestamp_str(v.created_at.as_deref());
                match v.sha {
                    Some(sha) => release.with_digest(sha),
                    None => release,
                }
            })
            .collect();

        Ok(Some(ReleaseResult::new(releases)))
    }
}
