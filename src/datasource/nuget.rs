//! NuGet v3 datasource
//!
//! Fetches package versions from the flat container resource.
//! API endpoint: https://api.nuget.org/v3-flatcontainer/{id}/index.json
//!
//! Package ids are case-insensitive and must be lowercased in the URL.

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// NuGet v3 base URL
const NUGET_URL: &str = "https://api.nuget.org";

/// NuGet datasource
pub struct NugetDatasource {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct FlatContainerIndex {
    versions: Vec<String>,
}

impl NugetDatasource {
    /// Create a new NuGet datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn build_url(&self, base: &str, package: &str) -> String {
        format!(
            "{}/v3-flatcontainer/{}/index.json",
            base,
            package.to_lowercase()
        )
    }
}

#[async_trait]
impl Datasource for NugetDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Nuget
    }

    fn default_registry_url(&self) -> &'static str {
        NUGET_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let url = self.build_url(request.registry_url_or(NUGET_URL), &request.package_name);
        let ctx = RequestContext::new(request, self.id());
        let Some(index) = self.client.get_json::<FlatContainerIndex>(&url, &ctx).await? else {
            return Ok(None);
        };

        let releases = index.versions.into_iter().map(ReleaseRecord::new).collect();
        Ok(Some(ReleaseResult::new(releases)))
    }
}
