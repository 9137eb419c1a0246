//! Go Module Proxy datasource
//!
//! Fetches module version information from the Go Module Proxy.
//! API endpoints:
//! - List versions: https://proxy.golang.org/{module}/@v/list
//! - Version info: https://proxy.golang.org/{module}/@v/{version}.info

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;

/// Go Module Proxy base URL
const GO_PROXY_URL: &str = "https://proxy.golang.org";

/// Go Module Proxy datasource
pub struct GoProxyDatasource {
    client: HttpClient,
}

/// Version info response
#[derive(Debug, Deserialize)]
struct VersionInfoResponse {
    /// Version string
    #[serde(rename = "Version")]
    version: String,
    /// Time when the version was created
    #[serde(rename = "Time")]
    time: Option<String>,
}

impl GoProxyDatasource {
    /// Create a new Go Proxy datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the URL for listing versions
    fn build_list_url(base: &str, module: &str) -> String {
        format!("{}/{}/@v/list", base, Self::encode_module_path(module))
    }

    /// Build the URL for version info
    fn build_info_url(base: &str, module: &str, version: &str) -> String {
        format!(
            "{}/{}/@v/{}.info",
            base,
            Self::encode_module_path(module),
            version
        )
    }

    /// Encode a module path for the proxy protocol
    ///
    /// Uppercase letters become `!` followed by the lowercase letter.
    fn encode_module_path(module: &str) -> String {
        let mut encoded = String::with_capacity(module.len());
        for ch in module.chars() {
            if ch.is_uppercase() {
                encoded.push('!');
                encoded.extend(ch.to_lowercase());
            } else {
                encoded.push(ch);
            }
        }
        encoded
    }

    /// Source repository for well-known hosting prefixes
    fn source_url(module: &str) -> Option<String> {
        let mut parts = module.splitn(4, '/');
        let host = parts.next()?;
        if !matches!(host, "github.com" | "gitlab.com" | "bitbucket.org") {
            return None;
        }
        let owner = parts.next()?;
        let repo = parts.next()?;
        Some(format!("https://{}/{}/{}", host, owner, repo))
    }
}

#[async_trait]
impl Datasource for GoProxyDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Go
    }

    fn default_registry_url(&self) -> &'static str {
        GO_PROXY_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let base = request.registry_url_or(GO_PROXY_URL);
        let module = request.package_name.as_str();
        let ctx = RequestContext::new(request, self.id());

        // First, get the list of versions
        let list_url = Self::build_list_url(base, module);
        let Some(version_list) = self.client.get_text(&list_url, &ctx).await? else {
            return Ok(None);
        };

        // For each version, fetch the info to get the release time
        let mut releases = Vec::new();
        for version in version_list.lines().map(str::trim).filter(|v| !v.is_empty()) {
            let info_url = Self::build_info_url(base, module, version);
            match self
                .client
                .get_json::<VersionInfoResponse>(&info_url, &ctx)
                .await
            {
                Ok(Some(info)) => releases
                    .push(ReleaseRecord::new(info.version).with_timestamp_str(info.time.as_deref())),
                Ok(None) => releases.push(ReleaseRecord::new(version)),
                Err(e) => {
                    // The listing is authoritative; keep the version without a timestamp
                    tracing::debug!("no info for {}@{}: {}", module, version, e);
                    releases.push(ReleaseRecord::new(version));
                }
            }
        }

        Ok(Some(
            ReleaseResult::new(releases).with_source_url(Self::source_url(module)),
        ))
    }
}
