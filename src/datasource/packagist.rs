//! Packagist Registry datasource
//!
//! Fetches package version information from the Packagist registry.
//! API endpoint: https://repo.packagist.org/p2/{vendor}/{package}.json

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Packagist registry base URL
const PACKAGIST_URL: &str = "https://repo.packagist.org";

/// Packagist Registry datasource
pub struct PackagistDatasource {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct PackagistResponse {
    #[serde(default)]
    packages: HashMap<String, Vec<PackagistVersion>>,
}

/// One version entry of the p2 metadata
///
/// The minified format only repeats fields that change, so everything but
/// the version is optional.
#[derive(Debug, Deserialize)]
struct PackagistVersion {
    version: String,
    time: Option<String>,
    homepage: Option<String>,
    source: Option<PackagistSource>,
    #[serde(default)]
    abandoned: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PackagistSource {
    url: Option<String>,
}

impl PackagistDatasource {
    /// Create a new Packagist datasource
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the URL for a package
    /// Package names are in the format vendor/package
    fn build_url(&self, base: &str, package: &str) -> Result<String, DatasourceError> {
        match package.split_once('/') {
            Some((vendor, name)) if !vendor.is_empty() && !name.is_empty() => Ok(format!(
                "{}/p2/{}.json",
                base,
                package.to_ascii_lowercase()
            )),
            _ => Err(DatasourceError::invalid_package_name(
                package,
                "expected format 'vendor/package'",
            )),
        }
    }
}

#[async_trait]
impl Datasource for PackagistDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Packagist
    }

    fn default_registry_url(&self) -> &'static str {
        PACKAGIST_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let url = self.build_url(request.registry_url_or(PACKAGIST_URL), &request.package_name)?;
        let ctx = RequestContext::new(request, self.id());
        let Some(mut response) = self.client.get_json::<PackagistResponse>(&url, &ctx).await?
        else {
            return Ok(None);
        };

        let key = request.package_name.to_ascii_lowercase();
        let Some(versions) = response.packages.remove(&key) else {
            return Ok(None);
        };

        let mut homepage = None;
        let mut source_url = None;
        let mut releases = Vec::with_capacity(versions.len());
        for entry in versions {
            if homepage.is_none() {
                homepage = entry.homepage.clone();
            }
            if source_url.is_none() {
                source_url = entry.source.as_ref().and_then(|s| s.url.clone());
            }
            let abandoned = entry.abandoned.is_some_and(|a| a != serde_json::Value::Bool(false));
            releases.push(
                ReleaseRecord::new(entry.version)
                    .with_timestamp_str(entry.time.as_deref())
                    .with_deprecated(abandoned),
            );
        }

        Ok(Some(
            ReleaseResult::new(releases)
                .with_homepage(homepage)
                .with_source_url(source_url),
        ))
    }
}
