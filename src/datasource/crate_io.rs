//! crates.io API datasource
//!
//! Fetches crate version information from crates.io.
//! API endpoint: https://crates.io/api/v1/crates/{crate}
//!
//! Note: crates.io requires a User-Agent header (handled by HttpClient)
//! and has rate limiting (1 request/second).

use crate::datasource::{Datasource, HttpClient, RequestContext};
use crate::domain::{DatasourceId, LookupRequest, ReleaseRecord, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::time::{Duration, Instant};

/// crates.io base URL
const CRATES_IO_URL: &str = "https://crates.io";

/// Rate limit: 1 request per second
const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);

/// crates.io datasource with rate limiting
pub struct CrateDatasource {
    client: HttpClient,
    rate_limiter: Semaphore,
    last_request: Mutex<Option<Instant>>,
}

/// crates.io crate response
#[derive(Debug, Deserialize)]
struct CratesIoResponse {
    #[serde(rename = "crate")]
    krate: CrateInfo,
    versions: Vec<CrateVersion>,
}

#[derive(Debug, Deserialize)]
struct CrateInfo {
    homepage: Option<String>,
    repository: Option<String>,
}

/// Crate version information
#[derive(Debug, Deserialize)]
struct CrateVersion {
    /// Version number
    num: String,
    /// Created at timestamp
    created_at: Option<String>,
    /// Whether this version is yanked
    #[serde(default)]
    yanked: bool,
    /// sha256 of the .crate file
    checksum: Option<String>,
}

impl CrateDatasource {
    /// Create a new crates.io datasource
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            rate_limiter: Semaphore::new(1),
            last_request: Mutex::new(None),
        }
    }

    /// Build the URL for a crate
    fn build_url(&self, base: &str, crate_name: &str) -> String {
        format!("{}/api/v1/crates/{}", base, crate_name)
    }

    /// Apply rate limiting before making a request
    async fn apply_rate_limit(&self) {
        // The semaphore is never closed, so acquire only fails after drop.
        let _permit = self.rate_limiter.acquire().await.ok();

        // Check if we need to wait
        let elapsed = {
            let last_request = self
                .last_request
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            last_request.map(|t| t.elapsed())
        };

        if let Some(elapsed) = elapsed {
            if elapsed < RATE_LIMIT_INTERVAL {
                tokio::time::sleep(RATE_LIMIT_INTERVAL - elapsed).await;
            }
        }

        // Update last request time
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }
}

#[async_trait]
impl Datasource for CrateDatasource {
    fn id(&self) -> DatasourceId {
        DatasourceId::Crate
    }

    fn default_registry_url(&self) -> &'static str {
        CRATES_IO_URL
    }

    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let base = request.registry_url_or(CRATES_IO_URL);
        // Only the public instance enforces the crawler policy
        if base == CRATES_IO_URL {
            self.apply_rate_limit().await;
        }

        let url = self.build_url(base, &request.package_name);
        let ctx = RequestContext::new(request, self.id());
        let Some(response) = self.client.get_json::<CratesIoResponse>(&url, &ctx).await? else {
            return Ok(None);
        };

        let releases = response
            .versions
            .into_iter()
            .map(|version| {
                let mut release = ReleaseRecord::new(version.num)
                    .with_timestamp_str(version.created_at.as_deref())
                    .with_deprecated(version.yanked);
                if let Some(checksum) = version.checksum {
                    release = release.with_digest(checksum);
                }
                release
            })
            .collect();

        Ok(Some(
            ReleaseResult::new(releases)
                .with_homepage(response.krate.homepage)
                .with_source_url(response.krate.repository),
        ))
    }
}
