//! Datasource adapters for fetching package release information
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - One adapter per [`DatasourceId`]
//! - A fixed registry dispatching lookups to the right adapter

mod client;
mod crate_io;
mod dart;
mod docker;
mod github;
mod gitlab;
mod go_proxy;
mod maven;
mod npm;
mod nuget;
mod packagist;
mod pypi;
mod rubygems;

pub use client::{next_link, HttpClient, Page, RequestContext};
pub use crate_io::CrateDatasource;
pub use dart::DartDatasource;
pub use docker::DockerDatasource;
pub use github::{GithubReleasesDatasource, GithubTagsDatasource};
pub use gitlab::GitlabTagsDatasource;
pub use go_proxy::GoProxyDatasource;
pub use maven::MavenDatasource;
pub use npm::NpmDatasource;
pub use nuget::NugetDatasource;
pub use packagist::PackagistDatasource;
pub use pypi::PypiDatasource;
pub use rubygems::RubygemsDatasource;

use crate::domain::{DatasourceId, LookupRequest, ReleaseResult};
use crate::error::DatasourceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A provider of release information for one package ecosystem
#[async_trait]
pub trait Datasource: Send + Sync {
    /// Identifier this datasource is registered under
    fn id(&self) -> DatasourceId;

    /// Registry URL used when the request carries no override
    fn default_registry_url(&self) -> &'static str;

    /// Fetch every release of the requested package
    ///
    /// `Ok(None)` means the package does not exist in the registry.
    async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError>;
}

/// Create the datasource for the given id
pub fn create_datasource(id: DatasourceId, client: HttpClient) -> Arc<dyn Datasource> {
    match id {
        DatasourceId::Crate => Arc::new(CrateDatasource::new(client)),
        DatasourceId::Npm => Arc::new(NpmDatasource::new(client)),
        DatasourceId::Pypi => Arc::new(PypiDatasource::new(client)),
        DatasourceId::Go => Arc::new(GoProxyDatasource::new(client)),
        DatasourceId::Rubygems => Arc::new(RubygemsDatasource::new(client)),
        DatasourceId::Packagist => Arc::new(PackagistDatasource::new(client)),
        DatasourceId::Maven => Arc::new(MavenDatasource::new(client)),
        DatasourceId::Nuget => Arc::new(NugetDatasource::new(client)),
        DatasourceId::Dart => Arc::new(DartDatasource::new(client)),
        DatasourceId::GithubTags => Arc::new(GithubTagsDatasource::new(client)),
        DatasourceId::GithubReleases => Arc::new(GithubReleasesDatasource::new(client)),
        DatasourceId::GitlabTags => Arc::new(GitlabTagsDatasource::new(client)),
        DatasourceId::Docker => Arc::new(DockerDatasource::new(client)),
    }
}

/// Fixed mapping from datasource id to implementation
///
/// Built once with every known id and never mutated afterwards.
pub struct DatasourceRegistry {
    datasources: HashMap<DatasourceId, Arc<dyn Datasource>>,
}

impl DatasourceRegistry {
    /// Build a registry sharing the given HTTP client
    pub fn with_client(client: HttpClient) -> Self {
        let datasources = DatasourceId::ALL
            .iter()
            .map(|&id| (id, create_datasource(id, client.clone())))
            .collect();
        Self { datasources }
    }

    /// Build a registry with a default HTTP client
    pub fn new() -> Result<Self, DatasourceError> {
        Ok(Self::with_client(HttpClient::new()?))
    }

    /// Process-wide registry instance
    pub fn global() -> Result<&'static DatasourceRegistry, DatasourceError> {
        static GLOBAL: OnceLock<DatasourceRegistry> = OnceLock::new();
        if let Some(registry) = GLOBAL.get() {
            return Ok(registry);
        }
        let registry = Self::new()?;
        Ok(GLOBAL.get_or_init(|| registry))
    }

    /// Look up a datasource by its string key
    pub fn get(&self, id: &str) -> Result<&Arc<dyn Datasource>, DatasourceError> {
        let id: DatasourceId = id.parse()?;
        self.datasources
            .get(&id)
            .ok_or_else(|| DatasourceError::unknown_datasource(id.as_str()))
    }

    /// Ids of every registered datasource, in declaration order
    pub fn ids(&self) -> impl Iterator<Item = DatasourceId> + '_ {
        DatasourceId::ALL
            .iter()
            .copied()
            .filter(|id| self.datasources.contains_key(id))
    }

    /// Dispatch a lookup to the datasource named in the request
    pub async fn get_releases(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let datasource = self.get(&request.datasource)?;
        tracing::debug!(
            "looking up {} via {}",
            request.package_name,
            datasource.id()
        );
        datasource.get_releases(request).await
    }
}
