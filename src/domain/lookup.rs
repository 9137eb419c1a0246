//! Lookup requests sent to the datasource registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Credentials for an authenticated host
///
/// Resolved by the caller (see [`crate::host_rules`]); datasources only attach them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HostCredentials {
    /// Bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Basic-auth username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic-auth password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl HostCredentials {
    /// Credentials consisting of a bearer token
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Credentials consisting of a username and password
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            token: None,
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Returns true if nothing usable is set
    pub fn is_empty(&self) -> bool {
        self.token.as_deref().is_none_or(str::is_empty)
            && self.username.as_deref().is_none_or(str::is_empty)
    }
}

// Manual Debug so tokens never reach log output.
impl fmt::Debug for HostCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCredentials")
            .field("token", &self.token.as_deref().map(redact))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

/// Redact a secret for safe logging, keeping the first few characters.
pub fn redact(secret: &str) -> String {
    if secret.len() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = secret.chars().take(4).collect();
        format!("{}...", prefix)
    }
}

/// A request for the releases of one package
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupRequest {
    /// Datasource key; validated by the registry
    pub datasource: String,
    /// Package name in the datasource's naming scheme
    pub package_name: String,
    /// Registry URL overriding the datasource default
    pub registry_url: Option<String>,
    /// Credentials for the registry host
    pub credentials: Option<HostCredentials>,
    /// Datasource-specific extras such as tool constraints
    pub constraints: BTreeMap<String, String>,
}

impl LookupRequest {
    /// Creates a new request
    pub fn new(datasource: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            datasource: datasource.into(),
            package_name: package_name.into(),
            ..Default::default()
        }
    }

    /// Sets the registry URL (builder pattern)
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = Some(url.into());
        self
    }

    /// Sets the credentials (builder pattern)
    pub fn with_credentials(mut self, credentials: HostCredentials) -> Self {
        self.credentials = Some(credentials).filter(|c| !c.is_empty());
        self
    }

    /// Adds a constraint (builder pattern)
    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Registry base URL to use, without a trailing slash
    pub fn registry_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.registry_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
    }
}
