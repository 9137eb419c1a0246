//! Admin configuration
//!
//! Read once at startup from an optional TOML file, then overridden by CLI
//! flags. Immutable afterwards.
//!
//! ```toml
//! binary-source = "docker"
//! docker-image-prefix = "ghcr.io/acme"
//! exec-timeout-minutes = 20
//!
//! [tool-versions]
//! rust = "1.79.0"
//!
//! [[host-rules]]
//! host-type = "github"
//! match-host = "github.enterprise.com"
//! token-env = "GHE_TOKEN"
//! ```

use crate::error::ConfigError;
use crate::host_rules::HostRuleSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default image registry and namespace for tool images
pub const DEFAULT_DOCKER_IMAGE_PREFIX: &str = "docker.io/library";

/// Default limit on one tool invocation
pub const DEFAULT_EXEC_TIMEOUT_MINUTES: u64 = 15;

/// Where ecosystem tools come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinarySource {
    /// Tools installed on the host
    #[default]
    Native,
    /// Tools run inside a container image
    Docker,
}

impl fmt::Display for BinarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinarySource::Native => write!(f, "native"),
            BinarySource::Docker => write!(f, "docker"),
        }
    }
}

impl FromStr for BinarySource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "global" => Ok(BinarySource::Native),
            "docker" => Ok(BinarySource::Docker),
            _ => Err(ConfigError::InvalidBinarySource {
                value: s.to_string(),
            }),
        }
    }
}

/// Process-wide settings supplied by whoever runs the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdminConfig {
    /// Repository checkout all relative paths are resolved against
    pub local_dir: PathBuf,
    /// Native or containerized tool execution
    pub binary_source: BinarySource,
    /// Image tag per tool name; unpinned tools use `latest`
    pub tool_versions: BTreeMap<String, String>,
    /// Registry and namespace of tool images
    pub docker_image_prefix: String,
    /// Limit on one tool invocation, in minutes
    pub exec_timeout_minutes: u64,
    /// Override of `exec_timeout_minutes` with finer granularity
    #[serde(skip)]
    exec_timeout_override: Option<Duration>,
    /// Credentials for private hosts
    pub host_rules: HostRuleSet,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("."),
            binary_source: BinarySource::default(),
            tool_versions: BTreeMap::new(),
            docker_image_prefix: DEFAULT_DOCKER_IMAGE_PREFIX.to_string(),
            exec_timeout_minutes: DEFAULT_EXEC_TIMEOUT_MINUTES,
            exec_timeout_override: None,
            host_rules: HostRuleSet::default(),
        }
    }
}

impl AdminConfig {
    /// Configuration for a repository checkout with defaults elsewhere
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_dir: local_dir.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::ParseError {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Sets the repository root (builder pattern)
    pub fn with_local_dir(mut self, local_dir: impl Into<PathBuf>) -> Self {
        self.local_dir = local_dir.into();
        self
    }

    /// Sets the binary source (builder pattern)
    pub fn with_binary_source(mut self, binary_source: BinarySource) -> Self {
        self.binary_source = binary_source;
        self
    }

    /// Pins a tool image tag (builder pattern)
    pub fn with_tool_version(mut self, tool: impl Into<String>, tag: impl Into<String>) -> Self {
        self.tool_versions.insert(tool.into(), tag.into());
        self
    }

    /// Sets the execution timeout (builder pattern)
    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout_override = Some(timeout);
        self
    }

    /// Sets the host rules (builder pattern)
    pub fn with_host_rules(mut self, host_rules: HostRuleSet) -> Self {
        self.host_rules = host_rules;
        self
    }

    /// Effective execution timeout
    pub fn exec_timeout(&self) -> Duration {
        self.exec_timeout_override
            .unwrap_or(Duration::from_secs(self.exec_timeout_minutes * 60))
    }

    /// Check that the repository root exists and make it absolute
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if !self.local_dir.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: self.local_dir.clone(),
                message: "not a directory".to_string(),
            });
        }
        self.local_dir =
            self.local_dir
                .canonicalize()
                .map_err(|e| ConfigError::InvalidPath {
                    path: self.local_dir.clone(),
                    message: e.to_string(),
                })?;
        Ok(self)
    }
}
