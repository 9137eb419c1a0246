//! Application error types using thiserror
//!
//! Error hierarchy:
//! - DatasourceError: Issues resolving releases from a datasource
//! - FsError: Filesystem collaborator failures
//! - ExecError: Failures running an ecosystem tool (natively or in a container)
//! - ArtifactError: Anything that turns an artifact update into a failed outcome
//! - ConfigError: Issues with admin configuration

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Datasource lookup errors
    #[error(transparent)]
    Datasource(#[from] DatasourceError),

    /// Filesystem errors
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No manager owns the file
    #[error("no manager handles {path}")]
    UnsupportedFile { path: PathBuf },

    /// The manager has nothing to regenerate
    #[error("the {manager} manager has no lockfile")]
    NoArtifacts { manager: String },
}

/// Errors returned by datasource lookups
///
/// "Package not found" is deliberately absent: a missing package is a valid
/// `Ok(None)` lookup result, not an error.
#[derive(Error, Debug)]
pub enum DatasourceError {
    /// No datasource registered under this id
    #[error("unknown datasource '{id}'")]
    UnknownDatasource { id: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {datasource}: {message}")]
    NetworkError {
        package: String,
        datasource: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {datasource} datasource")]
    RateLimitExceeded { datasource: String },

    /// Invalid response from registry
    #[error("invalid response from {datasource} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        datasource: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {datasource}")]
    Timeout { package: String, datasource: String },

    /// Authentication error
    #[error("authentication failed for {datasource}: {message}")]
    AuthenticationError { datasource: String, message: String },

    /// Package name cannot be mapped onto the registry's naming scheme
    #[error("invalid package name '{name}': {message}")]
    InvalidPackageName { name: String, message: String },
}

/// Errors raised by the filesystem collaborator
#[derive(Error, Debug)]
pub enum FsError {
    /// File does not exist
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read a file
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path escapes the repository root
    #[error("path '{path}' is outside the repository root")]
    OutsideRoot { path: PathBuf },
}

/// Errors raised while running an ecosystem tool
#[derive(Error, Debug)]
pub enum ExecError {
    /// The process could not be started (tool missing, permission denied)
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully
    #[error("'{command}' exited with {}", exit_code_label(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The process did not finish in time and was killed
    #[error("'{command}' timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    /// The container image could not be pulled
    #[error("failed to pull image {image}: {message}")]
    ImagePull { image: String, message: String },
}

/// Errors that turn an artifact update into a failed outcome
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Filesystem step failed
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Tool execution failed
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Errors related to admin configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has the wrong shape
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Unknown binary source value
    #[error("invalid binary source '{value}': expected 'native' or 'docker'")]
    InvalidBinarySource { value: String },

    /// Manager name that matches no registered manager
    #[error("unknown manager '{name}'")]
    UnknownManager { name: String },

    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "signal".to_string(),
    }
}

impl DatasourceError {
    /// Creates a new UnknownDatasource error
    pub fn unknown_datasource(id: impl Into<String>) -> Self {
        DatasourceError::UnknownDatasource { id: id.into() }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        datasource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DatasourceError::NetworkError {
            package: package.into(),
            datasource: datasource.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        datasource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        DatasourceError::InvalidResponse {
            package: package.into(),
            datasource: datasource.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(datasource: impl Into<String>) -> Self {
        DatasourceError::RateLimitExceeded {
            datasource: datasource.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, datasource: impl Into<String>) -> Self {
        DatasourceError::Timeout {
            package: package.into(),
            datasource: datasource.into(),
        }
    }

    /// Creates a new InvalidPackageName error
    pub fn invalid_package_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        DatasourceError::InvalidPackageName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether a caller-side retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatasourceError::NetworkError { .. }
                | DatasourceError::RateLimitExceeded { .. }
                | DatasourceError::Timeout { .. }
        )
    }
}

impl FsError {
    /// Classifies an io error raised while reading
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FsError::NotFound { path }
        } else {
            FsError::ReadError { path, source }
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FsError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error means the file is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

impl ArtifactError {
    /// Text attached to a failed artifact outcome.
    ///
    /// For a tool that ran and failed this is its captured stderr (stdout when
    /// stderr is empty); otherwise the error message itself.
    pub fn diagnostic(&self) -> String {
        match self {
            ArtifactError::Exec(ExecError::NonZeroExit { stdout, stderr, .. }) => {
                let captured = if stderr.trim().is_empty() {
                    stdout.trim()
                } else {
                    stderr.trim()
                };
                if captured.is_empty() {
                    self.to_string()
                } else {
                    captured.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}
