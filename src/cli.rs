//! CLI argument parsing module for depsync

use crate::config::{AdminConfig, BinarySource};
use crate::error::ConfigError;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Dependency release lookup and lockfile regeneration
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depsync",
    version,
    about = "Dependency release lookup and lockfile regeneration"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (debug logging)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Admin configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository checkout (default: current directory, or the config file value)
    #[arg(long, global = true)]
    pub local_dir: Option<PathBuf>,

    /// Where ecosystem tools run: native or docker
    #[arg(long, global = true)]
    pub binary_source: Option<BinarySource>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the releases a datasource knows for a package
    Lookup {
        /// Datasource id (crate, npm, pypi, go, github-tags, ...)
        datasource: String,
        /// Package name as the datasource expects it
        package: String,
        /// Registry URL overriding the datasource default
        #[arg(long)]
        registry_url: Option<String>,
        /// Lookup constraint as KEY=VALUE (can be specified multiple times)
        #[arg(long = "constraint", value_parser = parse_constraint, action = ArgAction::Append)]
        constraints: Vec<(String, String)>,
    },
    /// Extract dependencies from a manifest
    Extract {
        /// Manifest file
        file: PathBuf,
    },
    /// Regenerate the lockfile for an edited manifest
    Artifacts {
        /// Manifest path, relative to the repository checkout
        manifest: PathBuf,
        /// Updated dependency (can be specified multiple times; default: all)
        #[arg(long = "dep", action = ArgAction::Append)]
        deps: Vec<String>,
        /// Refresh the whole lockfile instead of specific dependencies
        #[arg(long, conflicts_with = "deps")]
        maintenance: bool,
    },
}

impl CliArgs {
    /// Admin configuration: the config file if given, then CLI overrides
    pub fn admin_config(&self) -> Result<AdminConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AdminConfig::from_file(path)?,
            None => AdminConfig::default(),
        };
        if let Some(dir) = &self.local_dir {
            config = config.with_local_dir(dir);
        }
        if let Some(binary_source) = self.binary_source {
            config = config.with_binary_source(binary_source);
        }
        Ok(config)
    }
}

/// Parse a KEY=VALUE constraint
fn parse_constraint(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", value)),
    }
}
