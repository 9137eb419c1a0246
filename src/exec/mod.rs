//! Tool execution, on the host or inside a container
//!
//! This module provides:
//! - The [`CommandRunner`] seam and its `tokio::process` implementation
//! - [`ToolExecutor`], which runs ecosystem commands natively or via `docker run`
//! - The process-wide [`ImageCache`] of already-pulled images

mod docker;
mod env;

pub use docker::{
    container_name, image_ref, reset_prefetched_images, DockerRun, ImageCache, CONTAINER_LABEL,
};
pub use env::child_process_env;

use crate::config::{AdminConfig, BinarySource};
use crate::error::ExecError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

/// Options for one process invocation
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Absolute working directory
    pub cwd: PathBuf,
    /// Complete child environment
    pub env: BTreeMap<String, String>,
}

/// Captured output of a successful process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Trait for running external processes
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion
    ///
    /// A non-zero exit is returned as [`ExecError::NonZeroExit`].
    async fn run(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput, ExecError>;
}

/// Default runner that executes real processes
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput, ExecError> {
        let command_str = display_command(program, args);
        tracing::debug!("running '{}' in {}", command_str, options.cwd.display());

        // Dropping the future (timeout) kills the child
        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&options.cwd)
            .env_clear()
            .envs(&options.env)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                command: command_str.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(ExecOutput {
                stdout,
                stderr,
                exit_code: output.status.code(),
            })
        } else {
            Err(ExecError::NonZeroExit {
                command: command_str,
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}

fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One command of an ecosystem tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Variables set for this command only
    pub env: BTreeMap<String, String>,
}

impl ToolCommand {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Adds an argument (builder pattern)
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds arguments (builder pattern)
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable (builder pattern)
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_command(&self.program, &self.args))
    }
}

/// The tool an ecosystem's commands need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolImage {
    /// Tool name; keys version pins and names the container
    pub tool: &'static str,
    /// Image name under the configured prefix
    pub image: &'static str,
    /// Host variables the tool needs beyond the basic set
    pub env_passthrough: &'static [&'static str],
}

/// Runs tool commands in native or docker mode
pub struct ToolExecutor {
    runner: Arc<dyn CommandRunner>,
    image_cache: Arc<ImageCache>,
    binary_source: BinarySource,
    root: PathBuf,
    image_prefix: String,
    tool_versions: HashMap<String, String>,
    timeout: Duration,
}

impl ToolExecutor {
    /// Create an executor from admin configuration
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            runner: Arc::new(SystemRunner::new()),
            image_cache: ImageCache::global(),
            binary_source: config.binary_source,
            root: config.local_dir.clone(),
            image_prefix: config.docker_image_prefix.clone(),
            tool_versions: config
                .tool_versions
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            timeout: config.exec_timeout(),
        }
    }

    /// Use a different process runner (builder pattern)
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Use a different image cache (builder pattern)
    pub fn with_image_cache(mut self, cache: Arc<ImageCache>) -> Self {
        self.image_cache = cache;
        self
    }

    /// Full image reference for a tool, honouring version pins
    pub fn image_for(&self, tool: &ToolImage) -> String {
        let tag = self
            .tool_versions
            .get(tool.tool)
            .map(String::as_str)
            .unwrap_or("latest");
        image_ref(&self.image_prefix, tool.image, tag)
    }

    /// Run commands in order with `cwd` relative to the repository root
    ///
    /// Stops at the first failing command.
    pub async fn exec(
        &self,
        tool: &ToolImage,
        commands: &[ToolCommand],
        cwd: &Path,
    ) -> Result<Vec<ExecOutput>, ExecError> {
        let cwd = if cwd.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(cwd)
        };
        let mut outputs = Vec::with_capacity(commands.len());

        match self.binary_source {
            BinarySource::Native => {
                for command in commands {
                    let options = ExecOptions {
                        cwd: cwd.clone(),
                        env: child_process_env(tool.env_passthrough, &command.env),
                    };
                    let output = self
                        .run_with_timeout(
                            &command.to_string(),
                            &command.program,
                            &command.args,
                            &options,
                        )
                        .await?;
                    outputs.push(output);
                }
            }
            BinarySource::Docker => {
                let image = self.image_for(tool);
                self.prefetch(&image).await?;
                for command in commands {
                    let env = child_process_env(tool.env_passthrough, &command.env);
                    let name = container_name(tool.tool);
                    let args = DockerRun {
                        name: &name,
                        image: &image,
                        root: &self.root,
                        cwd: &cwd,
                        env_names: env
                            .keys()
                            .map(String::as_str)
                            .filter(|name| {
                                command.env.contains_key(*name)
                                    || tool.env_passthrough.contains(name)
                            })
                            .collect(),
                        program: &command.program,
                        args: &command.args,
                    }
                    .to_args();
                    let options = ExecOptions {
                        cwd: self.root.clone(),
                        env,
                    };
                    let result = self
                        .run_with_timeout(&command.to_string(), "docker", &args, &options)
                        .await;
                    if let Err(ExecError::Timeout { .. }) = &result {
                        self.remove_container(&name).await;
                    }
                    outputs.push(result?);
                }
            }
        }

        Ok(outputs)
    }

    async fn prefetch(&self, image: &str) -> Result<(), ExecError> {
        let runner = Arc::clone(&self.runner);
        let options = ExecOptions {
            cwd: self.root.clone(),
            env: child_process_env(&[], &BTreeMap::new()),
        };
        self.image_cache
            .prefetch(image, || async move {
                let args = vec!["pull".to_string(), image.to_string()];
                runner
                    .run("docker", &args, &options)
                    .await
                    .map(|_| ())
                    .map_err(|e| ExecError::ImagePull {
                        image: image.to_string(),
                        message: match e {
                            ExecError::NonZeroExit { stderr, .. } => stderr.trim().to_string(),
                            other => other.to_string(),
                        },
                    })
            })
            .await
    }

    /// Force-remove a container the `docker` client was killed for
    ///
    /// Killing the client leaves the container running under its name.
    async fn remove_container(&self, name: &str) {
        let args = vec!["rm".to_string(), "-f".to_string(), name.to_string()];
        let options = ExecOptions {
            cwd: self.root.clone(),
            env: child_process_env(&[], &BTreeMap::new()),
        };
        if let Err(e) = self.runner.run("docker", &args, &options).await {
            tracing::warn!("failed to remove container {}: {}", name, e);
        }
    }

    async fn run_with_timeout(
        &self,
        label: &str,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput, ExecError> {
        match tokio::time::timeout(self.timeout, self.runner.run(program, args, options)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("'{}' timed out after {}s", label, self.timeout.as_secs());
                Err(ExecError::Timeout {
                    command: label.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}
