//! Go modules manager
//!
//! Handles:
//! - require statements (single and block)
//! - replace directives (skipped)
//! - // indirect entries, kept as normal dependencies

use super::{Manager, ManagerId};
use crate::artifacts::{ArtifactStrategy, CommandContext};
use crate::domain::{DatasourceId, DependencyDescriptor, ManagerExtractResult};
use crate::exec::{ToolCommand, ToolImage};
use regex::Regex;
use std::sync::LazyLock;

// Regex for single require: require module/path v1.2.3
static SINGLE_REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^require\s+(\S+)\s+(v\d+\.\d+\.\d+\S*)\s*(//.*)?$").expect("valid regex")
});

// Regex for require block entry: module/path v1.2.3
static BLOCK_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(v\d+\.\d+\.\d+\S*)\s*(//.*)?$").expect("valid regex")
});

/// Manager for go.mod files
#[derive(Debug, Default)]
pub struct GomodManager;

impl GomodManager {
    pub fn new() -> Self {
        Self
    }
}

impl Manager for GomodManager {
    fn id(&self) -> ManagerId {
        ManagerId::Gomod
    }

    fn matches_file(&self, file_name: &str) -> bool {
        file_name == "go.mod"
    }

    fn extract_package_file(
        &self,
        content: Option<&str>,
        _file_name: &str,
    ) -> Option<ManagerExtractResult> {
        ManagerExtractResult::from_deps(parse_requires(content?))
    }

    fn artifacts(&self) -> Option<&dyn ArtifactStrategy> {
        Some(&GoArtifacts)
    }
}

fn parse_requires(content: &str) -> Vec<DependencyDescriptor> {
    let mut deps = Vec::new();
    let mut in_require_block = false;
    let mut in_replace_block = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        if trimmed == "require (" {
            in_require_block = true;
            continue;
        }
        if trimmed == "replace (" {
            in_replace_block = true;
            continue;
        }
        if trimmed == ")" {
            in_require_block = false;
            in_replace_block = false;
            continue;
        }

        // Replacements are local overrides
        if in_replace_block || trimmed.starts_with("replace ") {
            continue;
        }

        let caps = if in_require_block {
            BLOCK_ENTRY_RE.captures(trimmed)
        } else {
            SINGLE_REQUIRE_RE.captures(trimmed)
        };
        if let Some(caps) = caps {
            deps.push(DependencyDescriptor::new(
                &caps[1],
                &caps[2],
                DatasourceId::Go,
            ));
        }
    }

    deps
}

/// go.sum regeneration through the go command
#[derive(Debug, Clone, Copy, Default)]
pub struct GoArtifacts;

impl ArtifactStrategy for GoArtifacts {
    fn manager(&self) -> &'static str {
        ManagerId::Gomod.as_str()
    }

    fn lockfile_names(&self) -> &'static [&'static str] {
        &["go.sum"]
    }

    // A go.sum only ever belongs to the go.mod next to it
    fn search_ancestors(&self) -> bool {
        false
    }

    fn tool(&self) -> ToolImage {
        ToolImage {
            tool: "go",
            image: "golang",
            env_passthrough: &[
                "GOPROXY",
                "GOPRIVATE",
                "GONOSUMDB",
                "GOINSECURE",
                "GOFLAGS",
                "CGO_ENABLED",
            ],
        }
    }

    fn commands(&self, ctx: &CommandContext<'_>) -> Vec<ToolCommand> {
        let mut commands = Vec::new();
        if ctx.config.update_type.is_lockfile_maintenance() {
            commands.push(ToolCommand::new("go").args(["get", "-u", "./..."]));
        }
        commands.push(ToolCommand::new("go").args(["mod", "tidy"]));
        commands
    }
}
