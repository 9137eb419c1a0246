//! Cargo manager for Rust projects
//!
//! Handles:
//! - dependencies, dev-dependencies and build-dependencies
//! - target-specific tables: [target.'cfg(unix)'.dependencies]
//! - Inline table format: { version = "1.0" }
//! - Renamed dependencies: foo = { package = "bar", version = "1.0" }
//!
//! Path, git-only and workspace-inherited entries have no registry version
//! and are skipped.

use super::{Manager, ManagerId};
use crate::artifacts::{ArtifactStrategy, CommandContext};
use crate::domain::{DatasourceId, DepType, DependencyDescriptor, ManagerExtractResult};
use crate::exec::{ToolCommand, ToolImage};
use toml::{Table, Value};

const DEPENDENCY_TABLES: [(&str, DepType); 3] = [
    ("dependencies", DepType::Normal),
    ("dev-dependencies", DepType::Dev),
    ("build-dependencies", DepType::Build),
];

/// Manager for Cargo.toml files
#[derive(Debug, Default)]
pub struct CargoManager;

impl CargoManager {
    pub fn new() -> Self {
        Self
    }
}

impl Manager for CargoManager {
    fn id(&self) -> ManagerId {
        ManagerId::Cargo
    }

    fn matches_file(&self, file_name: &str) -> bool {
        file_name == "Cargo.toml"
    }

    fn extract_package_file(
        &self,
        content: Option<&str>,
        file_name: &str,
    ) -> Option<ManagerExtractResult> {
        let manifest: Table = match toml::from_str(content?) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::debug!("{}: invalid TOML: {}", file_name, e);
                return None;
            }
        };

        let mut deps = Vec::new();
        collect_tables(&manifest, &mut deps);

        // Target-specific dependencies
        if let Some(targets) = manifest.get("target").and_then(Value::as_table) {
            for target_config in targets.values().filter_map(Value::as_table) {
                collect_tables(target_config, &mut deps);
            }
        }

        ManagerExtractResult::from_deps(deps)
    }

    fn artifacts(&self) -> Option<&dyn ArtifactStrategy> {
        Some(&CargoArtifacts)
    }
}

fn collect_tables(table: &Table, output: &mut Vec<DependencyDescriptor>) {
    for (section, dep_type) in DEPENDENCY_TABLES {
        if let Some(deps) = table.get(section).and_then(Value::as_table) {
            for (name, value) in deps {
                if let Some(dep) = parse_dependency(name, value) {
                    output.push(dep.with_dep_type(dep_type));
                }
            }
        }
    }
}

fn parse_dependency(name: &str, value: &Value) -> Option<DependencyDescriptor> {
    match value {
        // Simple string: package = "1.0.0"
        Value::String(version) => Some(DependencyDescriptor::new(
            name,
            version.clone(),
            DatasourceId::Crate,
        )),
        // Inline table: package = { version = "1.0.0", features = [...] }
        Value::Table(t) => {
            if t.contains_key("path") || t.contains_key("git") || t.contains_key("workspace") {
                tracing::debug!("skipping non-registry dependency {}", name);
                return None;
            }
            let version = t.get("version").and_then(Value::as_str)?;
            let dep = DependencyDescriptor::new(name, version, DatasourceId::Crate);
            match t.get("package").and_then(Value::as_str) {
                Some(package) if package != name => Some(dep.with_lookup_name(package)),
                _ => Some(dep),
            }
        }
        _ => None,
    }
}

/// Cargo.lock regeneration through `cargo update`
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoArtifacts;

impl ArtifactStrategy for CargoArtifacts {
    fn manager(&self) -> &'static str {
        ManagerId::Cargo.as_str()
    }

    fn lockfile_names(&self) -> &'static [&'static str] {
        &["Cargo.lock"]
    }

    fn tool(&self) -> ToolImage {
        ToolImage {
            tool: "rust",
            image: "rust",
            env_passthrough: &[],
        }
    }

    fn commands(&self, ctx: &CommandContext<'_>) -> Vec<ToolCommand> {
        let manifest = ctx.manifest.display().to_string();
        let update =
            || ToolCommand::new("cargo").args(["update", "--manifest-path", manifest.as_str()]);

        if ctx.config.update_type.is_lockfile_maintenance() {
            return vec![update()];
        }
        // Renamed dependencies are known to Cargo.lock by their real name
        ctx.config
            .updated_deps
            .iter()
            .map(|dep| update().args(["--package", dep.package_name()]))
            .collect()
    }
}
