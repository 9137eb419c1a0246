//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Release listings, newest first, with the latest stable version highlighted
//! - Extracted dependencies aligned by name
//! - Artifact outcomes with the tool diagnostic on failure

use crate::domain::{ArtifactOutcome, DatasourceId, DepType, ManagerExtractResult, ReleaseResult};
use crate::orchestrator::Report;
use crate::output::{OutputFormatter, Verbosity};
use crate::versioning::Versioning;
use colored::Colorize;
use std::io::Write;
use std::path::Path;

/// Releases listed at normal verbosity
const RELEASES_SHOWN: usize = 10;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn format_lookup(
        &self,
        datasource: &str,
        package: &str,
        result: Option<&ReleaseResult>,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let Some(result) = result else {
            return writeln!(writer, "{}: not found in {}", package, datasource);
        };

        let versioning = datasource
            .parse::<DatasourceId>()
            .map(Versioning::for_datasource)
            .unwrap_or(Versioning::Loose);
        let mut releases = result.releases.clone();
        versioning.sort_releases(&mut releases);
        let latest = versioning
            .latest_stable(&releases)
            .map(|r| r.version.clone());

        if self.verbosity == Verbosity::Quiet {
            if let Some(latest) = &latest {
                writeln!(writer, "{}", latest)?;
            }
            return Ok(());
        }

        let latest_display = latest.as_deref().unwrap_or("-");
        if self.color {
            writeln!(
                writer,
                "{} {}: {} releases, latest {}",
                package.bold(),
                format!("({})", datasource).dimmed(),
                releases.len(),
                latest_display.green().bold()
            )?;
        } else {
            writeln!(
                writer,
                "{} ({}): {} releases, latest {}",
                package,
                datasource,
                releases.len(),
                latest_display
            )?;
        }

        for (label, value) in [("homepage", &result.homepage), ("source", &result.source_url)] {
            if let Some(value) = value {
                writeln!(writer, "  {}: {}", label, value)?;
            }
        }
        for (tag, version) in &result.tags {
            writeln!(writer, "  tag {}: {}", tag, version)?;
        }

        let shown = match self.verbosity {
            Verbosity::Verbose => releases.len(),
            _ => RELEASES_SHOWN.min(releases.len()),
        };
        let width = releases
            .iter()
            .rev()
            .take(shown)
            .map(|r| r.version.len())
            .max()
            .unwrap_or(0);
        for release in releases.iter().rev().take(shown) {
            let date = release
                .release_timestamp
                .map(|d| format!(" ({})", d.format("%Y/%m/%d")))
                .unwrap_or_default();
            let deprecated = if release.deprecated() {
                " [deprecated]"
            } else {
                ""
            };
            if self.color {
                let version = format!("{:width$}", release.version, width = width);
                let version = if latest.as_deref() == Some(release.version.as_str()) {
                    version.green().to_string()
                } else if release.deprecated() {
                    version.dimmed().to_string()
                } else {
                    version
                };
                writeln!(
                    writer,
                    "  {}{}{}",
                    version,
                    date.dimmed(),
                    deprecated.red()
                )?;
            } else {
                writeln!(
                    writer,
                    "  {:width$}{}{}",
                    release.version,
                    date,
                    deprecated,
                    width = width
                )?;
            }
        }
        if shown < releases.len() {
            writeln!(writer, "  ... {} older", releases.len() - shown)?;
        }
        Ok(())
    }

    fn format_extract(
        &self,
        file: &Path,
        manager: &str,
        result: Option<&ManagerExtractResult>,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let deps = result.map(|r| r.deps.as_slice()).unwrap_or_default();

        if self.verbosity != Verbosity::Quiet {
            let path_display = file.display().to_string();
            let count = format!(
                "{} {}",
                deps.len(),
                if deps.len() == 1 {
                    "dependency"
                } else {
                    "dependencies"
                }
            );
            if self.color {
                writeln!(
                    writer,
                    "{} {}: {}",
                    path_display.bold(),
                    format!("({})", manager).dimmed(),
                    count
                )?;
            } else {
                writeln!(writer, "{} ({}): {}", path_display, manager, count)?;
            }
        }

        let width = deps.iter().map(|d| d.dep_name.len()).max().unwrap_or(0);
        for dep in deps {
            let mut notes = vec![dep.datasource.to_string()];
            if dep.dep_type != DepType::Normal {
                notes.push(dep.dep_type.label().to_string());
            }
            if dep.is_renamed() {
                notes.push(format!("package {}", dep.package_name()));
            }
            if self.verbosity == Verbosity::Verbose {
                notes.extend(dep.registry_urls.iter().cloned());
            }
            let notes = notes.join(", ");

            if self.color {
                let name = format!("{:width$}", dep.dep_name, width = width);
                writeln!(
                    writer,
                    "  {} {} {}",
                    name,
                    dep.current_value.bright_white(),
                    format!("[{}]", notes).dimmed()
                )?;
            } else {
                writeln!(
                    writer,
                    "  {:width$} {} [{}]",
                    dep.dep_name,
                    dep.current_value,
                    notes,
                    width = width
                )?;
            }
        }
        Ok(())
    }

    fn format_artifacts(
        &self,
        manifest: &Path,
        outcome: &ArtifactOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let manifest = manifest.display().to_string();
        match outcome {
            ArtifactOutcome::NoOp => {
                if self.verbosity != Verbosity::Quiet {
                    writeln!(writer, "{}: lockfile unchanged", manifest)?;
                }
            }
            ArtifactOutcome::Updated { lockfiles } => {
                for lockfile in lockfiles {
                    let path = lockfile.path.display().to_string();
                    if self.color {
                        writeln!(writer, "{}: updated {}", manifest, path.green())?;
                    } else {
                        writeln!(writer, "{}: updated {}", manifest, path)?;
                    }
                    if self.verbosity == Verbosity::Verbose {
                        writeln!(writer, "  {} bytes", lockfile.contents.len())?;
                    }
                }
            }
            ArtifactOutcome::Failed(failure) => {
                let headline = format!(
                    "{}: failed to update {}",
                    manifest,
                    failure.lockfile.display()
                );
                if self.color {
                    writeln!(writer, "{}", headline.red().bold())?;
                } else {
                    writeln!(writer, "{}", headline)?;
                }
                for line in failure.diagnostic.lines() {
                    writeln!(writer, "  {}", line)?;
                }
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &Report, writer: &mut dyn Write) -> std::io::Result<()> {
        match report {
            Report::Lookup {
                datasource,
                package,
                result,
            } => self.format_lookup(datasource, package, result.as_ref(), writer),
            Report::Extract {
                file,
                manager,
                result,
            } => self.format_extract(file, manager.as_str(), result.as_ref(), writer),
            Report::Artifacts { manifest, outcome } => {
                self.format_artifacts(manifest, outcome, writer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyDescriptor, LockfileUpdate, ReleaseRecord};
    use crate::manager::ManagerId;
    use std::path::PathBuf;

    fn render(verbosity: Verbosity, report: &Report) -> String {
        let mut buffer = Vec::new();
        TextFormatter::with_color(verbosity, false)
            .format(report, &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn lookup(result: Option<ReleaseResult>) -> Report {
        Report::Lookup {
            datasource: "crate".to_string(),
            package: "serde".to_string(),
            result,
        }
    }

    fn releases() -> ReleaseResult {
        ReleaseResult::new(vec![
            ReleaseRecord::new("1.0.10"),
            ReleaseRecord::new("1.0.9"),
            ReleaseRecord::new("1.1.0-beta.1"),
            ReleaseRecord::new("0.9.0").with_deprecated(true),
        ])
        .with_homepage(Some("https://serde.rs".to_string()))
    }

    #[test]
    fn test_lookup_lists_newest_first() {
        let output = render(Verbosity::Normal, &lookup(Some(releases())));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "serde (crate): 4 releases, latest 1.0.10");
        assert_eq!(lines[1], "  homepage: https://serde.rs");
        assert!(lines[2].starts_with("  1.1.0-beta.1"));
        assert!(lines[3].starts_with("  1.0.10"));
        assert!(lines[5].contains("[deprecated]"));
    }

    #[test]
    fn test_lookup_quiet_prints_latest_only() {
        let output = render(Verbosity::Quiet, &lookup(Some(releases())));
        assert_eq!(output, "1.0.10\n");
    }

    #[test]
    fn test_lookup_not_found() {
        let output = render(Verbosity::Normal, &lookup(None));
        assert_eq!(output, "serde: not found in crate\n");
    }

    #[test]
    fn test_lookup_truncates_long_lists() {
        let many: Vec<ReleaseRecord> = (0..15)
            .map(|i| ReleaseRecord::new(format!("1.0.{}", i)))
            .collect();
        let output = render(Verbosity::Normal, &lookup(Some(ReleaseResult::new(many))));
        assert!(output.contains("  1.0.14"));
        assert!(!output.contains("  1.0.4\n"));
        assert!(output.contains("... 5 older"));

        let many: Vec<ReleaseRecord> = (0..15)
            .map(|i| ReleaseRecord::new(format!("1.0.{}", i)))
            .collect();
        let output = render(Verbosity::Verbose, &lookup(Some(ReleaseResult::new(many))));
        assert!(!output.contains("older"));
    }

    #[test]
    fn test_extract_lists_dependencies() {
        let report = Report::Extract {
            file: PathBuf::from("Cargo.toml"),
            manager: ManagerId::Cargo,
            result: ManagerExtractResult::from_deps(vec![
                DependencyDescriptor::new("serde", "1.0", DatasourceId::Crate),
                DependencyDescriptor::new("tempfile", "3", DatasourceId::Crate)
                    .with_dep_type(DepType::Dev),
                DependencyDescriptor::new("json", "1", DatasourceId::Crate)
                    .with_lookup_name("serde_json"),
            ]),
        };
        let output = render(Verbosity::Normal, &report);

        assert!(output.starts_with("Cargo.toml (cargo): 3 dependencies\n"));
        assert!(output.contains("  serde    1.0 [crate]\n"));
        assert!(output.contains("  tempfile 3 [crate, dev]\n"));
        assert!(output.contains("  json     1 [crate, package serde_json]\n"));
    }

    #[test]
    fn test_extract_nothing_found() {
        let report = Report::Extract {
            file: PathBuf::from("go.mod"),
            manager: ManagerId::Gomod,
            result: None,
        };
        assert_eq!(
            render(Verbosity::Normal, &report),
            "go.mod (gomod): 0 dependencies\n"
        );
    }

    #[test]
    fn test_artifacts_outcomes() {
        let no_op = Report::Artifacts {
            manifest: PathBuf::from("Cargo.toml"),
            outcome: ArtifactOutcome::NoOp,
        };
        assert_eq!(
            render(Verbosity::Normal, &no_op),
            "Cargo.toml: lockfile unchanged\n"
        );
        assert_eq!(render(Verbosity::Quiet, &no_op), "");

        let updated = Report::Artifacts {
            manifest: PathBuf::from("crates/one/Cargo.toml"),
            outcome: ArtifactOutcome::Updated {
                lockfiles: vec![LockfileUpdate {
                    path: PathBuf::from("Cargo.lock"),
                    contents: "New Cargo.lock".to_string(),
                }],
            },
        };
        assert_eq!(
            render(Verbosity::Normal, &updated),
            "crates/one/Cargo.toml: updated Cargo.lock\n"
        );

        let failed = Report::Artifacts {
            manifest: PathBuf::from("go.mod"),
            outcome: ArtifactOutcome::failed("go.sum", "go: missing module\nexit status 1"),
        };
        assert_eq!(
            render(Verbosity::Normal, &failed),
            "go.mod: failed to update go.sum\n  go: missing module\n  exit status 1\n"
        );
    }
}
