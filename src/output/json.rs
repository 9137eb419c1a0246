//! JSON output formatter for machine processing

use crate::domain::{ArtifactOutcome, DependencyDescriptor, ReleaseResult};
use crate::orchestrator::Report;
use crate::output::OutputFormatter;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self
    }
}

/// JSON representation of a report
#[derive(Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum JsonReport<'a> {
    Lookup {
        datasource: &'a str,
        package: &'a str,
        /// `null` when the package does not exist
        result: Option<&'a ReleaseResult>,
    },
    Extract {
        file: String,
        manager: &'a str,
        deps: &'a [DependencyDescriptor],
    },
    Artifacts {
        manifest: String,
        #[serde(flatten)]
        outcome: &'a ArtifactOutcome,
    },
}

impl<'a> From<&'a Report> for JsonReport<'a> {
    fn from(report: &'a Report) -> Self {
        match report {
            Report::Lookup {
                datasource,
                package,
                result,
            } => JsonReport::Lookup {
                datasource,
                package,
                result: result.as_ref(),
            },
            Report::Extract {
                file,
                manager,
                result,
            } => JsonReport::Extract {
                file: file.display().to_string(),
                manager: manager.as_str(),
                deps: result
                    .as_ref()
                    .map(|r| r.deps.as_slice())
                    .unwrap_or_default(),
            },
            Report::Artifacts { manifest, outcome } => JsonReport::Artifacts {
                manifest: manifest.display().to_string(),
                outcome,
            },
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &Report, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&JsonReport::from(report))
            .map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}
