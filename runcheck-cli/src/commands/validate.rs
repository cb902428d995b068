//! Validate command handler
//!
//! Loads pipeline run manifests, validates each one and prints a report.

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use runcheck_core::domain::PipelineRun;
use runcheck_core::{FieldError, PipelineRunValidator, ValidationContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::config::Config;

const PIPELINE_RUN_KIND: &str = "PipelineRun";

/// Report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable, coloured
    Text,
    /// One JSON array with every result
    Json,
}

/// Outcome of validating one manifest document
#[derive(Debug, Serialize)]
pub struct ManifestReport {
    pub file: PathBuf,
    /// Zero-based position of the document within the file
    pub document: usize,
    pub name: String,
    pub valid: bool,
    pub errors: FieldError,
}

/// A pipeline run read from disk, with where it came from
#[derive(Debug)]
pub struct Manifest {
    pub file: PathBuf,
    pub document: usize,
    pub run: PipelineRun,
}

/// Handle the validate command
pub fn handle_validate_command(
    files: &[PathBuf],
    format: OutputFormat,
    delete: bool,
    config: &Config,
) -> Result<ExitCode> {
    let ctx = if delete {
        config.context.for_delete()
    } else {
        config.context
    };

    let mut manifests = Vec::new();
    for file in files {
        manifests.extend(load_manifests(file)?);
    }

    let reports = validate_manifests(&PipelineRunValidator::default(), &ctx, manifests);
    let rejected = reports.iter().filter(|report| !report.valid).count();
    info!(manifests = reports.len(), rejected, "validation finished");

    match format {
        OutputFormat::Text => print_text(&reports),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    Ok(if rejected == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Reads every pipeline run document in a file
///
/// JSON files parse as single YAML documents. Empty documents and documents
/// of another kind are skipped.
pub fn load_manifests(path: &Path) -> Result<Vec<Manifest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    let mut manifests = Vec::new();
    for (document, deserializer) in serde_yaml::Deserializer::from_str(&content).enumerate() {
        let value = serde_yaml::Value::deserialize(deserializer).with_context(|| {
            format!(
                "Failed to parse document {} of {}",
                document,
                path.display()
            )
        })?;
        if value.is_null() {
            continue;
        }

        let kind = value.get("kind").and_then(serde_yaml::Value::as_str);
        if kind.is_some_and(|kind| kind != PIPELINE_RUN_KIND) {
            warn!(file = %path.display(), document, kind, "skipping non-PipelineRun document");
            continue;
        }

        let run: PipelineRun = serde_yaml::from_value(value).with_context(|| {
            format!(
                "Document {} of {} is not a pipeline run",
                document,
                path.display()
            )
        })?;
        manifests.push(Manifest {
            file: path.to_path_buf(),
            document,
            run,
        });
    }

    Ok(manifests)
}

/// Validates each manifest, keeping input order
pub fn validate_manifests(
    validator: &PipelineRunValidator,
    ctx: &ValidationContext,
    manifests: Vec<Manifest>,
) -> Vec<ManifestReport> {
    manifests
        .into_iter()
        .map(|manifest| {
            let errors = validator.validate_run(ctx, &manifest.run);
            ManifestReport {
                file: manifest.file,
                document: manifest.document,
                name: display_name(&manifest.run),
                valid: errors.is_empty(),
                errors,
            }
        })
        .collect()
}

fn display_name(run: &PipelineRun) -> String {
    if !run.metadata.name.is_empty() {
        run.metadata.name.clone()
    } else if !run.metadata.generate_name.is_empty() {
        format!("{}*", run.metadata.generate_name)
    } else {
        "<unnamed>".to_string()
    }
}

fn print_text(reports: &[ManifestReport]) {
    if reports.is_empty() {
        println!("{}", "No pipeline runs found.".yellow());
        return;
    }

    for report in reports {
        let location = format!("{}#{}", report.file.display(), report.document);
        if report.valid {
            println!(
                "{} {} {}",
                "✓".green().bold(),
                report.name.bold(),
                location.dimmed()
            );
            continue;
        }

        println!(
            "{} {} {}",
            "✗".red().bold(),
            report.name.bold(),
            location.dimmed()
        );
        for line in report.errors.to_string().lines() {
            println!("    {}", line.red());
        }
    }

    let rejected = reports.iter().filter(|report| !report.valid).count();
    println!();
    if rejected == 0 {
        println!(
            "{}",
            format!("All {} pipeline run(s) valid", reports.len())
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!("{} of {} pipeline run(s) rejected", rejected, reports.len())
                .red()
                .bold()
        );
    }
}
