//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod context;
mod validate;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate pipeline run manifests
    Validate {
        /// Manifest files (YAML or JSON, multiple YAML documents allowed)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = validate::OutputFormat::Text)]
        format: validate::OutputFormat,

        /// Validate as part of a delete request
        #[arg(long)]
        delete: bool,
    },
    /// Print the effective validation settings
    Context,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module. The exit code is
/// failure when any manifest is rejected.
pub fn handle_command(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Validate {
            files,
            format,
            delete,
        } => validate::handle_validate_command(&files, format, delete, config),
        Commands::Context => {
            context::print_context(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
