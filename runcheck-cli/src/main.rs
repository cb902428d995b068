//! Runcheck CLI
//!
//! Command-line interface for validating pipeline run manifests before they
//! are submitted.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Commands, handle_command};
use config::{Config, ContextArgs};

#[derive(Parser)]
#[command(name = "runcheck")]
#[command(about = "Admission checks for pipeline run manifests", long_about = None)]
struct Cli {
    #[command(flatten)]
    context: ContextArgs,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<ExitCode> {
    // Logs go to stderr so reports on stdout stay machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runcheck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.context)?;

    handle_command(cli.command, &config)
}
