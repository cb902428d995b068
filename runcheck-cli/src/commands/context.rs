//! Context command handler

use anyhow::Result;
use colored::*;

use crate::config::Config;

/// Prints the effective validation context as JSON
pub fn print_context(config: &Config) -> Result<()> {
    if let Some(source) = &config.source {
        eprintln!("{} {}", "Settings from".dimmed(), source.display());
    }
    println!("{}", serde_json::to_string_pretty(&config.context)?);
    Ok(())
}
