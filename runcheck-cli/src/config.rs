//! Configuration module
//!
//! Builds the validation context from an optional settings file, then
//! applies flags (or their environment variables) on top.

use anyhow::{Context, Result, bail};
use clap::Args;
use runcheck_core::config::{
    ApiFields, DEFAULT_TIMEOUT_MINUTES_KEY, ENABLE_API_FIELDS_KEY, ENABLE_OCI_BUNDLES_KEY,
};
use runcheck_core::ValidationContext;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Flags shaping the validation context
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Settings file: a flat YAML map using the feature-flag key names
    #[arg(long, global = true, env = "RUNCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// API stability tier (stable, beta or alpha)
    #[arg(long, global = true, env = "RUNCHECK_ENABLE_API_FIELDS")]
    pub enable_api_fields: Option<ApiFields>,

    /// Allow pipeline references to OCI bundles
    #[arg(long, global = true, env = "RUNCHECK_ENABLE_OCI_BUNDLES")]
    pub enable_oci_bundles: Option<bool>,

    /// Default pipeline timeout, in minutes
    #[arg(long, global = true, env = "RUNCHECK_DEFAULT_TIMEOUT_MINUTES")]
    pub default_timeout_minutes: Option<u64>,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Context every manifest is validated against
    pub context: ValidationContext,

    /// Settings file the context was read from, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Resolves the effective configuration
    ///
    /// Values from the settings file are overridden by flags and
    /// environment variables.
    pub fn load(args: &ContextArgs) -> Result<Self> {
        let mut context = match &args.config {
            Some(path) => ValidationContext::from_map(&read_settings(path)?)
                .with_context(|| format!("Invalid settings in {}", path.display()))?,
            None => ValidationContext::new(),
        };

        if let Some(api_fields) = args.enable_api_fields {
            context = context.with_api_fields(api_fields);
        }
        if let Some(enabled) = args.enable_oci_bundles {
            context = context.with_oci_bundles(enabled);
        }
        if let Some(minutes) = args.default_timeout_minutes {
            context = context.with_default_timeout_minutes(minutes);
        }

        debug!(
            api_fields = %context.api_fields(),
            oci_bundles = context.feature_flags.enable_tekton_oci_bundles,
            default_timeout_minutes = context.defaults.default_timeout_minutes,
            "resolved validation context"
        );

        Ok(Self {
            context,
            source: args.config.clone(),
        })
    }
}

/// Reads a flat YAML map of settings into key/value strings
fn read_settings(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    let raw: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

    let mut settings = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let value = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            other => bail!("Setting {} must be a scalar, got {:?}", key, other),
        };
        settings.insert(key, value);
    }

    for key in settings.keys() {
        if ![
            ENABLE_OCI_BUNDLES_KEY,
            ENABLE_API_FIELDS_KEY,
            DEFAULT_TIMEOUT_MINUTES_KEY,
        ]
        .contains(&key.as_str())
        {
            warn!(key = %key, file = %path.display(), "ignoring unknown setting");
        }
    }

    Ok(settings)
}
