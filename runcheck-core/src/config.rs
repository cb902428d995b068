//! Validation configuration
//!
//! Feature flags and defaults that shape what a valid run looks like. A
//! [`ValidationContext`] is built by the caller and passed into every
//! validation call; nothing here is process-global.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::Duration;

/// Key enabling pipeline references to OCI bundles
pub const ENABLE_OCI_BUNDLES_KEY: &str = "enable-tekton-oci-bundles";

/// Key selecting the active API stability tier
pub const ENABLE_API_FIELDS_KEY: &str = "enable-api-fields";

/// Key holding the default pipeline timeout, in minutes
pub const DEFAULT_TIMEOUT_MINUTES_KEY: &str = "default-timeout-minutes";

/// Default pipeline timeout when none is configured
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 60;

/// Errors raised while reading configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: expected \"true\" or \"false\"")]
    InvalidBool { key: String, value: String },

    #[error("invalid value {0:?} for enable-api-fields: expected \"stable\", \"beta\" or \"alpha\"")]
    InvalidApiFields(String),

    #[error("invalid value {value:?} for {key}: expected a whole number")]
    InvalidNumber { key: String, value: String },
}

/// API stability tier
///
/// Tiers are ordered: `alpha` enables everything `beta` does, which enables
/// everything `stable` does.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ApiFields {
    #[default]
    Stable,
    Beta,
    Alpha,
}

impl ApiFields {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFields::Stable => "stable",
            ApiFields::Beta => "beta",
            ApiFields::Alpha => "alpha",
        }
    }

    /// Returns `true` if fields gated at `required` are usable under `self`
    pub fn permits(&self, required: ApiFields) -> bool {
        *self >= required
    }
}

impl fmt::Display for ApiFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiFields {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(ApiFields::Stable),
            "beta" => Ok(ApiFields::Beta),
            "alpha" => Ok(ApiFields::Alpha),
            _ => Err(ConfigError::InvalidApiFields(s.to_string())),
        }
    }
}

/// Feature switches consulted during validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub enable_tekton_oci_bundles: bool,
    pub enable_api_fields: ApiFields,
}

impl FeatureFlags {
    /// Reads flags from a key/value map; absent keys keep their defaults
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut flags = Self::default();

        if let Some(value) = map.get(ENABLE_OCI_BUNDLES_KEY) {
            flags.enable_tekton_oci_bundles = parse_bool(ENABLE_OCI_BUNDLES_KEY, value)?;
        }
        if let Some(value) = map.get(ENABLE_API_FIELDS_KEY) {
            flags.enable_api_fields = value.parse()?;
        }

        Ok(flags)
    }
}

/// Default values applied when a run leaves a field unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    pub default_timeout_minutes: u64,
}

impl Defaults {
    /// Reads defaults from a key/value map; absent keys keep their defaults
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut defaults = Self::default();

        if let Some(value) = map.get(DEFAULT_TIMEOUT_MINUTES_KEY) {
            defaults.default_timeout_minutes =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        key: DEFAULT_TIMEOUT_MINUTES_KEY.to_string(),
                        value: value.clone(),
                    })?;
        }

        Ok(defaults)
    }

    /// Default pipeline timeout as a duration
    pub fn default_timeout(&self) -> Duration {
        Duration::from_minutes(i64::try_from(self.default_timeout_minutes).unwrap_or(i64::MAX))
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            default_timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
        }
    }
}

/// Ambient configuration for one validation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    pub feature_flags: FeatureFlags,
    pub defaults: Defaults,

    /// Set when the object is being deleted
    #[serde(default)]
    pub in_delete: bool,
}

impl ValidationContext {
    /// Creates a context with default flags and defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a flat key/value map, as stored in config maps
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            feature_flags: FeatureFlags::from_map(map)?,
            defaults: Defaults::from_map(map)?,
            in_delete: false,
        })
    }

    pub fn with_api_fields(mut self, api_fields: ApiFields) -> Self {
        self.feature_flags.enable_api_fields = api_fields;
        self
    }

    pub fn with_oci_bundles(mut self, enabled: bool) -> Self {
        self.feature_flags.enable_tekton_oci_bundles = enabled;
        self
    }

    pub fn with_default_timeout_minutes(mut self, minutes: u64) -> Self {
        self.defaults.default_timeout_minutes = minutes;
        self
    }

    /// Marks the context as belonging to a delete request
    pub fn for_delete(mut self) -> Self {
        self.in_delete = true;
        self
    }

    pub fn is_in_delete(&self) -> bool {
        self.in_delete
    }

    pub fn api_fields(&self) -> ApiFields {
        self.feature_flags.enable_api_fields
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
