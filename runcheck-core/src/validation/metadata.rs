//! Object metadata checks

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::ObjectMeta;
use crate::field_error::FieldError;

/// Longest resource name accepted
pub const MAX_NAME_LENGTH: usize = 63;

static DNS1123_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());
static DNS1123_SUBDOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

/// Returns `true` for a lowercase RFC 1123 label of at most 63 characters
pub fn is_dns1123_label(value: &str) -> bool {
    value.len() <= 63 && DNS1123_LABEL_RE.is_match(value)
}

/// Returns `true` for a lowercase RFC 1123 subdomain of at most 253 characters
pub fn is_dns1123_subdomain(value: &str) -> bool {
    value.len() <= 253 && DNS1123_SUBDOMAIN_RE.is_match(value)
}

/// Validates resource metadata
pub trait MetadataValidator: Send + Sync {
    fn validate(&self, meta: &ObjectMeta) -> FieldError;
}

/// Standard implementation of MetadataValidator
///
/// Names must be DNS subdomains no longer than [`MAX_NAME_LENGTH`]. When no
/// name is set yet, `generateName` must be a usable prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMetadataValidator;

impl MetadataValidator for StandardMetadataValidator {
    fn validate(&self, meta: &ObjectMeta) -> FieldError {
        if !meta.name.is_empty() {
            return validate_name(&meta.name, "name");
        }
        if !meta.generate_name.is_empty() {
            // A generated suffix is appended, so a trailing dash is fine.
            let prefix = format!("{}x", meta.generate_name);
            if !is_dns1123_subdomain(&prefix) {
                return FieldError::invalid_value(
                    format!(
                        "{:?} is not a valid resource name prefix",
                        meta.generate_name
                    ),
                    "generateName",
                );
            }
            return FieldError::new();
        }
        FieldError::missing_one_of(&["name", "generateName"])
    }
}

fn validate_name(name: &str, path: &str) -> FieldError {
    if !is_dns1123_subdomain(name) {
        return FieldError::generic(
            format!("invalid resource name {:?}: must be a valid DNS label", name),
            path,
        );
    }
    if name.len() > MAX_NAME_LENGTH {
        return FieldError::generic(
            format!(
                "Invalid resource name: length must be no more than {} characters",
                MAX_NAME_LENGTH
            ),
            path,
        );
    }
    FieldError::new()
}
