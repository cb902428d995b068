//! Workspace binding checks

use crate::config::ValidationContext;
use crate::domain::WorkspaceBinding;
use crate::field_error::FieldError;

/// Volume source fields of a binding, in wire spelling
pub const VOLUME_SOURCE_FIELDS: [&str; 5] = [
    "persistentVolumeClaim",
    "volumeClaimTemplate",
    "emptyDir",
    "configMap",
    "secret",
];

/// Validates a single workspace binding
pub trait WorkspaceBindingValidator: Send + Sync {
    fn validate(&self, ctx: &ValidationContext, binding: &WorkspaceBinding) -> FieldError;
}

/// Standard implementation of WorkspaceBindingValidator
///
/// A binding needs exactly one volume source, and the source must name the
/// object backing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardWorkspaceBindingValidator;

impl WorkspaceBindingValidator for StandardWorkspaceBindingValidator {
    fn validate(&self, _ctx: &ValidationContext, binding: &WorkspaceBinding) -> FieldError {
        if binding.is_empty() {
            return FieldError::missing_field("");
        }

        match binding.source_count() {
            0 => return FieldError::missing_one_of(&VOLUME_SOURCE_FIELDS),
            1 => {}
            _ => return FieldError::multiple_one_of(&VOLUME_SOURCE_FIELDS),
        }

        if binding
            .persistent_volume_claim
            .as_ref()
            .is_some_and(|pvc| pvc.claim_name.is_empty())
        {
            return FieldError::missing_field("persistentVolumeClaim.claimName");
        }
        if binding
            .config_map
            .as_ref()
            .is_some_and(|cm| cm.name.is_empty())
        {
            return FieldError::missing_field("configMap.name");
        }
        if binding
            .secret
            .as_ref()
            .is_some_and(|secret| secret.secret_name.is_empty())
        {
            return FieldError::missing_field("secret.secretName");
        }

        FieldError::new()
    }
}
