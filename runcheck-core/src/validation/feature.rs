//! Feature gate checks

use crate::config::{ApiFields, ValidationContext};
use crate::field_error::FieldError;

/// Requires the active API tier to permit `wanted`
///
/// The returned error has no path; callers re-root it at the gated field.
pub fn validate_enabled_api_fields(
    ctx: &ValidationContext,
    feature: &str,
    wanted: ApiFields,
) -> FieldError {
    let current = ctx.api_fields();
    if current.permits(wanted) {
        return FieldError::new();
    }
    FieldError::feature_not_enabled(feature_gate_message(feature, wanted, current))
}

pub(crate) fn feature_gate_message(feature: &str, wanted: ApiFields, current: ApiFields) -> String {
    format!(
        "{} requires \"enable-api-fields\" feature gate to be {:?} but it is {:?}",
        feature,
        wanted.as_str(),
        current.as_str()
    )
}
