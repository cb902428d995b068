//! Admission validation
//!
//! Validators inspect a resource and return a [`FieldError`](crate::FieldError)
//! describing every problem found, with paths relative to the value they were
//! given. Callers re-root the result when embedding it in a larger object.
//!
//! All validators are trait-based so that collaborators can be swapped out.

mod feature;
mod metadata;
mod pipeline;
mod pipeline_run;
mod workspace;

// Re-export traits
pub use metadata::MetadataValidator;
pub use pipeline::PipelineSpecValidator;
pub use workspace::WorkspaceBindingValidator;

// Re-export implementations
pub use metadata::StandardMetadataValidator;
pub use pipeline::StandardPipelineSpecValidator;
pub use pipeline_run::PipelineRunValidator;
pub use workspace::StandardWorkspaceBindingValidator;

pub use feature::validate_enabled_api_fields;
pub use metadata::{MAX_NAME_LENGTH, is_dns1123_label, is_dns1123_subdomain};
pub use pipeline_run::validate_pipeline_run;
pub use workspace::VOLUME_SOURCE_FIELDS;
