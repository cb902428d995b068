//! Runcheck Core
//!
//! Admission validation for pipeline runs.
//!
//! This crate contains:
//! - Domain types: the pipeline run resource and what it embeds
//! - Configuration: feature flags and defaults consulted during validation
//! - Validation: the checks themselves, reported as a [`FieldError`]

pub mod config;
pub mod domain;
pub mod field_error;
pub mod reference;
pub mod validation;

pub use config::{ApiFields, ValidationContext};
pub use field_error::{ErrorKind, FieldError, FieldIssue};
pub use validation::{PipelineRunValidator, validate_pipeline_run};
