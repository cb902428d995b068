//! Pipeline run admission checks
//!
//! [`PipelineRunValidator`] decides whether a run may be admitted. Every
//! check runs and contributes to one [`FieldError`]; the only early return
//! is for runs that are being deleted.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::feature::{feature_gate_message, validate_enabled_api_fields};
use super::metadata::{MetadataValidator, StandardMetadataValidator};
use super::pipeline::{PipelineSpecValidator, StandardPipelineSpecValidator};
use super::workspace::{StandardWorkspaceBindingValidator, WorkspaceBindingValidator};
use crate::config::{ApiFields, ValidationContext};
use crate::domain::{
    Duration, PipelineRef, PipelineRun, PipelineRunSpec, PipelineRunSpecStatus, TimeoutFields,
    WorkspaceBinding,
};
use crate::field_error::FieldError;
use crate::reference::{ReferenceParser, StandardReferenceParser};

/// Validates pipeline runs against a [`ValidationContext`]
///
/// Metadata, inline pipelines, workspace bindings and bundle references are
/// checked by pluggable collaborators; [`PipelineRunValidator::default`]
/// wires in the standard ones.
#[derive(Clone)]
pub struct PipelineRunValidator {
    metadata: Arc<dyn MetadataValidator>,
    pipeline_spec: Arc<dyn PipelineSpecValidator>,
    workspace: Arc<dyn WorkspaceBindingValidator>,
    reference_parser: Arc<dyn ReferenceParser>,
}

impl PipelineRunValidator {
    pub fn new(
        metadata: Arc<dyn MetadataValidator>,
        pipeline_spec: Arc<dyn PipelineSpecValidator>,
        workspace: Arc<dyn WorkspaceBindingValidator>,
        reference_parser: Arc<dyn ReferenceParser>,
    ) -> Self {
        Self {
            metadata,
            pipeline_spec,
            workspace,
            reference_parser,
        }
    }

    pub fn with_metadata_validator(mut self, validator: Arc<dyn MetadataValidator>) -> Self {
        self.metadata = validator;
        self
    }

    pub fn with_pipeline_spec_validator(
        mut self,
        validator: Arc<dyn PipelineSpecValidator>,
    ) -> Self {
        self.pipeline_spec = validator;
        self
    }

    pub fn with_workspace_validator(
        mut self,
        validator: Arc<dyn WorkspaceBindingValidator>,
    ) -> Self {
        self.workspace = validator;
        self
    }

    pub fn with_reference_parser(mut self, parser: Arc<dyn ReferenceParser>) -> Self {
        self.reference_parser = parser;
        self
    }

    /// Validates a whole run: metadata, lifecycle state and spec
    ///
    /// Spec findings are reported under `spec`, metadata findings under
    /// `metadata`. Runs being deleted are always accepted.
    pub fn validate_run(&self, ctx: &ValidationContext, run: &PipelineRun) -> FieldError {
        if ctx.is_in_delete() {
            debug!(name = %run.metadata.name, "run is being deleted, skipping validation");
            return FieldError::new();
        }

        let mut errs = self.metadata.validate(&run.metadata).via_field("metadata");

        if run.is_pending() && run.has_started() {
            errs.merge(FieldError::invalid_value(
                "PipelineRun cannot be Pending after it is started",
                "spec.status",
            ));
        }

        errs.merge(self.validate_spec(ctx, &run.spec).via_field("spec"));

        debug!(
            name = %run.metadata.name,
            issues = errs.len(),
            "validated pipeline run"
        );
        errs
    }

    /// Validates a run spec; paths are relative to the spec
    pub fn validate_spec(&self, ctx: &ValidationContext, spec: &PipelineRunSpec) -> FieldError {
        let mut errs = validate_pipeline_source(spec);

        if let Some(pipeline_ref) = &spec.pipeline_ref {
            errs.merge(self.validate_bundle(ctx, pipeline_ref));
        }

        if let Some(pipeline_spec) = &spec.pipeline_spec {
            errs.merge(
                self.pipeline_spec
                    .validate(ctx, pipeline_spec)
                    .via_field("pipelineSpec"),
            );
        }

        if let Some(timeout) = spec.timeout.filter(Duration::is_negative) {
            errs.merge(FieldError::invalid_value(
                format!("{} should be >= 0", timeout),
                "timeout",
            ));
        }

        if let Some(timeouts) = &spec.timeouts {
            errs.merge(validate_timeouts(ctx, spec.timeout.is_some(), timeouts));
        }

        errs.merge(validate_spec_status(ctx, &spec.status));
        errs.merge(self.validate_workspaces(ctx, &spec.workspaces));
        errs
    }

    /// Bundles are only usable behind the OCI bundle flag, and must parse
    fn validate_bundle(&self, ctx: &ValidationContext, pipeline_ref: &PipelineRef) -> FieldError {
        if pipeline_ref.bundle.is_empty() {
            return FieldError::new();
        }
        if !ctx.feature_flags.enable_tekton_oci_bundles {
            return FieldError::disallowed_fields(&["pipelineRef.bundle"]);
        }

        let mut errs = FieldError::new();
        if pipeline_ref.name.is_empty() {
            errs.merge(FieldError::missing_field("pipelineRef.name"));
        }
        if let Err(err) = self.reference_parser.parse(&pipeline_ref.bundle) {
            errs.merge(
                FieldError::invalid_value("invalid bundle reference", "pipelineRef.bundle")
                    .with_details(err.to_string()),
            );
        }
        errs
    }

    /// Each binding is checked on its own; names must be unique
    fn validate_workspaces(
        &self,
        ctx: &ValidationContext,
        workspaces: &[WorkspaceBinding],
    ) -> FieldError {
        let mut errs = FieldError::new();
        let mut first_seen: HashMap<&str, usize> = HashMap::new();

        for (idx, ws) in workspaces.iter().enumerate() {
            errs.merge(
                self.workspace
                    .validate(ctx, ws)
                    .via_field_index("workspaces", idx),
            );

            let first = *first_seen.entry(ws.name.as_str()).or_insert(idx);
            if first != idx {
                errs.merge(
                    FieldError::generic(
                        format!(
                            "workspace {:?} provided by pipelinerun more than once, at index {} and {}",
                            ws.name, first, idx
                        ),
                        "name",
                    )
                    .via_field_index("workspaces", idx),
                );
            }
        }

        errs
    }
}

impl Default for PipelineRunValidator {
    fn default() -> Self {
        Self::new(
            Arc::new(StandardMetadataValidator),
            Arc::new(StandardPipelineSpecValidator),
            Arc::new(StandardWorkspaceBindingValidator),
            Arc::new(StandardReferenceParser),
        )
    }
}

/// Validates a run with the standard collaborators
pub fn validate_pipeline_run(ctx: &ValidationContext, run: &PipelineRun) -> FieldError {
    PipelineRunValidator::default().validate_run(ctx, run)
}

/// Exactly one of `pipelineRef` / `pipelineSpec`, and a named reference
fn validate_pipeline_source(spec: &PipelineRunSpec) -> FieldError {
    let mut errs = match (&spec.pipeline_ref, &spec.pipeline_spec) {
        (None, None) => FieldError::missing_one_of(&["pipelineRef", "pipelineSpec"]),
        (Some(_), Some(_)) => FieldError::multiple_one_of(&["pipelineRef", "pipelineSpec"]),
        _ => FieldError::new(),
    };

    if spec
        .pipeline_ref
        .as_ref()
        .is_some_and(|pipeline_ref| pipeline_ref.name.is_empty())
    {
        errs.merge(FieldError::missing_field("pipelineRef.name"));
    }

    errs
}

/// Structured timeouts: alpha-gated, non-negative, and within the overall
/// budget
///
/// The feature gate error does not stop the duration checks.
fn validate_timeouts(
    ctx: &ValidationContext,
    has_timeout: bool,
    timeouts: &TimeoutFields,
) -> FieldError {
    let mut errs = FieldError::new();

    if has_timeout {
        errs.merge(FieldError::disallowed_fields(&["timeout", "timeouts"]));
    }

    errs.merge(
        validate_enabled_api_fields(ctx, "timeouts", ApiFields::Alpha).via_field("timeouts"),
    );

    for (field, duration) in [
        ("tasks", timeouts.tasks),
        ("finally", timeouts.finally),
        ("pipeline", timeouts.pipeline),
    ] {
        if let Some(duration) = duration.filter(Duration::is_negative) {
            errs.merge(FieldError::invalid_value(
                format!("{} should be >= 0", duration),
                &format!("timeouts.{}", field),
            ));
        }
    }

    let (bound, suffix) = match timeouts.pipeline {
        Some(pipeline) => (pipeline, "should be <= pipeline duration"),
        None => (
            ctx.defaults.default_timeout(),
            "should be <= default timeout duration",
        ),
    };
    errs.merge(validate_timeout_bound(timeouts, bound, suffix));

    errs
}

fn validate_timeout_bound(timeouts: &TimeoutFields, bound: Duration, suffix: &str) -> FieldError {
    let mut errs = FieldError::new();

    if let Some(tasks) = timeouts.tasks.filter(|tasks| *tasks > bound) {
        errs.merge(FieldError::invalid_value(
            format!("{} {}", tasks, suffix),
            "timeouts.tasks",
        ));
    }
    if let Some(finally) = timeouts.finally.filter(|finally| *finally > bound) {
        errs.merge(FieldError::invalid_value(
            format!("{} {}", finally, suffix),
            "timeouts.finally",
        ));
    }

    if let (Some(tasks), Some(finally)) = (timeouts.tasks, timeouts.finally) {
        if tasks.saturating_add(finally) > bound {
            let message = format!("{} + {} {}", tasks, finally, suffix);
            errs.merge(FieldError::invalid_value(&message, "timeouts.tasks"));
            errs.merge(FieldError::invalid_value(&message, "timeouts.finally"));
        }
    }

    errs
}

/// Status must be in the enumeration; graceful termination needs alpha
///
/// Out-of-tier and unknown values are reported with the values that are
/// legal under the active tier.
fn validate_spec_status(ctx: &ValidationContext, status: &PipelineRunSpecStatus) -> FieldError {
    match status {
        PipelineRunSpecStatus::Unset
        | PipelineRunSpecStatus::Pending
        | PipelineRunSpecStatus::CancelledDeprecated => FieldError::new(),
        PipelineRunSpecStatus::Cancelled
        | PipelineRunSpecStatus::CancelledRunFinally
        | PipelineRunSpecStatus::StoppedRunFinally => {
            if ctx.api_fields().permits(ApiFields::Alpha) {
                return FieldError::new();
            }
            invalid_status(ctx, status).with_details(feature_gate_message(
                "graceful termination",
                ApiFields::Alpha,
                ctx.api_fields(),
            ))
        }
        PipelineRunSpecStatus::Unknown(_) => invalid_status(ctx, status),
    }
}

fn invalid_status(ctx: &ValidationContext, status: &PipelineRunSpecStatus) -> FieldError {
    let expected = if ctx.api_fields() == ApiFields::Alpha {
        format!(
            "{}, {}, {} or {}",
            PipelineRunSpecStatus::Cancelled,
            PipelineRunSpecStatus::CancelledRunFinally,
            PipelineRunSpecStatus::StoppedRunFinally,
            PipelineRunSpecStatus::Pending
        )
    } else {
        format!(
            "{} or {}",
            PipelineRunSpecStatus::CancelledDeprecated,
            PipelineRunSpecStatus::Pending
        )
    };
    FieldError::invalid_value(format!("{} should be {}", status, expected), "status")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectMeta, PipelineRunStatus, PipelineSpec, PipelineTask, TaskRef};
    use crate::field_error::ErrorKind;
    use crate::reference::{ImageReference, ReferenceError};
    use proptest::prelude::*;

    fn alpha() -> ValidationContext {
        ValidationContext::new().with_api_fields(ApiFields::Alpha)
    }

    fn referenced() -> PipelineRunSpec {
        PipelineRunSpec {
            pipeline_ref: Some(PipelineRef::named("build")),
            ..PipelineRunSpec::default()
        }
    }

    fn inline_pipeline() -> PipelineSpec {
        PipelineSpec {
            tasks: vec![PipelineTask {
                name: "compile".into(),
                task_ref: Some(TaskRef {
                    name: "cargo-build".into(),
                    kind: String::new(),
                }),
                ..PipelineTask::default()
            }],
            ..PipelineSpec::default()
        }
    }

    fn run(spec: PipelineRunSpec) -> PipelineRun {
        PipelineRun {
            metadata: ObjectMeta::named("build-1"),
            spec,
            ..PipelineRun::default()
        }
    }

    fn with_timeouts(tasks: i64, finally: i64, pipeline: Option<i64>) -> PipelineRunSpec {
        PipelineRunSpec {
            timeouts: Some(TimeoutFields {
                tasks: Some(Duration::from_secs(tasks)),
                finally: Some(Duration::from_secs(finally)),
                pipeline: pipeline.map(Duration::from_secs),
            }),
            ..referenced()
        }
    }

    fn validate(ctx: &ValidationContext, spec: &PipelineRunSpec) -> FieldError {
        PipelineRunValidator::default().validate_spec(ctx, spec)
    }

    #[test]
    fn test_referenced_run_is_valid() {
        let errs = validate_pipeline_run(&ValidationContext::new(), &run(referenced()));
        assert!(errs.is_empty(), "{}", errs);
    }

    #[test]
    fn test_inline_run_is_valid() {
        let spec = PipelineRunSpec {
            pipeline_spec: Some(inline_pipeline()),
            ..PipelineRunSpec::default()
        };
        let errs = validate_pipeline_run(&ValidationContext::new(), &run(spec));
        assert!(errs.is_empty(), "{}", errs);
    }

    #[test]
    fn test_neither_reference_nor_inline() {
        let errs = validate_pipeline_run(
            &ValidationContext::new(),
            &run(PipelineRunSpec::default()),
        );
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::MissingOneOf, "spec.pipelineRef"));
        assert!(errs.contains(ErrorKind::MissingOneOf, "spec.pipelineSpec"));
        assert_eq!(
            errs.to_string(),
            "expected exactly one, got neither: spec.pipelineRef, spec.pipelineSpec"
        );
    }

    #[test]
    fn test_both_reference_and_inline() {
        let spec = PipelineRunSpec {
            pipeline_spec: Some(inline_pipeline()),
            ..referenced()
        };
        let errs = validate_pipeline_run(&ValidationContext::new(), &run(spec));
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::MultipleOneOf, "spec.pipelineRef"));
        assert!(errs.contains(ErrorKind::MultipleOneOf, "spec.pipelineSpec"));
    }

    #[test]
    fn test_reference_needs_name() {
        let spec = PipelineRunSpec {
            pipeline_ref: Some(PipelineRef::default()),
            ..PipelineRunSpec::default()
        };
        let errs = validate(&ValidationContext::new(), &spec);
        assert_eq!(errs.to_string(), "missing field(s): pipelineRef.name");
    }

    #[test]
    fn test_inline_errors_are_prefixed() {
        let mut pipeline = inline_pipeline();
        pipeline.tasks[0].task_ref = None;
        let spec = PipelineRunSpec {
            pipeline_spec: Some(pipeline),
            ..PipelineRunSpec::default()
        };
        let errs = validate_pipeline_run(&ValidationContext::new(), &run(spec));
        assert!(errs.contains(ErrorKind::MissingOneOf, "spec.pipelineSpec.tasks[0].taskRef"));
    }

    #[test]
    fn test_metadata_errors_are_prefixed() {
        let mut pipeline_run = run(referenced());
        pipeline_run.metadata.name = "Build".into();
        let errs = validate_pipeline_run(&ValidationContext::new(), &pipeline_run);
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::Generic, "metadata.name"));
    }

    #[test]
    fn test_deprecated_timeout() {
        let ok = PipelineRunSpec {
            timeout: Some(Duration::from_secs(5)),
            ..referenced()
        };
        assert!(validate(&ValidationContext::new(), &ok).is_empty());

        let negative = PipelineRunSpec {
            timeout: Some(Duration::from_secs(-1)),
            ..referenced()
        };
        let errs = validate(&ValidationContext::new(), &negative);
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::InvalidValue, "timeout"));
        assert_eq!(errs.to_string(), "invalid value: -1s should be >= 0: timeout");
    }

    #[test]
    fn test_timeouts_sum_exceeds_pipeline() {
        let errs = validate(&alpha(), &with_timeouts(4, 4, Some(5)));
        assert_eq!(errs.len(), 2);
        assert_eq!(errs.issues()[0].paths, vec!["timeouts.tasks"]);
        assert_eq!(errs.issues()[1].paths, vec!["timeouts.finally"]);
        for issue in errs.issues() {
            assert_eq!(issue.kind, ErrorKind::InvalidValue);
            assert_eq!(
                issue.message,
                "invalid value: 4s + 4s should be <= pipeline duration"
            );
        }
    }

    #[test]
    fn test_timeouts_within_pipeline() {
        assert!(validate(&alpha(), &with_timeouts(2, 2, Some(5))).is_empty());
    }

    #[test]
    fn test_each_timeout_bounded_individually() {
        let errs = validate(&alpha(), &with_timeouts(6, 0, Some(5)));
        assert!(errs.contains(ErrorKind::InvalidValue, "timeouts.tasks"));
        assert!(
            errs.to_string()
                .contains("invalid value: 6s should be <= pipeline duration: timeouts.tasks")
        );
    }

    #[test]
    fn test_timeouts_default_bound() {
        let ctx = alpha().with_default_timeout_minutes(60);
        let spec = PipelineRunSpec {
            timeouts: Some(TimeoutFields {
                tasks: Some(Duration::from_minutes(120)),
                ..TimeoutFields::default()
            }),
            ..referenced()
        };
        let errs = validate(&ctx, &spec);
        assert_eq!(
            errs.to_string(),
            "invalid value: 2h0m0s should be <= default timeout duration: timeouts.tasks"
        );

        let within = PipelineRunSpec {
            timeouts: Some(TimeoutFields {
                tasks: Some(Duration::from_minutes(40)),
                finally: Some(Duration::from_minutes(20)),
                pipeline: None,
            }),
            ..referenced()
        };
        assert!(validate(&ctx, &within).is_empty());
    }

    #[test]
    fn test_negative_timeouts() {
        let errs = validate(&alpha(), &with_timeouts(-1, 1, Some(-2)));
        assert!(errs.contains(ErrorKind::InvalidValue, "timeouts.tasks"));
        assert!(errs.contains(ErrorKind::InvalidValue, "timeouts.pipeline"));
        assert!(errs.to_string().contains("-2s should be >= 0"));
    }

    #[test]
    fn test_timeout_and_timeouts_together() {
        let spec = PipelineRunSpec {
            timeout: Some(Duration::from_secs(10)),
            ..with_timeouts(2, 2, Some(5))
        };
        let errs = validate(&alpha(), &spec);
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::DisallowedField, "timeout"));
        assert!(errs.contains(ErrorKind::DisallowedField, "timeouts"));
    }

    #[test]
    fn test_timeouts_need_alpha_but_are_still_checked() {
        let errs = validate(&ValidationContext::new(), &with_timeouts(4, 4, Some(5)));
        assert!(errs.contains(ErrorKind::FeatureNotEnabled, "timeouts"));
        assert!(errs.contains(ErrorKind::InvalidValue, "timeouts.tasks"));
        assert!(errs.contains(ErrorKind::InvalidValue, "timeouts.finally"));
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn test_bundle_disallowed_without_flag() {
        for bundle in ["gcr.io/team/pipelines:v1", "not a reference"] {
            let spec = PipelineRunSpec {
                pipeline_ref: Some(PipelineRef {
                    name: "build".into(),
                    bundle: bundle.into(),
                }),
                ..PipelineRunSpec::default()
            };
            let errs = validate(&ValidationContext::new(), &spec);
            assert_eq!(errs.len(), 1);
            assert!(errs.contains(ErrorKind::DisallowedField, "pipelineRef.bundle"));
        }
    }

    #[test]
    fn test_bundle_must_parse() {
        let ctx = ValidationContext::new().with_oci_bundles(true);
        let spec = PipelineRunSpec {
            pipeline_ref: Some(PipelineRef {
                name: "build".into(),
                bundle: "not a reference".into(),
            }),
            ..PipelineRunSpec::default()
        };
        let errs = validate(&ctx, &spec);
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::InvalidValue, "pipelineRef.bundle"));
        assert_eq!(
            errs.issues()[0].details,
            "could not parse reference: not a reference"
        );
    }

    #[test]
    fn test_valid_bundle() {
        let ctx = ValidationContext::new().with_oci_bundles(true);
        let spec = PipelineRunSpec {
            pipeline_ref: Some(PipelineRef {
                name: "build".into(),
                bundle: "gcr.io/team/pipelines:v1".into(),
            }),
            ..PipelineRunSpec::default()
        };
        assert!(validate(&ctx, &spec).is_empty());
    }

    #[test]
    fn test_bundle_without_name() {
        let ctx = ValidationContext::new().with_oci_bundles(true);
        let spec = PipelineRunSpec {
            pipeline_ref: Some(PipelineRef {
                name: String::new(),
                bundle: "gcr.io/team/pipelines:v1".into(),
            }),
            ..PipelineRunSpec::default()
        };
        let errs = validate(&ctx, &spec);
        assert!(errs.contains(ErrorKind::MissingField, "pipelineRef.name"));
        assert_eq!(errs.to_string(), "missing field(s): pipelineRef.name");
    }

    #[test]
    fn test_duplicate_workspaces() {
        let spec = PipelineRunSpec {
            workspaces: vec![
                WorkspaceBinding::empty_dir("shared"),
                WorkspaceBinding::empty_dir("shared"),
                WorkspaceBinding::empty_dir("shared"),
            ],
            ..referenced()
        };
        let errs = validate_pipeline_run(&ValidationContext::new(), &run(spec));
        assert_eq!(errs.len(), 2);
        assert!(errs.contains(ErrorKind::Generic, "spec.workspaces[1].name"));
        assert!(errs.contains(ErrorKind::Generic, "spec.workspaces[2].name"));
        assert_eq!(
            errs.issues()[0].message,
            "workspace \"shared\" provided by pipelinerun more than once, at index 0 and 1"
        );
        assert_eq!(
            errs.issues()[1].message,
            "workspace \"shared\" provided by pipelinerun more than once, at index 0 and 2"
        );
    }

    #[test]
    fn test_workspace_binding_errors_are_indexed() {
        let spec = PipelineRunSpec {
            workspaces: vec![
                WorkspaceBinding::empty_dir("source"),
                WorkspaceBinding {
                    name: "cache".into(),
                    ..WorkspaceBinding::default()
                },
            ],
            ..referenced()
        };
        let errs = validate(&ValidationContext::new(), &spec);
        assert!(errs.contains(ErrorKind::MissingOneOf, "workspaces[1].emptyDir"));
    }

    #[test]
    fn test_graceful_termination_under_alpha() {
        for status in ["Cancelled", "CancelledRunFinally", "StoppedRunFinally"] {
            let spec = PipelineRunSpec {
                status: status.into(),
                ..referenced()
            };
            assert!(validate(&alpha(), &spec).is_empty(), "{}", status);
        }
    }

    #[test]
    fn test_graceful_termination_under_stable() {
        let spec = PipelineRunSpec {
            status: "Cancelled".into(),
            ..referenced()
        };
        let errs = validate(&ValidationContext::new(), &spec);
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::InvalidValue, "status"));
        assert_eq!(
            errs.to_string(),
            "invalid value: Cancelled should be PipelineRunCancelled or PipelineRunPending: status\n\
             graceful termination requires \"enable-api-fields\" feature gate to be \"alpha\" but it is \"stable\""
        );
    }

    #[test]
    fn test_graceful_termination_under_beta() {
        let ctx = ValidationContext::new().with_api_fields(ApiFields::Beta);
        for status in ["Cancelled", "CancelledRunFinally", "StoppedRunFinally"] {
            let spec = PipelineRunSpec {
                status: status.into(),
                ..referenced()
            };
            let errs = validate(&ctx, &spec);
            assert_eq!(errs.len(), 1);
            assert!(errs.contains(ErrorKind::InvalidValue, "status"));
            assert_eq!(
                errs.issues()[0].message,
                format!(
                    "invalid value: {} should be PipelineRunCancelled or PipelineRunPending",
                    status
                )
            );
            assert_eq!(
                errs.issues()[0].details,
                "graceful termination requires \"enable-api-fields\" feature gate to be \"alpha\" but it is \"beta\""
            );
        }
    }

    #[test]
    fn test_always_legal_statuses() {
        for ctx in [ValidationContext::new(), alpha()] {
            for status in ["", "PipelineRunPending", "PipelineRunCancelled"] {
                let spec = PipelineRunSpec {
                    status: status.into(),
                    ..referenced()
                };
                assert!(validate(&ctx, &spec).is_empty(), "{}", status);
            }
        }
    }

    #[test]
    fn test_unknown_status_lists_tier_values() {
        let spec = PipelineRunSpec {
            status: "Paused".into(),
            ..referenced()
        };
        assert_eq!(
            validate(&alpha(), &spec).to_string(),
            "invalid value: Paused should be Cancelled, CancelledRunFinally, StoppedRunFinally or PipelineRunPending: status"
        );
        assert_eq!(
            validate(&ValidationContext::new().with_api_fields(ApiFields::Beta), &spec).to_string(),
            "invalid value: Paused should be PipelineRunCancelled or PipelineRunPending: status"
        );
    }

    #[test]
    fn test_pending_after_start() {
        let mut pipeline_run = run(PipelineRunSpec {
            status: PipelineRunSpecStatus::Pending,
            ..referenced()
        });
        assert!(validate_pipeline_run(&ValidationContext::new(), &pipeline_run).is_empty());

        pipeline_run.status = PipelineRunStatus {
            start_time: Some(chrono::Utc::now()),
            completion_time: None,
        };
        let errs = validate_pipeline_run(&ValidationContext::new(), &pipeline_run);
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs.to_string(),
            "invalid value: PipelineRun cannot be Pending after it is started: spec.status"
        );
    }

    #[test]
    fn test_delete_skips_everything() {
        let mut pipeline_run = run(PipelineRunSpec {
            timeout: Some(Duration::from_secs(-1)),
            status: "Bogus".into(),
            ..PipelineRunSpec::default()
        });
        pipeline_run.metadata.name = "Not Valid".into();

        let ctx = ValidationContext::new();
        assert!(!validate_pipeline_run(&ctx, &pipeline_run).is_empty());
        assert!(validate_pipeline_run(&ctx.for_delete(), &pipeline_run).is_empty());
    }

    #[test]
    fn test_all_problems_reported_at_once() {
        let spec = PipelineRunSpec {
            pipeline_ref: Some(PipelineRef {
                name: String::new(),
                bundle: "x".into(),
            }),
            timeout: Some(Duration::from_secs(-3)),
            status: "Paused".into(),
            workspaces: vec![
                WorkspaceBinding::empty_dir("shared"),
                WorkspaceBinding::empty_dir("shared"),
            ],
            ..PipelineRunSpec::default()
        };
        let errs = validate(&ValidationContext::new(), &spec);
        assert!(errs.contains(ErrorKind::MissingField, "pipelineRef.name"));
        assert!(errs.contains(ErrorKind::DisallowedField, "pipelineRef.bundle"));
        assert!(errs.contains(ErrorKind::InvalidValue, "timeout"));
        assert!(errs.contains(ErrorKind::InvalidValue, "status"));
        assert!(errs.contains(ErrorKind::Generic, "workspaces[1].name"));
        assert_eq!(errs.len(), 5);
    }

    struct UnreachableRegistry;

    impl ReferenceParser for UnreachableRegistry {
        fn parse(&self, reference: &str) -> Result<ImageReference, ReferenceError> {
            Err(ReferenceError(format!("{} (registry unreachable)", reference)))
        }
    }

    struct NoScratchWorkspaces;

    impl WorkspaceBindingValidator for NoScratchWorkspaces {
        fn validate(&self, _ctx: &ValidationContext, binding: &WorkspaceBinding) -> FieldError {
            if binding.name.starts_with("scratch") {
                FieldError::invalid_value("scratch workspaces are not allowed", "name")
            } else {
                FieldError::new()
            }
        }
    }

    struct AcceptAnyPipeline;

    impl PipelineSpecValidator for AcceptAnyPipeline {
        fn validate(&self, _ctx: &ValidationContext, _spec: &PipelineSpec) -> FieldError {
            FieldError::new()
        }
    }

    #[test]
    fn test_collaborators_are_pluggable() {
        let validator = PipelineRunValidator::default()
            .with_reference_parser(Arc::new(UnreachableRegistry))
            .with_workspace_validator(Arc::new(NoScratchWorkspaces))
            .with_pipeline_spec_validator(Arc::new(AcceptAnyPipeline));
        let ctx = ValidationContext::new().with_oci_bundles(true);

        let spec = PipelineRunSpec {
            pipeline_ref: Some(PipelineRef {
                name: "build".into(),
                bundle: "gcr.io/team/pipelines:v1".into(),
            }),
            workspaces: vec![
                WorkspaceBinding::default(),
                WorkspaceBinding {
                    name: "scratch-1".into(),
                    ..WorkspaceBinding::default()
                },
            ],
            ..PipelineRunSpec::default()
        };
        let errs = validator.validate_spec(&ctx, &spec);
        assert_eq!(errs.len(), 2);
        assert_eq!(
            errs.issues()[0].details,
            "could not parse reference: gcr.io/team/pipelines:v1 (registry unreachable)"
        );
        assert!(errs.contains(ErrorKind::InvalidValue, "workspaces[1].name"));

        let inline = PipelineRunSpec {
            pipeline_spec: Some(PipelineSpec::default()),
            ..PipelineRunSpec::default()
        };
        assert!(validator.validate_spec(&ctx, &inline).is_empty());
    }

    fn arb_status() -> impl Strategy<Value = PipelineRunSpecStatus> {
        prop::sample::select(vec![
            "",
            "PipelineRunPending",
            "Cancelled",
            "CancelledRunFinally",
            "StoppedRunFinally",
            "PipelineRunCancelled",
            "Paused",
        ])
        .prop_map(PipelineRunSpecStatus::from)
    }

    fn arb_spec() -> impl Strategy<Value = PipelineRunSpec> {
        (
            any::<bool>(),
            prop::option::of(-10i64..10),
            prop::option::of((
                prop::option::of(-10i64..10),
                prop::option::of(-10i64..10),
                prop::option::of(-10i64..20),
            )),
            arb_status(),
            prop::collection::vec(prop::sample::select(vec!["a", "b", "c", ""]), 0..4),
        )
            .prop_map(|(by_ref, timeout, timeouts, status, names)| PipelineRunSpec {
                pipeline_ref: by_ref.then(|| PipelineRef::named("build")),
                timeout: timeout.map(Duration::from_secs),
                timeouts: timeouts.map(|(tasks, finally, pipeline)| TimeoutFields {
                    tasks: tasks.map(Duration::from_secs),
                    finally: finally.map(Duration::from_secs),
                    pipeline: pipeline.map(Duration::from_secs),
                }),
                status,
                workspaces: names.into_iter().map(WorkspaceBinding::empty_dir).collect(),
                ..PipelineRunSpec::default()
            })
    }

    fn arb_context() -> impl Strategy<Value = ValidationContext> {
        (
            prop::sample::select(vec![ApiFields::Stable, ApiFields::Beta, ApiFields::Alpha]),
            any::<bool>(),
            0u64..120,
        )
            .prop_map(|(tier, bundles, minutes)| {
                ValidationContext::new()
                    .with_api_fields(tier)
                    .with_oci_bundles(bundles)
                    .with_default_timeout_minutes(minutes)
            })
    }

    proptest! {
        #[test]
        fn prop_validation_is_deterministic(ctx in arb_context(), spec in arb_spec()) {
            let validator = PipelineRunValidator::default();
            let first = validator.validate_spec(&ctx, &spec);
            let second = validator.validate_spec(&ctx, &spec);
            prop_assert_eq!(first.to_string(), second.to_string());
            prop_assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }

        #[test]
        fn prop_non_negative_timeout_is_valid(secs in 0i64..1_000_000) {
            let spec = PipelineRunSpec {
                timeout: Some(Duration::from_secs(secs)),
                ..referenced()
            };
            prop_assert!(validate(&ValidationContext::new(), &spec).is_empty());
        }

        #[test]
        fn prop_negative_timeout_is_rejected(secs in 1i64..1_000_000) {
            let spec = PipelineRunSpec {
                timeout: Some(Duration::from_secs(-secs)),
                ..referenced()
            };
            let errs = validate(&ValidationContext::new(), &spec);
            prop_assert_eq!(errs.len(), 1);
            prop_assert!(errs.contains(ErrorKind::InvalidValue, "timeout"));
        }
    }
}
