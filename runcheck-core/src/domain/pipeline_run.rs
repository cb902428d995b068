//! Pipeline run domain types
//!
//! A [`PipelineRun`] is the admission request: which pipeline to execute
//! (by reference or inline), with which time budget, lifecycle control and
//! workspace bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::duration::Duration;
use super::metadata::ObjectMeta;
use super::pipeline::PipelineSpec;
use super::workspace::WorkspaceBinding;

/// Pipeline run resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: PipelineRunSpec,

    #[serde(default)]
    pub status: PipelineRunStatus,
}

impl PipelineRun {
    /// Returns `true` if the run is held in the pending state
    pub fn is_pending(&self) -> bool {
        self.spec.status == PipelineRunSpecStatus::Pending
    }

    /// Returns `true` once the run has a recorded start time
    pub fn has_started(&self) -> bool {
        self.status.start_time.is_some()
    }
}

/// Desired state of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    /// Reference to a pipeline defined elsewhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_ref: Option<PipelineRef>,

    /// Pipeline definition embedded in the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_spec: Option<PipelineSpec>,

    /// Overall time budget (deprecated in favour of `timeouts`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Split time budget for tasks, finally tasks and the whole pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<TimeoutFields>,

    #[serde(default, skip_serializing_if = "PipelineRunSpecStatus::is_unset")]
    pub status: PipelineRunSpecStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<WorkspaceBinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
}

/// Pointer to an external pipeline definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRef {
    #[serde(default)]
    pub name: String,

    /// OCI image holding the pipeline definition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bundle: String,
}

impl PipelineRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bundle: String::new(),
        }
    }
}

/// Independent time budgets; each one is optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finally: Option<Duration>,
}

/// Lifecycle control requested for a run
///
/// Values that are not part of the enumeration are kept verbatim in
/// [`PipelineRunSpecStatus::Unknown`] so validation can report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PipelineRunSpecStatus {
    #[default]
    Unset,
    /// `PipelineRunPending`: hold the run before it starts
    Pending,
    /// `Cancelled`: stop everything, skip finally tasks
    Cancelled,
    /// `CancelledRunFinally`: cancel tasks, then run finally tasks
    CancelledRunFinally,
    /// `StoppedRunFinally`: let running tasks finish, then run finally tasks
    StoppedRunFinally,
    /// `PipelineRunCancelled`: deprecated spelling of cancellation
    CancelledDeprecated,
    Unknown(String),
}

impl PipelineRunSpecStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineRunSpecStatus::Unset => "",
            PipelineRunSpecStatus::Pending => "PipelineRunPending",
            PipelineRunSpecStatus::Cancelled => "Cancelled",
            PipelineRunSpecStatus::CancelledRunFinally => "CancelledRunFinally",
            PipelineRunSpecStatus::StoppedRunFinally => "StoppedRunFinally",
            PipelineRunSpecStatus::CancelledDeprecated => "PipelineRunCancelled",
            PipelineRunSpecStatus::Unknown(value) => value,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, PipelineRunSpecStatus::Unset)
    }
}

impl fmt::Display for PipelineRunSpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PipelineRunSpecStatus {
    fn from(value: &str) -> Self {
        match value {
            "" => PipelineRunSpecStatus::Unset,
            "PipelineRunPending" => PipelineRunSpecStatus::Pending,
            "Cancelled" => PipelineRunSpecStatus::Cancelled,
            "CancelledRunFinally" => PipelineRunSpecStatus::CancelledRunFinally,
            "StoppedRunFinally" => PipelineRunSpecStatus::StoppedRunFinally,
            "PipelineRunCancelled" => PipelineRunSpecStatus::CancelledDeprecated,
            other => PipelineRunSpecStatus::Unknown(other.to_string()),
        }
    }
}

impl From<String> for PipelineRunSpecStatus {
    fn from(value: String) -> Self {
        PipelineRunSpecStatus::from(value.as_str())
    }
}

impl From<PipelineRunSpecStatus> for String {
    fn from(status: PipelineRunSpecStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Observed state of a run, as recorded by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}
