//! Core domain types
//!
//! This module contains the resources admission validation works on: the
//! pipeline run itself, the inline pipeline it may carry, workspace
//! bindings, object metadata and the duration type used by every timeout.

pub mod duration;
pub mod metadata;
pub mod pipeline;
pub mod pipeline_run;
pub mod workspace;

pub use duration::{Duration, DurationParseError};
pub use metadata::ObjectMeta;
pub use pipeline::{
    PipelineSpec, PipelineTask, PipelineWorkspaceDeclaration, TaskRef,
    WorkspacePipelineTaskBinding,
};
pub use pipeline_run::{
    PipelineRef, PipelineRun, PipelineRunSpec, PipelineRunSpecStatus, PipelineRunStatus,
    TimeoutFields,
};
pub use workspace::{
    ConfigMapSource, EmptyDirSource, PersistentVolumeClaimSource, SecretSource, WorkspaceBinding,
};
