//! Pipeline domain types
//!
//! Only the parts of a pipeline definition that admission checks look at are
//! modelled; task bodies stay opaque JSON.

use serde::{Deserialize, Serialize};

use super::duration::Duration;

/// Inline pipeline definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<PipelineTask>,

    /// Tasks that run after `tasks`, whatever their outcome
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finally: Vec<PipelineTask>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<PipelineWorkspaceDeclaration>,
}

impl PipelineSpec {
    pub fn is_empty(&self) -> bool {
        *self == PipelineSpec::default()
    }
}

/// A task inside a pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTask {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<TaskRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_spec: Option<serde_json::Value>,

    /// Names of tasks that must complete before this one starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_after: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<WorkspacePipelineTaskBinding>,
}

/// Reference to a task defined elsewhere
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Workspace a pipeline expects its runs to provide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineWorkspaceDeclaration {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub optional: bool,
}

/// Maps a task's workspace onto one of the pipeline's workspaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePipelineTaskBinding {
    /// Workspace name as the task knows it
    pub name: String,

    /// Pipeline workspace to bind; defaults to `name`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_path: String,
}

impl WorkspacePipelineTaskBinding {
    /// Name of the pipeline workspace this binding points at
    pub fn target(&self) -> &str {
        if self.workspace.is_empty() {
            &self.name
        } else {
            &self.workspace
        }
    }
}
