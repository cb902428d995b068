//! Inline pipeline checks
//!
//! Structural checks on an embedded pipeline definition: task identity,
//! task references, the `runAfter` graph and workspace wiring.

use std::collections::{HashMap, HashSet};

use super::metadata::is_dns1123_label;
use crate::config::ValidationContext;
use crate::domain::{PipelineSpec, PipelineTask};
use crate::field_error::FieldError;

/// Validates an inline pipeline definition
pub trait PipelineSpecValidator: Send + Sync {
    fn validate(&self, ctx: &ValidationContext, spec: &PipelineSpec) -> FieldError;
}

/// Standard implementation of PipelineSpecValidator
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPipelineSpecValidator;

impl PipelineSpecValidator for StandardPipelineSpecValidator {
    fn validate(&self, _ctx: &ValidationContext, spec: &PipelineSpec) -> FieldError {
        if spec.is_empty() {
            return ["description", "tasks", "workspaces"]
                .into_iter()
                .map(|path| FieldError::generic("expected at least one, got none", path))
                .collect();
        }

        let mut errs = FieldError::new();

        if spec.tasks.is_empty() && !spec.finally.is_empty() {
            errs.merge(FieldError::invalid_value(
                format!(
                    "spec.tasks is empty but spec.finally has {} tasks",
                    spec.finally.len()
                ),
                "finally",
            ));
        }

        errs.merge(validate_task_names(spec));
        for (idx, task) in spec.tasks.iter().enumerate() {
            errs.merge(validate_task(task).via_field_index("tasks", idx));
        }
        for (idx, task) in spec.finally.iter().enumerate() {
            let mut task_errs = validate_task(task);
            if !task.run_after.is_empty() {
                task_errs.merge(FieldError::invalid_value(
                    format!(
                        "no runAfter allowed under spec.finally, final task {} has runAfter specified",
                        task.name
                    ),
                    "runAfter",
                ));
            }
            errs.merge(task_errs.via_field_index("finally", idx));
        }

        errs.merge(validate_run_after(&spec.tasks));
        errs.merge(validate_workspaces(spec));
        errs
    }
}

fn validate_task(task: &PipelineTask) -> FieldError {
    let mut errs = FieldError::new();

    match (&task.task_ref, &task.task_spec) {
        (None, None) => errs.merge(FieldError::missing_one_of(&["taskRef", "taskSpec"])),
        (Some(_), Some(_)) => errs.merge(FieldError::multiple_one_of(&["taskRef", "taskSpec"])),
        (Some(task_ref), None) if task_ref.name.is_empty() => {
            errs.merge(FieldError::missing_field("taskRef.name"))
        }
        _ => {}
    }

    if let Some(timeout) = task.timeout.filter(|t| t.is_negative()) {
        errs.merge(FieldError::invalid_value(
            format!("{} should be >= 0", timeout),
            "timeout",
        ));
    }

    errs
}

/// Task names must be DNS labels and unique across `tasks` and `finally`
fn validate_task_names(spec: &PipelineSpec) -> FieldError {
    let mut errs = FieldError::new();
    let mut seen = HashSet::new();

    let all = spec
        .tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| ("tasks", idx, task))
        .chain(
            spec.finally
                .iter()
                .enumerate()
                .map(|(idx, task)| ("finally", idx, task)),
        );

    for (field, idx, task) in all {
        if !is_dns1123_label(&task.name) {
            errs.merge(
                FieldError::invalid_value(
                    format!(
                        "{:?} must be a lowercase RFC 1123 label of at most 63 characters",
                        task.name
                    ),
                    "name",
                )
                .via_field_index(field, idx),
            );
        }
        if !seen.insert(task.name.as_str()) {
            errs.merge(
                FieldError::invalid_value(format!("{} should be unique", task.name), "name")
                    .via_field_index(field, idx),
            );
        }
    }

    errs
}

/// `runAfter` must name other tasks and must not form a cycle
fn validate_run_after(tasks: &[PipelineTask]) -> FieldError {
    let mut errs = FieldError::new();
    let known: HashSet<&str> = tasks.iter().map(|t| t.name.as_str()).collect();

    for (idx, task) in tasks.iter().enumerate() {
        for dependency in &task.run_after {
            if !known.contains(dependency.as_str()) {
                errs.merge(
                    FieldError::invalid_value(
                        format!(
                            "task {:?} runs after {:?}, which is not a task in the pipeline",
                            task.name, dependency
                        ),
                        "runAfter",
                    )
                    .via_field_index("tasks", idx),
                );
            }
        }
    }

    if let Some((task, dependency)) = find_cycle(tasks) {
        errs.merge(FieldError::invalid_value(
            format!("cycle detected; task {:?} depends on {:?}", task, dependency),
            "tasks",
        ));
    }

    errs
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Depth-first search over `runAfter` edges, in declaration order
///
/// Returns the edge that closes the first cycle found. Frames are
/// `(task, next dependency)` pairs on an explicit stack.
fn find_cycle(tasks: &[PipelineTask]) -> Option<(String, String)> {
    let by_name: HashMap<&str, &PipelineTask> =
        tasks.iter().map(|t| (t.name.as_str(), t)).collect();
    let mut state: HashMap<&str, Visit> = HashMap::new();
    let mut stack: Vec<(&str, usize)> = Vec::new();

    for task in tasks {
        let root = task.name.as_str();
        if state.contains_key(root) {
            continue;
        }
        state.insert(root, Visit::InProgress);
        stack.push((root, 0));

        while let Some(&(name, next)) = stack.last() {
            let dependency = by_name
                .get(name)
                .copied()
                .and_then(|task| task.run_after.get(next));
            let Some(dependency) = dependency else {
                state.insert(name, Visit::Done);
                stack.pop();
                continue;
            };
            if let Some(frame) = stack.last_mut() {
                frame.1 += 1;
            }

            let dependency = dependency.as_str();
            match state.get(dependency).copied() {
                Some(Visit::InProgress) => {
                    return Some((name.to_string(), dependency.to_string()));
                }
                Some(Visit::Done) => {}
                None if by_name.contains_key(dependency) => {
                    state.insert(dependency, Visit::InProgress);
                    stack.push((dependency, 0));
                }
                None => {}
            }
        }
    }
    None
}

/// Declared workspaces are unique and every task binding targets one of them
fn validate_workspaces(spec: &PipelineSpec) -> FieldError {
    let mut errs = FieldError::new();
    let mut declared = HashSet::new();

    for (idx, ws) in spec.workspaces.iter().enumerate() {
        if !declared.insert(ws.name.as_str()) {
            errs.merge(
                FieldError::invalid_value(
                    format!("workspace with name {:?} appears more than once", ws.name),
                    "name",
                )
                .via_field_index("workspaces", idx),
            );
        }
    }

    for (field, tasks) in [("tasks", &spec.tasks), ("finally", &spec.finally)] {
        for (idx, task) in tasks.iter().enumerate() {
            for (ws_idx, binding) in task.workspaces.iter().enumerate() {
                if !declared.contains(binding.target()) {
                    errs.merge(
                        FieldError::invalid_value(
                            format!(
                                "pipeline task {:?} expects workspace with name {:?} but none exists in pipeline spec",
                                task.name,
                                binding.target()
                            ),
                            "",
                        )
                        .via_field_index("workspaces", ws_idx)
                        .via_field_index(field, idx),
                    );
                }
            }
        }
    }

    errs
}
