//! Field-addressable validation errors
//!
//! A [`FieldError`] is an aggregate of issues, each tagged with the field
//! paths it applies to. Aggregates combine with [`FieldError::also`] or
//! [`FieldError::merge`]; an empty aggregate means the object is valid.
//! Paths are re-rooted with [`FieldError::via_field`] and
//! [`FieldError::via_field_index`] as results bubble up from nested
//! validators, so a task-level problem ends up at
//! `spec.pipelineSpec.tasks[0].name`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// A required field is absent
    MissingField,
    /// None of a set of mutually exclusive fields is set
    MissingOneOf,
    /// More than one of a set of mutually exclusive fields is set
    MultipleOneOf,
    /// A field is set where it is not permitted
    DisallowedField,
    /// A field holds a value outside its domain
    InvalidValue,
    /// A field requires an API tier that is not active
    FeatureNotEnabled,
    /// Anything else, e.g. duplicate names
    Generic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingField => write!(f, "MissingField"),
            ErrorKind::MissingOneOf => write!(f, "MissingOneOf"),
            ErrorKind::MultipleOneOf => write!(f, "MultipleOneOf"),
            ErrorKind::DisallowedField => write!(f, "DisallowedField"),
            ErrorKind::InvalidValue => write!(f, "InvalidValue"),
            ErrorKind::FeatureNotEnabled => write!(f, "FeatureNotEnabled"),
            ErrorKind::Generic => write!(f, "Generic"),
        }
    }
}

/// A single validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    pub kind: ErrorKind,
    pub message: String,
    /// Field paths this issue applies to. Empty means "the current field".
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

impl FieldIssue {
    fn new(kind: ErrorKind, message: impl Into<String>, paths: &[&str]) -> Self {
        Self {
            kind,
            message: message.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            details: String::new(),
        }
    }
}

/// Aggregate of validation issues
///
/// Serializes as the plain list of issues, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldError {
    issues: Vec<FieldIssue>,
}

impl FieldError {
    /// Creates an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    fn single(issue: FieldIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// `missing field(s)` at `path`
    pub fn missing_field(path: &str) -> Self {
        Self::single(FieldIssue::new(
            ErrorKind::MissingField,
            "missing field(s)",
            &[path],
        ))
    }

    /// None of the mutually exclusive `paths` is set
    pub fn missing_one_of(paths: &[&str]) -> Self {
        Self::single(FieldIssue::new(
            ErrorKind::MissingOneOf,
            "expected exactly one, got neither",
            paths,
        ))
    }

    /// Several of the mutually exclusive `paths` are set
    pub fn multiple_one_of(paths: &[&str]) -> Self {
        Self::single(FieldIssue::new(
            ErrorKind::MultipleOneOf,
            "expected exactly one, got both",
            paths,
        ))
    }

    /// The fields at `paths` must not be set
    pub fn disallowed_fields(paths: &[&str]) -> Self {
        Self::single(FieldIssue::new(
            ErrorKind::DisallowedField,
            "must not set the field(s)",
            paths,
        ))
    }

    /// `invalid value: <value>` at `path`
    pub fn invalid_value(value: impl fmt::Display, path: &str) -> Self {
        Self::single(FieldIssue::new(
            ErrorKind::InvalidValue,
            format!("invalid value: {}", value),
            &[path],
        ))
    }

    /// Free-form diagnostic at `path`
    pub fn generic(message: impl Into<String>, path: &str) -> Self {
        Self::single(FieldIssue::new(ErrorKind::Generic, message, &[path]))
    }

    /// Feature gate failure; carries no path until re-rooted by the caller
    pub fn feature_not_enabled(message: impl Into<String>) -> Self {
        Self::single(FieldIssue::new(ErrorKind::FeatureNotEnabled, message, &[]))
    }

    /// Attaches extra detail text to every issue in the aggregate
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        for issue in &mut self.issues {
            issue.details = details.clone();
        }
        self
    }

    /// Combines two aggregates, keeping the issues of `self` first
    pub fn also(mut self, other: FieldError) -> Self {
        self.merge(other);
        self
    }

    /// In-place form of [`FieldError::also`]
    pub fn merge(&mut self, other: FieldError) {
        self.issues.extend(other.issues);
    }

    /// Re-roots every path under `prefix`
    pub fn via_field(mut self, prefix: &str) -> Self {
        for issue in &mut self.issues {
            if issue.paths.is_empty() {
                issue.paths.push(prefix.to_string());
                continue;
            }
            for path in &mut issue.paths {
                *path = join_path(prefix, path);
            }
        }
        self
    }

    /// Re-roots every path under the list index `[index]`
    pub fn via_index(mut self, index: usize) -> Self {
        let segment = format!("[{}]", index);
        for issue in &mut self.issues {
            if issue.paths.is_empty() {
                issue.paths.push(segment.clone());
                continue;
            }
            for path in &mut issue.paths {
                *path = if path.is_empty() {
                    segment.clone()
                } else if path.starts_with('[') {
                    format!("{}{}", segment, path)
                } else {
                    format!("{}.{}", segment, path)
                };
            }
        }
        self
    }

    /// Re-roots every path under `prefix[index]`
    pub fn via_field_index(self, prefix: &str, index: usize) -> Self {
        self.via_index(index).via_field(prefix)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Returns `true` if any issue of `kind` mentions `path`
    pub fn contains(&self, kind: ErrorKind, path: &str) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.kind == kind && issue.paths.iter().any(|p| p == path))
    }

    /// `Ok(())` for an empty aggregate, otherwise the aggregate itself
    pub fn into_result(self) -> Result<(), FieldError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        prefix.to_string()
    } else if path.starts_with('[') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}.{}", prefix, path)
    }
}

/// Renders the aggregate with issues sharing a message and details folded
/// into one line, paths sorted and deduplicated, lines ordered by message.
impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut groups: BTreeMap<(&str, &str), Vec<&str>> = BTreeMap::new();
        for issue in &self.issues {
            let paths = groups
                .entry((issue.message.as_str(), issue.details.as_str()))
                .or_default();
            paths.extend(issue.paths.iter().map(String::as_str));
        }

        let mut first = true;
        for ((message, details), mut paths) in groups {
            paths.sort_unstable();
            paths.dedup();
            if !first {
                writeln!(f)?;
            }
            first = false;

            if paths.is_empty() {
                write!(f, "{}", message)?;
            } else {
                write!(f, "{}: {}", message, paths.join(", "))?;
            }
            if !details.is_empty() {
                write!(f, "\n{}", details)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}

impl FromIterator<FieldError> for FieldError {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        iter.into_iter().fold(FieldError::new(), FieldError::also)
    }
}
