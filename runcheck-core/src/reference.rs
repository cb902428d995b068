//! OCI image references
//!
//! Parses `[registry/]repository[:tag][@sha256:<hex>]` the way container
//! registries expect bundle references to look. A reference without a tag or
//! digest resolves to `:latest`; a reference without a registry resolves to
//! Docker Hub, where single-component repositories live under `library/`.
//! The first path segment is a registry when it has a dot or a port, or is
//! `localhost`.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

pub const DEFAULT_REGISTRY: &str = "index.docker.io";
pub const DEFAULT_TAG: &str = "latest";

static REGISTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?(:[0-9]+)?$").unwrap());
static REPOSITORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_./-]{2,255}$").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").unwrap());
static DIGEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sha256:[a-f0-9]{64}$").unwrap());

/// Failure to parse an image reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse reference: {0}")]
pub struct ReferenceError(pub String);

/// Tag or digest selecting an image within a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Tag(String),
    Digest(String),
}

/// A parsed image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub identifier: Identifier,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        match &self.identifier {
            Identifier::Tag(tag) => write!(f, ":{}", tag),
            Identifier::Digest(digest) => write!(f, "@{}", digest),
        }
    }
}

/// Parses image references on behalf of the bundle checks
pub trait ReferenceParser: Send + Sync {
    fn parse(&self, reference: &str) -> Result<ImageReference, ReferenceError>;
}

/// Standard implementation of ReferenceParser
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardReferenceParser;

impl ReferenceParser for StandardReferenceParser {
    fn parse(&self, reference: &str) -> Result<ImageReference, ReferenceError> {
        parse_reference(reference)
    }
}

/// Parses an image reference, trying the tag form first and the digest form
/// second
pub fn parse_reference(input: &str) -> Result<ImageReference, ReferenceError> {
    parse_tagged(input)
        .or_else(|| parse_digested(input))
        .ok_or_else(|| ReferenceError(input.to_string()))
}

fn parse_tagged(input: &str) -> Option<ImageReference> {
    let (base, tag) = split_tag(input);
    let tag = match tag {
        Some(tag) if TAG_RE.is_match(tag) => tag.to_string(),
        Some(_) => return None,
        None => DEFAULT_TAG.to_string(),
    };
    let (registry, repository) = parse_repository(base)?;
    Some(ImageReference {
        registry,
        repository,
        identifier: Identifier::Tag(tag),
    })
}

fn parse_digested(input: &str) -> Option<ImageReference> {
    let (base, digest) = input.split_once('@')?;
    if digest.contains('@') || !DIGEST_RE.is_match(digest) {
        return None;
    }
    // The base may still carry a tag; the digest wins.
    let (base, tag) = split_tag(base);
    if tag.is_some_and(|tag| !TAG_RE.is_match(tag)) {
        return None;
    }
    let (registry, repository) = parse_repository(base)?;
    Some(ImageReference {
        registry,
        repository,
        identifier: Identifier::Digest(digest.to_string()),
    })
}

/// Splits off a trailing `:tag`, ignoring colons that belong to a registry
/// port
fn split_tag(input: &str) -> (&str, Option<&str>) {
    match input.rsplit_once(':') {
        Some((base, tag)) if !tag.contains('/') => (base, Some(tag)),
        _ => (input, None),
    }
}

fn parse_repository(input: &str) -> Option<(String, String)> {
    if input.is_empty() {
        return None;
    }

    let (registry, repository) = match input.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first, rest)
        }
        _ => ("", input),
    };

    if !REPOSITORY_RE.is_match(repository) {
        return None;
    }
    if !registry.is_empty() && !REGISTRY_RE.is_match(registry) {
        return None;
    }

    let registry = if registry.is_empty() {
        DEFAULT_REGISTRY
    } else {
        registry
    };
    let repository = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
        format!("library/{}", repository)
    } else {
        repository.to_string()
    };

    Some((registry.to_string(), repository))
}
