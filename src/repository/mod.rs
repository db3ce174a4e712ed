//! Repository reference resolution
//!
//! Turns a user supplied reference such as `registry.example.com:5000/team/app:v1` into
//! the names the rest of the crate works with: the registry index, the canonical name
//! used for endpoint lookup and the local name used for the local store.

use crate::error::PushError;

/// Index used when a reference does not name a registry host
pub const DEFAULT_INDEX: &str = "docker.io";
/// Legacy spelling of the default index
pub const LEGACY_DEFAULT_INDEX: &str = "index.docker.io";
/// Namespace holding the official ("root") repositories
pub const OFFICIAL_NAMESPACE: &str = "library";

const MAX_TAG_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    /// Registry host the repository lives on, e.g. `docker.io`
    pub index_name: String,
    /// Repository path on the index, e.g. `library/ubuntu`
    pub remote_name: String,
    /// Fully qualified name, e.g. `docker.io/library/ubuntu`
    pub canonical_name: String,
    /// Name of the repository in the local store
    pub local_name: String,
    /// Official repositories live in the root namespace and cannot be pushed to
    pub official: bool,
}

/// Resolves a repository reference (without tag) into a [`RepositoryInfo`]
pub trait RepositoryResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<RepositoryInfo, PushError>;
}

/// Docker-style resolver: the first path component is a registry host when it looks
/// like one (contains `.` or `:`, or is `localhost`).
#[derive(Debug, Clone)]
pub struct IndexResolver {
    default_index: String,
}

impl Default for IndexResolver {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX)
    }
}

impl IndexResolver {
    pub fn new(default_index: &str) -> Self {
        Self {
            default_index: normalize_index(default_index),
        }
    }

    fn split_index<'a>(&self, name: &'a str) -> (String, &'a str) {
        match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (normalize_index(first), rest)
            }
            _ => (self.default_index.clone(), name),
        }
    }
}

impl RepositoryResolver for IndexResolver {
    fn resolve(&self, reference: &str) -> Result<RepositoryInfo, PushError> {
        let invalid = |reason: String| PushError::RepositoryResolution {
            reference: reference.to_string(),
            reason,
        };

        if reference.contains("://") {
            return Err(invalid("scheme is not allowed in a repository reference".to_string()));
        }

        let (index_name, remote) = self.split_index(reference);
        validate_remote_name(remote).map_err(invalid)?;

        if index_name == DEFAULT_INDEX {
            let local = remote
                .strip_prefix(OFFICIAL_NAMESPACE)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(remote);

            if !local.contains('/') {
                let remote_name = format!("{}/{}", OFFICIAL_NAMESPACE, local);
                return Ok(RepositoryInfo {
                    canonical_name: format!("{}/{}", index_name, remote_name),
                    local_name: local.to_string(),
                    remote_name,
                    index_name,
                    official: true,
                });
            }

            return Ok(RepositoryInfo {
                canonical_name: format!("{}/{}", index_name, remote),
                local_name: remote.to_string(),
                remote_name: remote.to_string(),
                index_name,
                official: false,
            });
        }

        let qualified = format!("{}/{}", index_name, remote);
        Ok(RepositoryInfo {
            canonical_name: qualified.clone(),
            local_name: qualified,
            remote_name: remote.to_string(),
            index_name,
            official: false,
        })
    }
}

fn normalize_index(index: &str) -> String {
    let index = index.trim().trim_end_matches('/').to_ascii_lowercase();
    if index == LEGACY_DEFAULT_INDEX {
        DEFAULT_INDEX.to_string()
    } else {
        index
    }
}

/// Split `NAME[:TAG]` or `NAME@DIGEST`. An empty tag is reported as `None`.
pub fn parse_repository_tag(reference: &str) -> (String, Option<String>) {
    if let Some((name, digest)) = reference.split_once('@') {
        return (name.to_string(), Some(digest.to_string()).filter(|d| !d.is_empty()));
    }

    match reference.rfind(':') {
        Some(colon) if !reference[colon + 1..].contains('/') => {
            let tag = &reference[colon + 1..];
            (
                reference[..colon].to_string(),
                Some(tag.to_string()).filter(|t| !t.is_empty()),
            )
        }
        _ => (reference.to_string(), None),
    }
}

/// Validate a tag: word characters, dots and dashes, not starting with `.` or `-`
pub fn validate_tag(tag: &str) -> Result<(), String> {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        return Err(format!("tag must be 1 to {} characters", MAX_TAG_LEN));
    }
    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(format!("tag {:?} cannot start with '.' or '-'", tag));
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(format!("tag {:?} contains invalid characters", tag));
    }
    Ok(())
}

fn validate_remote_name(remote: &str) -> Result<(), String> {
    if remote.is_empty() {
        return Err("repository name cannot be empty".to_string());
    }

    for component in remote.split('/') {
        if component.is_empty() {
            return Err(format!("repository name {:?} has an empty path component", remote));
        }
        if !component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
        {
            return Err(format!(
                "repository name component {:?} must be lowercase alphanumerics with '.', '_' or '-'",
                component
            ));
        }
        let edges_ok = component
            .chars()
            .next()
            .zip(component.chars().last())
            .is_some_and(|(first, last)| {
                first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric()
            });
        if !edges_ok {
            return Err(format!(
                "repository name component {:?} must start and end with an alphanumeric",
                component
            ));
        }
    }

    Ok(())
}
