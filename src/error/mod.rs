//! Error types for manifest pushes
//!
//! [`RegistryError`] covers everything that can go wrong while talking to a registry or
//! reading the local cache. [`PushError`] is the taxonomy the orchestrator reasons about.

pub mod handlers;

use crate::registry::ApiVersion;
use std::fmt;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Connection, DNS, TLS or timeout failures
    Network(String),
    /// Non-success HTTP response from the registry
    Status { code: u16, message: String },
    /// Authentication errors
    Auth(String),
    /// File IO errors
    Io(String),
    /// Parse errors
    Parse(String),
    /// Validation errors
    Validation(String),
    /// Resource not found locally
    NotFound(String),
    /// Local blob content does not hash to its recorded digest
    DigestMismatch { expected: String, actual: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Network(msg) => write!(f, "Network error: {}", msg),
            RegistryError::Status { code, message } => {
                write!(f, "Registry error (HTTP {}): {}", code, message)
            }
            RegistryError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            RegistryError::Io(msg) => write!(f, "IO error: {}", msg),
            RegistryError::Parse(msg) => write!(f, "Parse error: {}", msg),
            RegistryError::Validation(msg) => write!(f, "Validation error: {}", msg),
            RegistryError::NotFound(msg) => write!(f, "Not found: {}", msg),
            RegistryError::DigestMismatch { expected, actual } => write!(
                f,
                "Digest mismatch: expected {}, local content hashes to {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "request")
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}

/// Everything a push can fail with, as seen by the orchestrator and its caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PushError {
    #[error("Invalid repository reference {reference:?}: {reason}")]
    RepositoryResolution { reference: String, reason: String },

    #[error(
        "You cannot push manifest to a \"root\" repository. Please rename your repository to <user>/<repo> (ex: {username}/{local_name})"
    )]
    OfficialRepositoryRejected { username: String, local_name: String },

    #[error("Repository does not exist: {0}")]
    LocalRepositoryMissing(String),

    #[error("Repository {0} has no tags to push")]
    NoTagsToPush(String),

    #[error("no endpoints found for {0}")]
    NoEndpointsAvailable(String),

    #[error("Endpoint lookup failed for {name}: {reason}")]
    EndpointLookup { name: String, reason: String },

    #[error("unknown version {version} for registry {url}")]
    UnsupportedProtocolVersion { version: ApiVersion, url: String },

    #[error("Tag does not exist: {repository}:{tag}")]
    TagNotFound { repository: String, tag: String },

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("Pushed {pushed:?} but could not push {remaining:?}: {source}")]
    IncompletePush {
        pushed: Vec<String>,
        remaining: Vec<String>,
        source: Box<PushError>,
    },
}
