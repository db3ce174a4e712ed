//! The per-endpoint push strategy

use crate::error::handlers::{Disposition, HttpErrorHandler};
use crate::error::{PushError, RegistryError};
use async_trait::async_trait;

/// Outcome of pushing one tag to one endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Success,
    /// Worth trying the next endpoint
    Retryable(PushError),
    /// Abort the whole push
    Fatal(PushError),
}

impl PushOutcome {
    /// Classify a registry failure with [`HttpErrorHandler::disposition`]
    pub fn from_registry_error(error: RegistryError) -> Self {
        match HttpErrorHandler::disposition(&error) {
            Disposition::Retryable => PushOutcome::Retryable(error.into()),
            Disposition::Fatal => PushOutcome::Fatal(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PushOutcome::Success)
    }
}

/// Pushes tags of one local repository to the single endpoint it was built for.
///
/// Pushers are created per endpoint and dropped once the orchestrator moves on.
#[async_trait]
pub trait Pusher: Send {
    async fn push(&mut self, tag: &str) -> PushOutcome;
}
