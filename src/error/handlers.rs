//! Standardized error handling for registry responses
//!
//! Besides turning HTTP failures into readable messages, this module decides which
//! failures are worth retrying against another endpoint.

use crate::error::RegistryError;
use reqwest::StatusCode;

/// How a failed push step should be treated by the endpoint loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The failure is plausibly specific to the endpoint; try the next one
    Retryable,
    /// The request itself is bad; no other endpoint will do better
    Fatal,
}

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Handle upload-related HTTP errors with standardized messages
    pub fn handle_upload_error(
        status: StatusCode,
        error_text: &str,
        context: &str,
    ) -> RegistryError {
        let message = match status.as_u16() {
            400 => {
                if error_text.contains("DIGEST_INVALID") {
                    format!(
                        "Digest validation failed during {} - registry reports content doesn't match digest: {}",
                        context, error_text
                    )
                } else {
                    format!("Bad request during {}: {}", context, error_text)
                }
            }
            401 => format!("Authentication failed during {}: {}", context, error_text),
            403 => format!("Permission denied for {}: {}", context, error_text),
            404 => format!(
                "Repository not found or {} session expired: {}",
                context, error_text
            ),
            413 => format!("Content too large for {}: {}", context, error_text),
            422 => format!("Invalid digest or data for {}: {}", context, error_text),
            429 => format!("Rate limited during {}: {}", context, error_text),
            500 => format!("Registry server error during {}: {}", context, error_text),
            502 | 503 => format!("Registry unavailable during {}: {}", context, error_text),
            507 => format!("Registry out of storage during {}: {}", context, error_text),
            _ => format!("{} failed (status {}): {}", context, status, error_text),
        };

        RegistryError::Status {
            code: status.as_u16(),
            message,
        }
    }

    /// Handle authentication-related HTTP errors
    pub fn handle_auth_error(status: StatusCode, error_text: &str) -> RegistryError {
        let message = match status.as_u16() {
            400 => "Invalid token request parameters".to_string(),
            401 => "Invalid credentials provided".to_string(),
            403 => "Access denied - insufficient permissions".to_string(),
            404 => "Authentication endpoint not found".to_string(),
            _ => format!("Authentication failed (status {}): {}", status, error_text),
        };

        RegistryError::Auth(message)
    }

    /// Classify a status code returned by a push operation
    pub fn status_disposition(code: u16) -> Disposition {
        match code {
            408 | 429 => Disposition::Retryable,
            500..=599 => Disposition::Retryable,
            _ => Disposition::Fatal,
        }
    }

    /// Classify any error raised while pushing to an endpoint.
    ///
    /// Authentication failures are fatal only when the token server answered; an
    /// unreachable token server is a connectivity problem like any other.
    pub fn disposition(error: &RegistryError) -> Disposition {
        match error {
            RegistryError::Network(_) => Disposition::Retryable,
            RegistryError::Status { code, .. } => Self::status_disposition(*code),
            RegistryError::Auth(_)
            | RegistryError::Io(_)
            | RegistryError::Parse(_)
            | RegistryError::Validation(_)
            | RegistryError::NotFound(_)
            | RegistryError::DigestMismatch { .. } => Disposition::Fatal,
        }
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> RegistryError {
        if error.is_timeout() {
            RegistryError::Network(format!("{} timeout: {}", context, error))
        } else if error.is_connect() {
            RegistryError::Network(format!("Connection error during {}: {}", context, error))
        } else if error.is_decode() {
            RegistryError::Parse(format!("Invalid response body during {}: {}", context, error))
        } else {
            RegistryError::Network(format!("{} network error: {}", context, error))
        }
    }
}
