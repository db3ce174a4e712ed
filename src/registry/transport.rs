//! Transport for the Docker Registry HTTP API v2
//!
//! [`RegistryTransport`] is the narrow set of registry operations a push needs. The
//! [`HttpTransport`] implementation talks HTTP through `reqwest`; pushers only see the
//! trait, so they can be exercised against an in-memory registry.

use crate::error::handlers::HttpErrorHandler;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::auth::{Auth, Credentials};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use std::time::Duration;

/// Header carrying the API version a registry implements
pub const API_VERSION_HEADER: &str = "docker-distribution-api-version";
/// Header carrying the digest of an uploaded manifest
pub const CONTENT_DIGEST_HEADER: &str = "docker-content-digest";

/// Registry operations used while pushing
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Ping `GET /v2/`; errors mean the endpoint does not serve the v2 API
    async fn check_api_version(&self, registry_url: &str) -> Result<ApiSupport>;

    /// Obtain a token scoped for pushing to `repository`
    async fn authenticate(
        &self,
        registry_url: &str,
        repository: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>>;

    /// Check if blob exists in registry
    async fn blob_exists(&self, request: &BlobRequest) -> Result<bool>;

    /// Upload a blob, returning its digest. The request is consumed so its data can
    /// become the body without a copy.
    async fn put_blob(&self, request: BlobPutRequest) -> Result<String>;

    /// Upload a manifest, returning the digest reported by the registry if any
    async fn put_manifest(&self, request: ManifestPutRequest) -> Result<Option<String>>;
}

/// Result of probing an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSupport {
    pub version: Option<String>,
    pub requires_auth: bool,
}

/// Blob request parameters
#[derive(Debug, Clone)]
pub struct BlobRequest {
    pub registry_url: String,
    pub repository: String,
    pub digest: String,
    pub token: Option<String>,
}

/// Blob upload request
#[derive(Debug, Clone)]
pub struct BlobPutRequest {
    pub registry_url: String,
    pub repository: String,
    pub digest: String,
    pub data: Vec<u8>,
    pub token: Option<String>,
}

/// Manifest upload request
#[derive(Debug, Clone)]
pub struct ManifestPutRequest {
    pub registry_url: String,
    pub repository: String,
    pub reference: String,
    pub data: Vec<u8>,
    pub content_type: String,
    pub token: Option<String>,
}

/// Settings for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub skip_tls: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            skip_tls: false,
        }
    }
}

/// `reqwest` based transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    auth: Auth,
    logger: Logger,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig, logger: Logger) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout);
        if config.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let client = builder
            .build()
            .map_err(|e| RegistryError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            auth: Auth::new(client.clone(), logger.clone()),
            client,
            logger,
        })
    }

    fn with_token(
        request: reqwest::RequestBuilder,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn error_text(response: reqwest::Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string())
    }

    /// Start an upload session and return the absolute upload location
    async fn start_upload(&self, request: &BlobPutRequest) -> Result<String> {
        let url = format!("{}/v2/{}/blobs/uploads/", request.registry_url, request.repository);
        let response = Self::with_token(self.client.post(&url), request.token.as_deref())
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = Self::error_text(response).await;
            return Err(HttpErrorHandler::handle_upload_error(status, &text, "upload start"));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| {
                RegistryError::Parse("Missing Location header in upload response".to_string())
            })?
            .to_str()
            .map_err(|e| RegistryError::Parse(format!("Invalid Location header: {}", e)))?;

        Ok(resolve_location(&request.registry_url, location))
    }
}

#[async_trait]
impl RegistryTransport for HttpTransport {
    async fn check_api_version(&self, registry_url: &str) -> Result<ApiSupport> {
        let url = format!("{}/v2/", registry_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        let version = response
            .headers()
            .get(API_VERSION_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        match status.as_u16() {
            200 => Ok(ApiSupport {
                version,
                requires_auth: false,
            }),
            401 => Ok(ApiSupport {
                version,
                requires_auth: true,
            }),
            code => Err(RegistryError::Status {
                code,
                message: format!("Registry API v2 not available at {}", registry_url),
            }),
        }
    }

    async fn authenticate(
        &self,
        registry_url: &str,
        repository: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>> {
        match credentials {
            Some(credentials) => {
                self.auth
                    .login_with_repository(registry_url, repository, credentials)
                    .await
            }
            None => Ok(None),
        }
    }

    async fn blob_exists(&self, request: &BlobRequest) -> Result<bool> {
        let url = format!(
            "{}/v2/{}/blobs/{}",
            request.registry_url, request.repository, request.digest
        );
        let response = Self::with_token(self.client.head(&url), request.token.as_deref())
            .send()
            .await?;

        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => {
                let status = response.status();
                Err(HttpErrorHandler::handle_upload_error(status, "", "blob check"))
            }
        }
    }

    async fn put_blob(&self, request: BlobPutRequest) -> Result<String> {
        let location = self.start_upload(&request).await?;
        let separator = if location.contains('?') { '&' } else { '?' };
        let url = format!("{}{}digest={}", location, separator, request.digest);

        let BlobPutRequest {
            digest, data, token, ..
        } = request;
        let response = Self::with_token(self.client.put(&url), token.as_deref())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, data.len().to_string())
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            self.logger.detail(&format!("Blob {} uploaded", short_digest(&digest)));
            Ok(digest)
        } else {
            let text = Self::error_text(response).await;
            Err(HttpErrorHandler::handle_upload_error(status, &text, "blob upload"))
        }
    }

    async fn put_manifest(&self, request: ManifestPutRequest) -> Result<Option<String>> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            request.registry_url, request.repository, request.reference
        );
        let response = Self::with_token(self.client.put(&url), request.token.as_deref())
            .header(CONTENT_TYPE, request.content_type)
            .body(request.data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response
                .headers()
                .get(CONTENT_DIGEST_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string()))
        } else {
            let text = Self::error_text(response).await;
            Err(HttpErrorHandler::handle_upload_error(status, &text, "manifest upload"))
        }
    }
}

/// Registries may answer with a relative upload location
pub fn resolve_location(registry_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else if location.starts_with('/') {
        format!("{}{}", registry_url.trim_end_matches('/'), location)
    } else {
        format!("{}/{}", registry_url.trim_end_matches('/'), location)
    }
}

/// First 12 hex characters of a digest, for log lines
pub fn short_digest(digest: &str) -> &str {
    let hex = digest.strip_prefix("sha256:").unwrap_or(digest);
    &hex[..hex.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("https://r.example.com", "/v2/app/blobs/uploads/123"),
            "https://r.example.com/v2/app/blobs/uploads/123"
        );
        assert_eq!(
            resolve_location("https://r.example.com", "https://cdn.example.com/upload?x=1"),
            "https://cdn.example.com/upload?x=1"
        );
    }

    #[test]
    fn test_short_digest() {
        assert_eq!(short_digest("sha256:0123456789abcdef0123"), "0123456789ab");
        assert_eq!(short_digest("abc"), "abc");
    }
}
