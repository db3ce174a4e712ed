//! Bearer token authentication for registry access

use crate::error::handlers::{Disposition, HttpErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credentials used against a registry
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub realm: String,
    pub service: String,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Auth {
    client: Client,
    logger: Logger,
}

impl Auth {
    pub fn new(client: Client, logger: Logger) -> Self {
        Self { client, logger }
    }

    /// Obtain a push token for `repository` on `registry_url`.
    ///
    /// Returns `Ok(None)` when the registry does not ask for bearer authentication.
    pub async fn login_with_repository(
        &self,
        registry_url: &str,
        repository: &str,
        credentials: &Credentials,
    ) -> Result<Option<String>> {
        self.logger.verbose(&format!(
            "Attempting authentication for user: {}",
            credentials.username
        ));

        let Some(mut challenge) = self.get_auth_challenge(registry_url).await? else {
            self.logger.detail("No authentication challenge - registry may not require auth");
            return Ok(None);
        };
        challenge.scope = Some(format!("repository:{}:pull,push", repository));

        self.get_token(&challenge, credentials).await
    }

    async fn get_auth_challenge(&self, registry_url: &str) -> Result<Option<AuthChallenge>> {
        let url = format!("{}/v2/", registry_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            RegistryError::Network(format!("Failed to get auth challenge: {}", e))
        })?;

        self.logger.detail(&format!("Auth challenge response status: {}", response.status()));

        if response.status().as_u16() != 401 {
            return Ok(None);
        }

        match response.headers().get("www-authenticate") {
            Some(header) => {
                let header = header
                    .to_str()
                    .map_err(|e| RegistryError::Parse(format!("Invalid auth header: {}", e)))?;
                Ok(parse_auth_challenge(header))
            }
            None => Ok(None),
        }
    }

    async fn get_token(
        &self,
        challenge: &AuthChallenge,
        credentials: &Credentials,
    ) -> Result<Option<String>> {
        let mut request = self
            .client
            .get(&challenge.realm)
            .query(&[("service", challenge.service.as_str())])
            .basic_auth(&credentials.username, Some(&credentials.password));
        if let Some(scope) = &challenge.scope {
            request = request.query(&[("scope", scope.as_str())]);
        }

        self.logger.detail(&format!("Requesting token from: {}", challenge.realm));

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Network(format!("Failed to get auth token: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            if HttpErrorHandler::status_disposition(status.as_u16()) == Disposition::Retryable {
                return Err(RegistryError::Status {
                    code: status.as_u16(),
                    message: format!("Token server error: {}", error_text),
                });
            }
            return Err(HttpErrorHandler::handle_auth_error(status, &error_text));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse token response: {}", e)))?;

        let token = token_response.token.or(token_response.access_token);
        if let Some(token) = &token {
            self.logger.detail(&format!("Token obtained (length: {} chars)", token.len()));
        }
        Ok(token)
    }
}

/// Parse `Bearer realm="...",service="...",scope="..."`
pub fn parse_auth_challenge(header: &str) -> Option<AuthChallenge> {
    let params_str = header.strip_prefix("Bearer ")?;

    let mut params = HashMap::new();
    for param in split_unquoted(params_str, ',') {
        if let Some((key, value)) = param.trim().split_once('=') {
            params.insert(key.trim(), value.trim().trim_matches('"'));
        }
    }

    let realm = params.get("realm")?;
    Some(AuthChallenge {
        realm: realm.to_string(),
        service: params.get("service").copied().unwrap_or_default().to_string(),
        scope: params.get("scope").map(|s| s.to_string()),
    })
}

/// Split on `separator` except inside double-quoted values
fn split_unquoted(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in input.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == separator && !quoted {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_challenge() {
        let challenge = parse_auth_challenge(
            r#"Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:team/app:pull""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "https://auth.example.com/token");
        assert_eq!(challenge.service, "registry.example.com");
        assert_eq!(challenge.scope.as_deref(), Some("repository:team/app:pull"));
    }

    #[test]
    fn test_parse_challenge_with_commas_in_values() {
        let challenge = parse_auth_challenge(
            r#"Bearer realm="https://auth.example.com/token?a=1,2",service="registry",scope="repository:team/app:pull,push""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "https://auth.example.com/token?a=1,2");
        assert_eq!(challenge.service, "registry");
        assert_eq!(challenge.scope.as_deref(), Some("repository:team/app:pull,push"));
    }

    #[test]
    fn test_parse_non_bearer_challenge() {
        assert!(parse_auth_challenge(r#"Basic realm="registry""#).is_none());
        assert!(parse_auth_challenge(r#"Bearer service="x""#).is_none());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let rendered = format!("{:?}", Credentials::new("alice", "s3cret"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }
}
