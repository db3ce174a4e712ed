//! Command-line argument parsing

use crate::output::StatusFormat;
use crate::registry::EndpointConfig;
use crate::repository::{parse_repository_tag, validate_tag};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "manifest-pusher")]
#[command(about = "Push an image manifest from the local cache to a registry")]
#[command(version)]
pub struct Args {
    /// Repository to push, NAME[:TAG]; without a tag every cached tag is pushed
    #[arg(value_name = "NAME[:TAG]")]
    pub name: String,

    /// Registry username
    #[arg(long = "username", short = 'u')]
    pub username: Option<String>,

    /// Registry password
    #[arg(long = "password", short = 'p')]
    pub password: Option<String>,

    /// Local image cache directory
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<String>,

    /// Configuration file path (JSON)
    #[arg(long = "config")]
    pub config: Option<String>,

    /// Endpoint to try before the derived ones; repeatable
    #[arg(long = "endpoint", value_name = "URL[,VERSION]")]
    pub endpoints: Vec<EndpointConfig>,

    /// Registry that may also be reached over plain http; repeatable
    #[arg(long = "insecure-registry", value_name = "HOST[:PORT]")]
    pub insecure_registries: Vec<String>,

    /// Timeout for network operations in seconds
    #[arg(long = "timeout", short = 't')]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long = "skip-tls", short = 'k')]
    pub skip_tls: bool,

    /// Progress stream format: text or json
    #[arg(long = "output", short = 'o')]
    pub output: Option<StatusFormat>,

    /// Verbose output
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Only print errors
    #[arg(long = "quiet", short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse().from_env()
    }

    /// Split the positional argument into repository and tag
    pub fn repository_and_tag(&self) -> (String, Option<String>) {
        parse_repository_tag(&self.name)
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        let (repository, tag) = self.repository_and_tag();
        if repository.is_empty() {
            return Err("Repository name cannot be empty".to_string());
        }
        if let Some(tag) = &tag {
            // Digest references are checked by the registry
            if !tag.contains(':') {
                validate_tag(tag)?;
            }
        }

        match (&self.username, &self.password) {
            (Some(_), None) => {
                return Err("Password is required when username is provided".to_string());
            }
            (None, Some(_)) => {
                return Err("Username is required when password is provided".to_string());
            }
            _ => {}
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Fill credentials from the environment when not given as flags
    pub fn from_env(self) -> Self {
        self.from_env_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.username.is_none() {
            self.username = lookup("MANIFEST_PUSHER_USERNAME");
        }
        if self.password.is_none() {
            self.password = lookup("MANIFEST_PUSHER_PASSWORD");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ApiVersion;

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "manifest-pusher",
            "registry.local:5000/team/app:v1",
            "-u",
            "alice",
            "-p",
            "secret",
            "--endpoint",
            "https://edge.local",
            "--endpoint",
            "https://legacy.local,v1",
            "--insecure-registry",
            "registry.local:5000",
            "-o",
            "json",
            "-v",
        ])
        .unwrap();

        assert_eq!(
            args.repository_and_tag(),
            ("registry.local:5000/team/app".to_string(), Some("v1".to_string()))
        );
        assert_eq!(args.endpoints.len(), 2);
        assert_eq!(args.endpoints[1].version, ApiVersion::V1);
        assert_eq!(args.output, Some(StatusFormat::Json));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["manifest-pusher", "app", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_validate_credential_pairing() {
        let args = Args::try_parse_from(["manifest-pusher", "team/app", "-u", "alice"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_tag() {
        let args = Args::try_parse_from(["manifest-pusher", "team/app:-bad"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_credentials_from_env() {
        let args = Args::try_parse_from(["manifest-pusher", "team/app", "-u", "bob"])
            .unwrap()
            .from_env_lookup(|key| match key {
                "MANIFEST_PUSHER_USERNAME" => Some("alice".to_string()),
                "MANIFEST_PUSHER_PASSWORD" => Some("secret".to_string()),
                _ => None,
            });
        assert_eq!(args.username.as_deref(), Some("bob"));
        assert_eq!(args.password.as_deref(), Some("secret"));
    }
}
