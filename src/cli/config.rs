//! Configuration management module
//!
//! Settings come from, in increasing precedence: built-in defaults, a JSON config
//! file, `MANIFEST_PUSHER_*` environment variables and command-line flags.

use crate::error::{RegistryError, Result};
use crate::output::StatusFormat;
use crate::registry::EndpointConfig;
use crate::repository::DEFAULT_INDEX;
use crate::store::cache::CACHE_DIR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const ENV_PREFIX: &str = "MANIFEST_PUSHER_";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache_dir: String,
    /// Network timeout in seconds
    pub timeout: u64,
    pub skip_tls: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub output_format: StatusFormat,
    /// Index used for references without a registry host
    pub default_index: String,
    /// Indexes that may also be reached over plain http
    pub insecure_registries: Vec<String>,
    /// Extra endpoints per index, tried before the derived ones
    pub endpoints: BTreeMap<String, Vec<EndpointConfig>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: CACHE_DIR.to_string(),
            timeout: 300,
            skip_tls: false,
            verbose: false,
            quiet: false,
            output_format: StatusFormat::Text,
            default_index: DEFAULT_INDEX.to_string(),
            insecure_registries: Vec::new(),
            endpoints: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.is_empty() {
            return Err(RegistryError::Validation(
                "cache_dir cannot be empty".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(RegistryError::Validation(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.timeout > 86400 {
            return Err(RegistryError::Validation(
                "timeout cannot exceed 24 hours (86400 seconds)".to_string(),
            ));
        }
        if self.default_index.is_empty() {
            return Err(RegistryError::Validation(
                "default_index cannot be empty".to_string(),
            ));
        }
        for (index, endpoints) in &self.endpoints {
            for endpoint in endpoints {
                url::Url::parse(&endpoint.url).map_err(|e| {
                    RegistryError::Validation(format!(
                        "Invalid endpoint URL {} for {}: {}",
                        endpoint.url, index, e
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Io(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            RegistryError::Parse(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Apply `MANIFEST_PUSHER_*` overrides read through `lookup`
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let flag = |value: String| value.eq_ignore_ascii_case("true") || value == "1";
        let list = |value: String| -> Vec<String> {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        if let Some(val) = var("CACHE_DIR") {
            self.cache_dir = val;
        }
        if let Some(timeout) = var("TIMEOUT").and_then(|v| v.parse().ok()) {
            self.timeout = timeout;
        }
        if let Some(val) = var("SKIP_TLS") {
            self.skip_tls = flag(val);
        }
        if let Some(val) = var("VERBOSE") {
            self.verbose = flag(val);
        }
        if let Some(format) = var("OUTPUT").and_then(|v| v.parse().ok()) {
            self.output_format = format;
        }
        if let Some(val) = var("DEFAULT_INDEX") {
            self.default_index = val;
        }
        if let Some(val) = var("INSECURE_REGISTRIES") {
            self.insecure_registries = list(val);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ApiVersion;
    use std::collections::HashMap;

    #[test]
    fn test_default_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            timeout: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "registry.local".to_string(),
            vec![EndpointConfig {
                url: "not a url".to_string(),
                version: ApiVersion::V2,
            }],
        );
        let config = AppConfig {
            endpoints,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MANIFEST_PUSHER_CACHE_DIR", "/var/cache/images"),
            ("MANIFEST_PUSHER_TIMEOUT", "60"),
            ("MANIFEST_PUSHER_SKIP_TLS", "true"),
            ("MANIFEST_PUSHER_OUTPUT", "json"),
            ("MANIFEST_PUSHER_INSECURE_REGISTRIES", "a.local:5000, b.local,"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::default()
            .with_env_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.cache_dir, "/var/cache/images");
        assert_eq!(config.timeout, 60);
        assert!(config.skip_tls);
        assert!(!config.verbose);
        assert_eq!(config.output_format, StatusFormat::Json);
        assert_eq!(
            config.insecure_registries,
            vec!["a.local:5000".to_string(), "b.local".to_string()]
        );
    }

    #[test]
    fn test_unparsable_env_values_are_ignored() {
        let config = AppConfig::default().with_env_lookup(|key| match key {
            "MANIFEST_PUSHER_TIMEOUT" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.timeout, 300);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "timeout": 30,
                "insecure_registries": ["registry.local:5000"],
                "endpoints": {
                    "registry.local:5000": [{"url": "https://edge.local:5000"}, {"url": "https://old.local", "version": "v1"}]
                }
            }"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.cache_dir, CACHE_DIR);
        let endpoints = &config.endpoints["registry.local:5000"];
        assert_eq!(endpoints[0].version, ApiVersion::V2);
        assert_eq!(endpoints[1].version, ApiVersion::V1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_missing_file() {
        assert!(matches!(
            AppConfig::from_file("/nonexistent/manifest-pusher.json"),
            Err(RegistryError::Io(_))
        ));
    }
}
