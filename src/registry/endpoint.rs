//! Registry endpoints and their protocol versions

use crate::error::PushError;
use crate::repository::{DEFAULT_INDEX, RepositoryInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Host serving the registry API for the default index
pub const DEFAULT_V2_REGISTRY: &str = "https://registry-1.docker.io";

/// Registry API versions an endpoint may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V1,
    V2,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => write!(f, "v1"),
            ApiVersion::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(ApiVersion::V1),
            "v2" | "2" => Ok(ApiVersion::V2),
            other => Err(format!("unknown registry API version: {}", other)),
        }
    }
}

/// One candidate location for a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: Url,
    pub version: ApiVersion,
}

impl Endpoint {
    pub fn new(url: Url, version: ApiVersion) -> Self {
        Self { url, version }
    }

    pub fn parse(url: &str, version: ApiVersion) -> crate::error::Result<Self> {
        Ok(Self::new(Url::parse(url)?, version))
    }

    /// Base address without a trailing slash, ready for `/v2/...` paths
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.base_url(), self.version)
    }
}

/// Produces the ordered endpoint list for a repository; the first entry is tried first
pub trait EndpointLookup: Send + Sync {
    fn endpoints_for(&self, info: &RepositoryInfo) -> Result<Vec<Endpoint>, PushError>;
}

/// Endpoint entry in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default = "default_version")]
    pub version: ApiVersion,
}

fn default_version() -> ApiVersion {
    ApiVersion::V2
}

impl FromStr for EndpointConfig {
    type Err = String;

    /// Parses `URL[,VERSION]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (url, version) = match s.split_once(',') {
            Some((url, version)) => (url.trim(), version.parse()?),
            None => (s.trim(), ApiVersion::V2),
        };
        Url::parse(url).map_err(|e| format!("invalid endpoint URL {:?}: {}", url, e))?;
        Ok(Self {
            url: url.to_string(),
            version,
        })
    }
}

/// Endpoint lookup driven by configuration.
///
/// Order: preferred endpoints (given on the command line, apply to every index),
/// configured endpoints for the index, the index itself over https as v2 and then v1,
/// and finally plain http for registries marked insecure. Pull mirrors never take
/// pushes and are not listed.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredEndpoints {
    preferred: Vec<EndpointConfig>,
    configured: BTreeMap<String, Vec<EndpointConfig>>,
    insecure_registries: Vec<String>,
}

impl ConfiguredEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferred(mut self, preferred: Vec<EndpointConfig>) -> Self {
        self.preferred = preferred;
        self
    }

    pub fn with_configured(mut self, configured: BTreeMap<String, Vec<EndpointConfig>>) -> Self {
        self.configured = configured;
        self
    }

    pub fn with_insecure_registries(mut self, insecure: Vec<String>) -> Self {
        self.insecure_registries = insecure;
        self
    }

    fn lookup_error(info: &RepositoryInfo, reason: impl fmt::Display) -> PushError {
        PushError::EndpointLookup {
            name: info.canonical_name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl EndpointLookup for ConfiguredEndpoints {
    fn endpoints_for(&self, info: &RepositoryInfo) -> Result<Vec<Endpoint>, PushError> {
        let mut endpoints = Vec::new();

        let configured = self.configured.get(&info.index_name).into_iter().flatten();
        for config in self.preferred.iter().chain(configured) {
            let url = Url::parse(&config.url).map_err(|e| Self::lookup_error(info, e))?;
            endpoints.push(Endpoint::new(url, config.version));
        }

        let secure = if info.index_name == DEFAULT_INDEX {
            DEFAULT_V2_REGISTRY.to_string()
        } else {
            format!("https://{}", info.index_name)
        };
        let secure = Url::parse(&secure).map_err(|e| Self::lookup_error(info, e))?;
        endpoints.push(Endpoint::new(secure.clone(), ApiVersion::V2));
        endpoints.push(Endpoint::new(secure, ApiVersion::V1));

        if self.insecure_registries.iter().any(|r| r == &info.index_name) {
            let plain = Url::parse(&format!("http://{}", info.index_name))
                .map_err(|e| Self::lookup_error(info, e))?;
            endpoints.push(Endpoint::new(plain, ApiVersion::V2));
        }

        // Configured entries may repeat a derived one; keep the first occurrence.
        let mut seen = Vec::with_capacity(endpoints.len());
        endpoints.retain(|e| {
            let key = (e.base_url(), e.version);
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });

        Ok(endpoints)
    }
}
