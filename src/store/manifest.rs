//! Image manifest documents
//!
//! Only the parts needed to push are modelled: the media type and the blobs the
//! manifest references, in upload order.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};

pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const OCI_MANIFEST_V1: &str = "application/vnd.oci.image.manifest.v1+json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

impl ImageManifest {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let manifest: ImageManifest = serde_json::from_slice(data)
            .map_err(|e| RegistryError::Parse(format!("Invalid manifest JSON: {}", e)))?;
        if manifest.schema_version != 2 {
            return Err(RegistryError::Validation(format!(
                "Unsupported manifest schema version {}",
                manifest.schema_version
            )));
        }
        Ok(manifest)
    }

    /// Content type to send with the manifest
    pub fn content_type(&self) -> &str {
        self.media_type.as_deref().unwrap_or(DOCKER_MANIFEST_V2)
    }

    /// Config digest followed by layer digests, without duplicates
    pub fn blob_digests(&self) -> Vec<&str> {
        let mut digests: Vec<&str> = Vec::with_capacity(self.layers.len() + 1);
        for digest in std::iter::once(&self.config)
            .chain(self.layers.iter())
            .map(|d| d.digest.as_str())
        {
            if !digests.contains(&digest) {
                digests.push(digest);
            }
        }
        digests
    }
}
