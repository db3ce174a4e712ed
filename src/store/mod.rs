//! Local image store
//!
//! The orchestrator only needs to know whether a repository exists locally and which
//! tags it has; pushers additionally read manifests and blobs through the
//! [`TagRecord`]s of a [`RepositoryHandle`].

pub mod cache;
pub mod digest;
pub mod manifest;

pub use cache::CacheStore;
pub use digest::DigestUtils;
pub use manifest::ImageManifest;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Lookup of local repositories by local name
pub trait LocalStore: Send + Sync {
    fn lookup(&self, local_name: &str) -> Option<RepositoryHandle>;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub digest: String,
    pub size: u64,
    pub path: PathBuf,
    pub is_config: bool,
    #[serde(default)]
    pub media_type: String,
}

/// Where the manifest of one tag and the blobs it references live on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub manifest_path: PathBuf,
    pub config_digest: String,
    pub blobs: HashMap<String, BlobInfo>,
}

impl TagRecord {
    pub fn blob(&self, digest: &str) -> Option<&BlobInfo> {
        self.blobs.get(digest)
    }
}

/// A local repository and its tags, ordered by tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    name: String,
    tags: BTreeMap<String, TagRecord>,
}

impl RepositoryHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>, record: TagRecord) -> Self {
        self.tags.insert(tag.into(), record);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self, tag: &str) -> Option<&TagRecord> {
        self.tags.get(tag)
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
