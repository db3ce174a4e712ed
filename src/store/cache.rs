//! Filesystem image cache
//!
//! Layout, compatible with the registry API's addressing:
//! ```text
//! <cache_dir>/
//!   manifests/{repository}/{reference}
//!   blobs/sha256/{hex}
//!   index.json
//! ```
//! `index.json` maps `{repository}/{reference}` to the manifest path, config digest and
//! the blobs the manifest references.

use crate::error::{RegistryError, Result};
use crate::store::digest::{DigestUtils, SHA256_PREFIX};
use crate::store::manifest::ImageManifest;
use crate::store::{BlobInfo, LocalStore, RepositoryHandle, TagRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const CACHE_DIR: &str = ".cache";
pub const MANIFESTS_DIR: &str = "manifests";
pub const BLOBS_DIR: &str = "blobs";
pub const SHA256_DIR: &str = "sha256";
pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    repository: String,
    reference: String,
    manifest_path: PathBuf,
    config_digest: String,
    blobs: HashMap<String, BlobInfo>,
}

/// Local store backed by the on-disk cache
#[derive(Debug)]
pub struct CacheStore {
    cache_dir: PathBuf,
    index: BTreeMap<String, CacheEntry>,
}

impl CacheStore {
    /// Open (creating if needed) the cache rooted at `cache_dir`
    pub fn open<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(cache_dir.join(MANIFESTS_DIR))?;
        fs::create_dir_all(cache_dir.join(BLOBS_DIR).join(SHA256_DIR))?;

        let index_path = cache_dir.join(INDEX_FILE);
        let index = if index_path.exists() {
            let contents = fs::read_to_string(&index_path)?;
            serde_json::from_str(&contents)
                .map_err(|e| RegistryError::Parse(format!("Failed to parse cache index: {}", e)))?
        } else {
            BTreeMap::new()
        };

        Ok(Self { cache_dir, index })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get blob path from digest
    pub fn blob_path(&self, digest: &str) -> PathBuf {
        self.cache_dir
            .join(BLOBS_DIR)
            .join(SHA256_DIR)
            .join(digest.trim_start_matches(SHA256_PREFIX))
    }

    /// Store blob content, returning its digest
    pub fn add_blob(&mut self, data: &[u8]) -> Result<String> {
        let digest = DigestUtils::compute_docker_digest(data);
        let path = self.blob_path(&digest);
        let up_to_date = fs::metadata(&path)
            .map(|m| m.len() == data.len() as u64)
            .unwrap_or(false);
        if !up_to_date {
            fs::write(&path, data)?;
        }
        Ok(digest)
    }

    /// Record `manifest` as `repository:reference`.
    ///
    /// Every blob the manifest references must already be in the cache.
    pub fn save_manifest(
        &mut self,
        repository: &str,
        reference: &str,
        manifest: &[u8],
    ) -> Result<PathBuf> {
        let parsed = ImageManifest::parse(manifest)?;

        let mut blobs = HashMap::new();
        for descriptor in std::iter::once(&parsed.config).chain(parsed.layers.iter()) {
            let digest = DigestUtils::normalize_digest(&descriptor.digest)?;
            let path = self.blob_path(&digest);
            let size = fs::metadata(&path)
                .map_err(|_| {
                    RegistryError::NotFound(format!("Blob {} not found in cache", digest))
                })?
                .len();
            blobs.insert(
                digest.clone(),
                BlobInfo {
                    is_config: descriptor.digest == parsed.config.digest,
                    media_type: descriptor.media_type.clone().unwrap_or_default(),
                    digest,
                    size,
                    path,
                },
            );
        }

        let manifest_dir = self.cache_dir.join(MANIFESTS_DIR).join(repository);
        fs::create_dir_all(&manifest_dir)?;
        let manifest_path = manifest_dir.join(reference);
        fs::write(&manifest_path, manifest)?;

        self.index.insert(
            format!("{}/{}", repository, reference),
            CacheEntry {
                repository: repository.to_string(),
                reference: reference.to_string(),
                manifest_path: manifest_path.clone(),
                config_digest: parsed.config.digest.clone(),
                blobs,
            },
        );
        self.save_index()?;

        Ok(manifest_path)
    }

    /// Names of all cached repositories
    pub fn repositories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.values().map(|e| e.repository.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    fn save_index(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.index)?;
        let tmp = self.cache_dir.join(format!("{}.tmp", INDEX_FILE));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, self.cache_dir.join(INDEX_FILE))?;
        Ok(())
    }
}

impl LocalStore for CacheStore {
    fn lookup(&self, local_name: &str) -> Option<RepositoryHandle> {
        let mut handle = RepositoryHandle::new(local_name);
        let mut found = false;

        for entry in self.index.values().filter(|e| e.repository == local_name) {
            found = true;
            handle = handle.with_tag(
                entry.reference.clone(),
                TagRecord {
                    manifest_path: entry.manifest_path.clone(),
                    config_digest: entry.config_digest.clone(),
                    blobs: entry.blobs.clone(),
                },
            );
        }

        found.then_some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_for(config: &str, layers: &[&str]) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
            "config": {"mediaType": "application/vnd.docker.container.image.v1+json", "size": 2, "digest": config},
            "layers": layers.iter().map(|d| serde_json::json!({
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "size": 5,
                "digest": d,
            })).collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    #[test]
    fn test_save_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path()).unwrap();

        let config = store.add_blob(b"{}").unwrap();
        let layer = store.add_blob(b"layer").unwrap();
        store
            .save_manifest("team/app", "v1", &manifest_for(&config, &[&layer]))
            .unwrap();
        store
            .save_manifest("team/app", "latest", &manifest_for(&config, &[&layer]))
            .unwrap();

        let handle = store.lookup("team/app").unwrap();
        assert_eq!(handle.name(), "team/app");
        assert_eq!(handle.tag_names(), vec!["latest".to_string(), "v1".to_string()]);

        let record = handle.tag("v1").unwrap();
        assert_eq!(record.config_digest, config);
        assert!(record.blob(&config).unwrap().is_config);
        assert_eq!(record.blob(&layer).unwrap().size, 5);
        assert!(store.lookup("team/other").is_none());
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = CacheStore::open(dir.path()).unwrap();
            let config = store.add_blob(b"{}").unwrap();
            store
                .save_manifest("app", "v1", &manifest_for(&config, &[]))
                .unwrap();
        }

        let store = CacheStore::open(dir.path()).unwrap();
        assert_eq!(store.repositories(), vec!["app".to_string()]);
        assert_eq!(store.lookup("app").unwrap().len(), 1);
    }

    #[test]
    fn test_save_manifest_requires_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path()).unwrap();
        let missing = DigestUtils::compute_docker_digest(b"never stored");

        let result = store.save_manifest("app", "v1", &manifest_for(&missing, &[]));
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
        assert!(store.lookup("app").is_none());
    }
}
