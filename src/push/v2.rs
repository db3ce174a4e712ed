//! Pusher for the Registry API v2
//!
//! For each tag: ping the endpoint, authenticate once, upload every blob the
//! manifest references that the registry does not already have, then upload the
//! manifest under the tag.

use crate::error::{PushError, RegistryError};
use crate::logging::Logger;
use crate::push::pusher::{PushOutcome, Pusher};
use crate::registry::transport::short_digest;
use crate::registry::{
    BlobPutRequest, BlobRequest, Credentials, Endpoint, ManifestPutRequest, RegistryTransport,
};
use crate::repository::RepositoryInfo;
use crate::store::{DigestUtils, ImageManifest, RepositoryHandle, TagRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

type StepResult<T> = std::result::Result<T, PushOutcome>;

fn fatal(error: RegistryError) -> PushOutcome {
    PushOutcome::Fatal(error.into())
}

pub struct V2Pusher {
    endpoint: Endpoint,
    repository: RepositoryHandle,
    info: RepositoryInfo,
    credentials: Option<Credentials>,
    transport: Arc<dyn RegistryTransport>,
    logger: Logger,
    /// `Some` once the endpoint was pinged and authenticated against
    session: Option<Option<String>>,
    layers_pushed: HashSet<String>,
}

impl V2Pusher {
    pub fn new(
        endpoint: Endpoint,
        repository: RepositoryHandle,
        info: RepositoryInfo,
        credentials: Option<Credentials>,
        transport: Arc<dyn RegistryTransport>,
        logger: Logger,
    ) -> Self {
        Self {
            endpoint,
            repository,
            info,
            credentials,
            transport,
            logger,
            session: None,
            layers_pushed: HashSet::new(),
        }
    }

    /// Ping the endpoint and fetch a token, once per pusher
    async fn session(&mut self) -> StepResult<Option<String>> {
        if let Some(token) = &self.session {
            return Ok(token.clone());
        }

        let base = self.endpoint.base_url();
        // Whatever goes wrong here says the endpoint does not serve v2 to us.
        let support = self
            .transport
            .check_api_version(&base)
            .await
            .map_err(|e| PushOutcome::Retryable(e.into()))?;
        self.logger.detail(&format!(
            "{} speaks {} (auth required: {})",
            base,
            support.version.as_deref().unwrap_or("registry/2.0"),
            support.requires_auth
        ));

        let token = if support.requires_auth || self.credentials.is_some() {
            self.transport
                .authenticate(&base, &self.info.remote_name, self.credentials.as_ref())
                .await
                .map_err(PushOutcome::from_registry_error)?
        } else {
            None
        };

        self.session = Some(token.clone());
        Ok(token)
    }

    async fn push_blob(
        &mut self,
        record: &TagRecord,
        digest: &str,
        token: Option<&str>,
    ) -> StepResult<()> {
        let digest = DigestUtils::normalize_digest(digest).map_err(fatal)?;
        if self.layers_pushed.contains(&digest) {
            return Ok(());
        }

        let blob = record.blob(&digest).ok_or_else(|| {
            fatal(RegistryError::NotFound(format!(
                "Blob {} referenced by the manifest is missing from the local store",
                digest
            )))
        })?;

        let request = BlobRequest {
            registry_url: self.endpoint.base_url(),
            repository: self.info.remote_name.clone(),
            digest: digest.clone(),
            token: token.map(str::to_string),
        };
        let exists = self
            .transport
            .blob_exists(&request)
            .await
            .map_err(PushOutcome::from_registry_error)?;

        if exists {
            self.logger.detail(&format!("Blob {} already exists", short_digest(&digest)));
        } else {
            let data = tokio::fs::read(&blob.path)
                .await
                .map_err(|e| fatal(e.into()))?;
            DigestUtils::verify(&data, &digest).map_err(fatal)?;

            self.logger.detail(&format!(
                "Pushing blob {} ({} bytes)",
                short_digest(&digest),
                data.len()
            ));
            self.transport
                .put_blob(BlobPutRequest {
                    registry_url: request.registry_url,
                    repository: request.repository,
                    digest: digest.clone(),
                    data,
                    token: request.token,
                })
                .await
                .map_err(PushOutcome::from_registry_error)?;
        }

        self.layers_pushed.insert(digest);
        Ok(())
    }

    async fn push_tag(&mut self, tag: &str) -> StepResult<()> {
        let record = self.repository.tag(tag).cloned().ok_or_else(|| {
            PushOutcome::Fatal(PushError::TagNotFound {
                repository: self.repository.name().to_string(),
                tag: tag.to_string(),
            })
        })?;

        let token = self.session().await?;

        let manifest_data = tokio::fs::read(&record.manifest_path)
            .await
            .map_err(|e| fatal(e.into()))?;
        let manifest = ImageManifest::parse(&manifest_data).map_err(fatal)?;

        for digest in manifest.blob_digests() {
            self.push_blob(&record, digest, token.as_deref()).await?;
        }

        let digest = self
            .transport
            .put_manifest(ManifestPutRequest {
                registry_url: self.endpoint.base_url(),
                repository: self.info.remote_name.clone(),
                reference: tag.to_string(),
                content_type: manifest.content_type().to_string(),
                data: manifest_data,
                token,
            })
            .await
            .map_err(PushOutcome::from_registry_error)?;

        self.logger.verbose(&format!(
            "{}: digest: {}",
            tag,
            digest.unwrap_or_else(|| "unknown".to_string())
        ));
        Ok(())
    }
}

#[async_trait]
impl Pusher for V2Pusher {
    async fn push(&mut self, tag: &str) -> PushOutcome {
        match self.push_tag(tag).await {
            Ok(()) => PushOutcome::Success,
            Err(outcome) => outcome,
        }
    }
}
