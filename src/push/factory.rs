//! Selection of the pusher matching an endpoint's protocol version

use crate::error::PushError;
use crate::logging::Logger;
use crate::push::config::PushConfig;
use crate::push::pusher::Pusher;
use crate::push::v2::V2Pusher;
use crate::registry::{ApiVersion, Endpoint, RegistryTransport};
use crate::repository::RepositoryInfo;
use crate::store::RepositoryHandle;
use std::sync::Arc;

/// Builds the pusher for one endpoint. Must not perform network I/O.
pub trait PusherFactory: Send + Sync {
    fn create(
        &self,
        endpoint: &Endpoint,
        repository: &RepositoryHandle,
        info: &RepositoryInfo,
        config: &PushConfig,
    ) -> Result<Box<dyn Pusher>, PushError>;
}

/// Factory dispatching on [`ApiVersion`]
#[derive(Clone)]
pub struct ProtocolPusherFactory {
    transport: Arc<dyn RegistryTransport>,
    logger: Logger,
}

impl ProtocolPusherFactory {
    pub fn new(transport: Arc<dyn RegistryTransport>, logger: Logger) -> Self {
        Self { transport, logger }
    }
}

impl PusherFactory for ProtocolPusherFactory {
    fn create(
        &self,
        endpoint: &Endpoint,
        repository: &RepositoryHandle,
        info: &RepositoryInfo,
        config: &PushConfig,
    ) -> Result<Box<dyn Pusher>, PushError> {
        match endpoint.version {
            ApiVersion::V2 => Ok(Box::new(V2Pusher::new(
                endpoint.clone(),
                repository.clone(),
                info.clone(),
                config.credentials.clone(),
                Arc::clone(&self.transport),
                self.logger.clone(),
            ))),
            ApiVersion::V1 => Err(PushError::UnsupportedProtocolVersion {
                version: endpoint.version,
                url: endpoint.base_url(),
            }),
        }
    }
}
