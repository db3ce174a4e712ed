//! Drives a push across the candidate endpoints of a repository
//!
//! Endpoints are tried strictly in order. A retryable failure moves on to the next
//! endpoint, a fatal failure ends the push, and the first endpoint that accepts every
//! pending tag ends it successfully.

use crate::error::PushError;
use crate::logging::Logger;
use crate::push::config::{PushRequest, PushSummary, PushedTag};
use crate::push::events::EventSink;
use crate::push::factory::PusherFactory;
use crate::push::pusher::PushOutcome;
use crate::registry::EndpointLookup;
use crate::repository::RepositoryResolver;
use crate::store::LocalStore;
use std::collections::VecDeque;
use std::sync::Arc;

/// Event action recorded for a completed push
pub const PUSH_ACTION: &str = "push";

pub struct PushOrchestrator {
    resolver: Arc<dyn RepositoryResolver>,
    endpoints: Arc<dyn EndpointLookup>,
    store: Arc<dyn LocalStore>,
    factory: Arc<dyn PusherFactory>,
    events: Arc<dyn EventSink>,
    logger: Logger,
}

impl PushOrchestrator {
    pub fn new(
        resolver: Arc<dyn RepositoryResolver>,
        endpoints: Arc<dyn EndpointLookup>,
        store: Arc<dyn LocalStore>,
        factory: Arc<dyn PusherFactory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            resolver,
            endpoints,
            store,
            factory,
            events,
            logger: Logger::new_quiet(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Push the repository named by `request.reference`.
    pub async fn run(&self, request: PushRequest) -> Result<PushSummary, PushError> {
        let PushRequest {
            reference,
            config,
            mut output,
        } = request;

        let info = self.resolver.resolve(&reference)?;

        if info.official {
            let username = config
                .credentials
                .as_ref()
                .map(|c| c.username.clone())
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "<user>".to_string());
            return Err(PushError::OfficialRepositoryRejected {
                username,
                local_name: info.local_name,
            });
        }

        let repository = self
            .store
            .lookup(&info.local_name)
            .ok_or_else(|| PushError::LocalRepositoryMissing(info.local_name.clone()))?;

        let tags = match &config.tag {
            Some(tag) => vec![tag.clone()],
            None => repository.tag_names(),
        };
        if tags.is_empty() {
            return Err(PushError::NoTagsToPush(info.local_name));
        }

        let endpoints = self.endpoints.endpoints_for(&info)?;
        if endpoints.is_empty() {
            return Err(PushError::NoEndpointsAvailable(info.canonical_name));
        }

        let status = format!(
            "The push refers to a repository [{}] (len: {})",
            info.canonical_name,
            tags.len()
        );
        if let Err(e) = config.formatter().write_status(output.as_mut(), "", &status) {
            self.logger.warning(&format!("Failed to write push status: {}", e));
        }

        let mut pending: VecDeque<String> = tags.into();
        let mut pushed: Vec<PushedTag> = Vec::new();
        let mut last_error: Option<PushError> = None;

        for endpoint in &endpoints {
            self.logger.debug(&format!(
                "Trying to push {} to {} {}",
                info.canonical_name,
                endpoint.base_url(),
                endpoint.version
            ));

            let mut pusher = match self.factory.create(endpoint, &repository, &info, &config) {
                Ok(pusher) => pusher,
                Err(e) => {
                    self.logger.debug(&format!("Skipping {}: {}", endpoint, e));
                    last_error = Some(e);
                    continue;
                }
            };

            while let Some(tag) = pending.front().cloned() {
                match pusher.push(&tag).await {
                    PushOutcome::Success => {
                        pending.pop_front();
                        pushed.push(PushedTag {
                            tag,
                            endpoint: endpoint.url.clone(),
                        });
                    }
                    PushOutcome::Retryable(e) => {
                        self.logger.debug(&format!(
                            "Push to {} failed, falling back: {}",
                            endpoint, e
                        ));
                        last_error = Some(e);
                        break;
                    }
                    PushOutcome::Fatal(e) => {
                        self.logger.debug(&format!("Not continuing with error: {}", e));
                        return Err(e);
                    }
                }
            }

            if pending.is_empty() {
                self.events.log(PUSH_ACTION, &info.local_name, "");
                return Ok(PushSummary {
                    canonical_name: info.canonical_name,
                    pushed,
                });
            }
        }

        let last_error = last_error
            .unwrap_or_else(|| PushError::NoEndpointsAvailable(info.canonical_name.clone()));

        if pushed.is_empty() {
            Err(last_error)
        } else {
            Err(PushError::IncompletePush {
                pushed: pushed.into_iter().map(|p| p.tag).collect(),
                remaining: pending.into_iter().collect(),
                source: Box::new(last_error),
            })
        }
    }
}
