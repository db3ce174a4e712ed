//! Push requests and their results

use crate::output::{StatusFormat, StreamFormatter};
use crate::registry::Credentials;
use std::io::Write;
use url::Url;

/// Endpoint independent settings of one push
#[derive(Debug, Clone, Default)]
pub struct PushConfig {
    /// `None` pushes every tag known locally
    pub tag: Option<String>,
    pub credentials: Option<Credentials>,
    pub format: StatusFormat,
}

impl PushConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tag means "all tags"
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.tag = (!tag.is_empty()).then_some(tag);
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_format(mut self, format: StatusFormat) -> Self {
        self.format = format;
        self
    }

    pub fn formatter(&self) -> StreamFormatter {
        StreamFormatter::new(self.format)
    }
}

/// One push call: what to push and where progress goes
pub struct PushRequest {
    pub reference: String,
    pub config: PushConfig,
    pub output: Box<dyn Write + Send>,
}

impl PushRequest {
    pub fn new(
        reference: impl Into<String>,
        config: PushConfig,
        output: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            reference: reference.into(),
            config,
            output,
        }
    }
}

impl std::fmt::Debug for PushRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushRequest")
            .field("reference", &self.reference)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedTag {
    pub tag: String,
    pub endpoint: Url,
}

/// Result of a successful push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSummary {
    pub canonical_name: String,
    pub pushed: Vec<PushedTag>,
}

impl PushSummary {
    pub fn tags(&self) -> Vec<&str> {
        self.pushed.iter().map(|p| p.tag.as_str()).collect()
    }
}
