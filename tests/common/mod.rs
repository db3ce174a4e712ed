#![allow(dead_code)]

use async_trait::async_trait;
use manifest_pusher::error::PushError;
use manifest_pusher::push::{PushConfig, PushOutcome, Pusher, PusherFactory};
use manifest_pusher::registry::{ApiVersion, Endpoint, EndpointLookup};
use manifest_pusher::repository::{RepositoryInfo, RepositoryResolver};
use manifest_pusher::store::{LocalStore, RepositoryHandle, TagRecord};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn info(local_name: &str) -> RepositoryInfo {
    RepositoryInfo {
        index_name: "registry.local".to_string(),
        remote_name: local_name.to_string(),
        canonical_name: format!("registry.local/{}", local_name),
        local_name: local_name.to_string(),
        official: false,
    }
}

pub fn endpoint(host: &str) -> Endpoint {
    Endpoint::parse(&format!("https://{}", host), ApiVersion::V2).unwrap()
}

pub fn handle(name: &str, tags: &[&str]) -> RepositoryHandle {
    tags.iter().fold(RepositoryHandle::new(name), |handle, tag| {
        handle.with_tag(
            *tag,
            TagRecord {
                manifest_path: PathBuf::from(format!("/nonexistent/{}", tag)),
                config_digest: String::new(),
                blobs: HashMap::new(),
            },
        )
    })
}

/// Resolves every reference to the same repository
pub struct StaticResolver(pub RepositoryInfo);

impl RepositoryResolver for StaticResolver {
    fn resolve(&self, _reference: &str) -> Result<RepositoryInfo, PushError> {
        Ok(self.0.clone())
    }
}

pub struct FailingResolver(pub PushError);

impl RepositoryResolver for FailingResolver {
    fn resolve(&self, _reference: &str) -> Result<RepositoryInfo, PushError> {
        Err(self.0.clone())
    }
}

/// Endpoint lookup with a fixed answer that counts how often it was asked
pub struct StaticEndpoints {
    result: Result<Vec<Endpoint>, PushError>,
    calls: AtomicUsize,
}

impl StaticEndpoints {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            result: Ok(endpoints),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: PushError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EndpointLookup for StaticEndpoints {
    fn endpoints_for(&self, _info: &RepositoryInfo) -> Result<Vec<Endpoint>, PushError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    repositories: HashMap<String, RepositoryHandle>,
}

impl MemoryStore {
    pub fn with(mut self, handle: RepositoryHandle) -> Self {
        self.repositories.insert(handle.name().to_string(), handle);
        self
    }
}

impl LocalStore for MemoryStore {
    fn lookup(&self, local_name: &str) -> Option<RepositoryHandle> {
        self.repositories.get(local_name).cloned()
    }
}

/// A single push attempt: endpoint host and tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub host: String,
    pub tag: String,
}

impl Attempt {
    pub fn new(host: &str, tag: &str) -> Self {
        Self {
            host: host.to_string(),
            tag: tag.to_string(),
        }
    }
}

type Script = Arc<Mutex<VecDeque<PushOutcome>>>;

/// Hands out pushers that replay scripted outcomes per endpoint host. A pusher
/// whose script is exhausted succeeds.
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: Mutex<HashMap<String, Script>>,
    failures: HashMap<String, PushError>,
    attempts: Arc<Mutex<Vec<Attempt>>>,
    created: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, host: &str, outcomes: Vec<PushOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.to_string(), Arc::new(Mutex::new(outcomes.into())));
        self
    }

    /// Make `create` fail for `host`
    pub fn fail_create(mut self, host: &str, error: PushError) -> Self {
        self.failures.insert(host.to_string(), error);
        self
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

impl PusherFactory for ScriptedFactory {
    fn create(
        &self,
        endpoint: &Endpoint,
        _repository: &RepositoryHandle,
        _info: &RepositoryInfo,
        _config: &PushConfig,
    ) -> Result<Box<dyn Pusher>, PushError> {
        let host = endpoint.url.host_str().unwrap_or_default().to_string();
        self.created.lock().unwrap().push(host.clone());
        if let Some(error) = self.failures.get(&host) {
            return Err(error.clone());
        }
        let script = self
            .scripts
            .lock()
            .unwrap()
            .entry(host.clone())
            .or_default()
            .clone();
        Ok(Box::new(ScriptedPusher {
            host,
            script,
            attempts: self.attempts.clone(),
        }))
    }
}

struct ScriptedPusher {
    host: String,
    script: Script,
    attempts: Arc<Mutex<Vec<Attempt>>>,
}

#[async_trait]
impl Pusher for ScriptedPusher {
    async fn push(&mut self, tag: &str) -> PushOutcome {
        self.attempts
            .lock()
            .unwrap()
            .push(Attempt::new(&self.host, tag));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PushOutcome::Success)
    }
}

/// `Write` sink whose contents stay readable after being boxed
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that always fails
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
