//! Manifest push orchestration
//!
//! [`PushOrchestrator`] resolves the repository, looks up its endpoints and walks
//! them in order. For each endpoint a [`PusherFactory`] builds the [`Pusher`] matching
//! the endpoint's protocol version; the [`PushOutcome`] it returns decides whether the
//! next endpoint is tried.

pub mod config;
pub mod events;
pub mod factory;
pub mod orchestrator;
pub mod pusher;
pub mod v2;

pub use config::{PushConfig, PushRequest, PushSummary, PushedTag};
pub use events::{Event, EventSink, LoggerEventSink, RecordingEventSink};
pub use factory::{ProtocolPusherFactory, PusherFactory};
pub use orchestrator::PushOrchestrator;
pub use pusher::{PushOutcome, Pusher};
pub use v2::V2Pusher;
