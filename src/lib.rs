//! Manifest Pusher Library
//!
//! Pushes locally cached image manifests to a registry, trying each candidate
//! endpoint of the target repository in order until one accepts every tag.

pub mod cli;
pub mod error;
pub mod logging;
pub mod output;
pub mod push;
pub mod registry;
pub mod repository;
pub mod store;

pub use error::{PushError, RegistryError, Result};
pub use logging::{LogCapture, Logger};
pub use push::{PushOrchestrator, PushOutcome, Pusher, PusherFactory};
