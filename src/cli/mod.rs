//! Command line interface module
//!
//! Argument parsing, layered configuration and the runner that assembles the
//! push orchestrator from its default collaborators.

pub mod args;
pub mod config;
pub mod runner;

pub use args::Args;
pub use config::AppConfig;
pub use runner::Runner;
