//! Completion events

use crate::logging::Logger;
use std::sync::Mutex;

/// Receives a record for every completed push. Implementations are shared between
/// concurrent pushes.
pub trait EventSink: Send + Sync {
    fn log(&self, action: &str, target: &str, extra: &str);
}

/// Event sink that reports through the [`Logger`]
#[derive(Debug, Clone)]
pub struct LoggerEventSink {
    logger: Logger,
}

impl LoggerEventSink {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl EventSink for LoggerEventSink {
    fn log(&self, action: &str, target: &str, extra: &str) {
        if extra.is_empty() {
            self.logger.info(&format!("Event {}: {}", action, target));
        } else {
            self.logger.info(&format!("Event {}: {} ({})", action, target, extra));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub action: String,
    pub target: String,
    pub extra: String,
}

/// Keeps events in memory for callers that report them later
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingEventSink {
    fn log(&self, action: &str, target: &str, extra: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(Event {
                action: action.to_string(),
                target: target.to_string(),
                extra: extra.to_string(),
            });
        }
    }
}
