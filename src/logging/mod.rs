//! Logging and output control
//!
//! This module provides the [`Logger`] used for all diagnostic output. It supports
//! quiet and verbose modes and prefixes verbose lines with the elapsed time since the
//! logger was created. Diagnostics go to stderr so the progress stream on stdout stays
//! machine-readable.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Lines collected by a capturing [`Logger`]
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<String>>>);

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.0.lock() {
            lines.push(line);
        }
    }
}

/// Logger responsible for all user-visible diagnostics
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    pub start_time: Option<Instant>,
    capture: Option<LogCapture>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            start_time: Some(Instant::now()),
            capture: None,
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            start_time: Some(Instant::now()),
            capture: None,
        }
    }

    /// Send output to `capture` instead of stderr
    pub fn with_capture(mut self, capture: LogCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    fn emit(&self, line: String) {
        match &self.capture {
            Some(capture) => capture.push(line),
            None => eprintln!("{}", line),
        }
    }

    /// Main section heading
    pub fn section(&self, title: &str) {
        if !self.quiet {
            self.emit(format!("\n=== {} ===", title));
        }
    }

    pub fn debug(&self, message: &str) {
        if self.verbose && !self.quiet {
            self.emit(format!("{} DEBUG: {}", self.timestamp(), message));
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            self.emit(format!("{} {}", self.timestamp(), message));
        }
    }

    /// Information message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.emit(format!("ℹ️  {}", message));
        }
    }

    /// Success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.emit(format!("✅ {}", message));
        }
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.emit(format!("⚠️  WARNING: {}", message));
        }
    }

    /// Errors are printed even in quiet mode
    pub fn error(&self, message: &str) {
        self.emit(format!("❌ ERROR: {}", message));
    }

    /// Step information
    pub fn step(&self, message: &str) {
        if !self.quiet {
            self.emit(format!("▶️  {}", message));
        }
    }

    /// Detailed information (only shown in verbose mode)
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            self.emit(format!("   {}", message));
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{:.1}s", duration.as_secs_f64())
        } else if secs < 3600 {
            format!("{}m{:02}s", secs / 60, secs % 60)
        } else {
            format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    fn timestamp(&self) -> String {
        match self.start_time {
            Some(start) => format!("[{:8.3}s]", start.elapsed().as_secs_f64()),
            None => String::new(),
        }
    }
}
