//! Session Log
//!
//! The human-readable trace returned at the end of a run. Every entry is
//! mirrored to `tracing` as it is recorded.

use chrono::Local;
use tracing::{error, info, warn};

const TIMESTAMP_FORMAT: &str = "%y:%m:%d %H:%M:%S";

/// Append-only list of `[yy:mm:dd HH:MM:SS] message` lines
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    entries: Vec<String>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop prior entries and record the first one of a new session
    pub fn start(&mut self, message: &str) {
        self.entries.clear();
        self.record(message);
    }

    /// Record a lifecycle event
    pub fn record(&mut self, message: &str) {
        info!("{}", message);
        self.push(message);
    }

    /// Record a problem the run recovered from
    pub fn warn(&mut self, message: &str) {
        warn!("{}", message);
        self.push(message);
    }

    /// Record the fatal error that ended the run
    pub fn error(&mut self, message: &str) {
        error!("{}", message);
        self.push(message);
    }

    fn push(&mut self, message: &str) {
        self.entries
            .push(format!("[{}] {}", Local::now().format(TIMESTAMP_FORMAT), message));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries joined with newlines
    pub fn render(&self) -> String {
        self.entries.join("\n")
    }
}
