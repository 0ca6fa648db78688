//! Logging capability handed to the query service at construction.
//!
//! Production wiring forwards to `tracing`, whose subscriber (see
//! `observability`) routes every level to the console and errors to a durable
//! file. Tests substitute `RecordingEventLog` to assert on what was logged.

use std::error::Error;
use std::sync::{Mutex, PoisonError};

use crate::service::Operation;

pub trait EventLog: Send + Sync {
    fn info(&self, operation: Operation, message: &str);

    fn error(&self, operation: Operation, message: &str, cause: &(dyn Error + 'static));
}

/// Forwards events to the global `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn info(&self, operation: Operation, message: &str) {
        tracing::info!(operation = operation.as_str(), "{message}");
    }

    fn error(&self, operation: Operation, message: &str, cause: &(dyn Error + 'static)) {
        tracing::error!(operation = operation.as_str(), error = %cause, "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub operation: Operation,
    pub message: String,
    pub cause: Option<String>,
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingEventLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == Level::Error)
            .collect()
    }

    fn push(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl EventLog for RecordingEventLog {
    fn info(&self, operation: Operation, message: &str) {
        self.push(LogEntry {
            level: Level::Info,
            operation,
            message: message.to_string(),
            cause: None,
        });
    }

    fn error(&self, operation: Operation, message: &str, cause: &(dyn Error + 'static)) {
        self.push(LogEntry {
            level: Level::Error,
            operation,
            message: message.to_string(),
            cause: Some(cause.to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn recording_log_keeps_order_and_levels() {
        let log = RecordingEventLog::new();
        log.info(Operation::Delete, "nothing matched");
        log.error(
            Operation::List,
            "store failure",
            &io::Error::new(io::ErrorKind::Other, "connection reset"),
        );

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::Info);
        assert_eq!(entries[1].cause.as_deref(), Some("connection reset"));

        let errors = log.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].operation, Operation::List);
    }
}
