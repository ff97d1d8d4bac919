use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Once};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Level;

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

/// One line of the user-visible status stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub level: LogLevel,
}

pub trait LogSink: Send + Sync {
    fn push(&self, entry: LogEntry);
}

/// Keeps every entry in memory, newest last.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.text).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogSink for MemoryLogSink {
    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

/// Prefixed logger that mirrors every message to `tracing` and, when a
/// sink is attached, to the status stream.
#[derive(Clone, Default)]
pub struct Logger {
    prefixes: VecDeque<String>,
    sink: Option<Arc<dyn LogSink>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("prefixes", &self.prefixes)
            .field("sink", &self.sink.as_ref().map(|_| "<dyn LogSink>"))
            .finish()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.prefixes.push_back(prefix);
        self
    }

    fn prefixed(&self, message: &str) -> String {
        let prefix = self.prefixes.iter().map(|p| format!("{} ", p)).collect::<String>();
        format!("{}{}", prefix, message)
    }

    fn emit(&self, level: LogLevel, text: String) {
        if let Some(sink) = &self.sink {
            sink.push(LogEntry {
                timestamp: Utc::now(),
                text,
                level,
            });
        }
    }

    pub fn info(&self, message: &str) {
        let text = self.prefixed(message);
        tracing::info!("{}", text);
        self.emit(LogLevel::Info, text);
    }

    pub fn success(&self, message: &str) {
        let text = self.prefixed(message);
        tracing::info!("✅ {}", text);
        self.emit(LogLevel::Success, text);
    }

    pub fn warn(&self, message: &str) {
        let text = self.prefixed(message);
        tracing::warn!("{}", text);
        self.emit(LogLevel::Info, text);
    }

    pub fn error(&self, message: &str) {
        let text = self.prefixed(message);
        tracing::error!("{}", text);
        self.emit(LogLevel::Error, text);
    }

    /// Developer detail; never reaches the status stream.
    pub fn debug(&self, message: &str) {
        tracing::debug!("{}", self.prefixed(message));
    }
}

pub fn init_logging(verbose: bool) -> Logger {
    if !tracing::dispatcher::has_been_set() {
        INIT.call_once(|| {
            let level = if verbose { Level::DEBUG } else { Level::INFO };
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(false)
                .init();
        });
    }
    Logger::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_and_levels_reach_sink() {
        let sink = Arc::new(MemoryLogSink::new());
        let logger = Logger::new()
            .with_sink(sink.clone())
            .with_prefix("[cluster]".to_string())
            .with_prefix("[2/7]".to_string());

        logger.info("working");
        logger.success("done");
        logger.error("broken");
        logger.debug("hidden");

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].text, "[cluster] [2/7] working");
        assert_eq!(entries[1].level, LogLevel::Success);
        assert_eq!(entries[2].level, LogLevel::Error);
    }

    #[test]
    fn test_prefixed_clone_leaves_parent_untouched() {
        let sink = Arc::new(MemoryLogSink::new());
        let logger = Logger::new().with_sink(sink.clone());
        let task = logger.clone().with_prefix("[1/3]".to_string());
        task.warn("careful");
        logger.info("plain");
        assert_eq!(sink.texts(), vec!["[1/3] careful".to_string(), "plain".to_string()]);
        assert_eq!(sink.entries()[0].level, LogLevel::Info);
        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false).info("first");
        init_logging(true).info("second");
    }
}
