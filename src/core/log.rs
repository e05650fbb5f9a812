use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Where components send their log lines.
///
/// Passed into every stage instead of reaching for a global logger, so a
/// test can capture exactly what a child process printed.
pub trait LogSink: Send + Sync {
    fn log_line(&self, channel: &str, severity: Severity, text: &str);
}

/// Forwards to the process-wide `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log_line(&self, channel: &str, severity: Severity, text: &str) {
        match severity {
            Severity::Debug => debug!(channel, "{}", text),
            Severity::Info => info!(channel, "{}", text),
            Severity::Warn => warn!(channel, "{}", text),
            Severity::Error => error!(channel, "{}", text),
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(String, Severity, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(String, Severity, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn contains(&self, severity: Severity, text: &str) -> bool {
        self.lines()
            .iter()
            .any(|(_, s, line)| *s == severity && line.contains(text))
    }
}

impl LogSink for MemorySink {
    fn log_line(&self, channel: &str, severity: Severity, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((channel.to_string(), severity, text.to_string()));
        }
    }
}
