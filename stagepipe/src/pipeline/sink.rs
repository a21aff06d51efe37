//! Destinations for dumped stage logs.

use super::config::DumpFormat;
use super::log::StageLog;
use std::io::Write;
use tracing::{error, warn, Level};

/// Receives the stage log when a pipe fails.
///
/// Sinks must not panic; write errors are swallowed.
#[cfg_attr(test, mockall::automock)]
pub trait LogSink: Send + Sync {
    /// Handles a dump of `log`. `reason` says why it was dumped.
    fn emit_log(&self, log: &StageLog, reason: &str);
}

/// Writes the log as JSON to standard error. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrLogSink {
    format: DumpFormat,
}

impl StderrLogSink {
    /// Creates a sink using `format`.
    #[must_use]
    pub const fn new(format: DumpFormat) -> Self {
        Self { format }
    }
}

impl LogSink for StderrLogSink {
    fn emit_log(&self, log: &StageLog, reason: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "stage log ({reason}):\n{}", log.to_json(self.format));
    }
}

/// Emits the log as a single `tracing` event.
#[derive(Debug, Clone)]
pub struct TracingLogSink {
    level: Level,
    format: DumpFormat,
}

impl Default for TracingLogSink {
    fn default() -> Self {
        Self {
            level: Level::ERROR,
            format: DumpFormat::Compact,
        }
    }
}

impl TracingLogSink {
    /// Creates a sink emitting at `level`. Levels below `WARN` are raised
    /// to `WARN`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Sets the layout of the `log` field.
    #[must_use]
    pub const fn with_format(mut self, format: DumpFormat) -> Self {
        self.format = format;
        self
    }
}

impl LogSink for TracingLogSink {
    fn emit_log(&self, log: &StageLog, reason: &str) {
        let json = log.to_json(self.format);
        if self.level == Level::ERROR {
            error!(reason = %reason, entries = log.len(), log = %json, "Stage log dump");
        } else {
            warn!(reason = %reason, entries = log.len(), log = %json, "Stage log dump");
        }
    }
}

/// Keeps every dump in memory.
#[derive(Debug, Default)]
pub struct CollectingLogSink {
    dumps: parking_lot::RwLock<Vec<(String, StageLog)>>,
}

impl CollectingLogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all dumps as `(reason, log)` pairs.
    #[must_use]
    pub fn dumps(&self) -> Vec<(String, StageLog)> {
        self.dumps.read().clone()
    }

    /// Returns the most recent dump.
    #[must_use]
    pub fn last(&self) -> Option<(String, StageLog)> {
        self.dumps.read().last().cloned()
    }

    /// Number of dumps received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dumps.read().len()
    }

    /// Returns true if nothing was dumped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dumps.read().is_empty()
    }

    /// Drops all dumps.
    pub fn clear(&self) {
        self.dumps.write().clear();
    }
}

impl LogSink for CollectingLogSink {
    fn emit_log(&self, log: &StageLog, reason: &str) {
        self.dumps.write().push((reason.to_string(), log.clone()));
    }
}

/// Discards every dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogSink;

impl LogSink for NoOpLogSink {
    fn emit_log(&self, _log: &StageLog, _reason: &str) {}
}
