//! Subscriber setup for the `tracing` events emitted by stagepipe.
//!
//! The library only emits events; applications call [`init_tracing`] once
//! to print them.

use crate::errors::StagepipeError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Settings for the global subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `stagepipe=debug`. `RUST_LOG`
    /// takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Include the event target.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Sets the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Switches JSON output on or off.
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Builds the filter, preferring `RUST_LOG` over the configured level.
    pub fn env_filter(&self) -> Result<EnvFilter, StagepipeError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| StagepipeError::Config(format!("invalid log filter '{}': {e}", self.level)))
    }
}

/// Installs a global `tracing-subscriber` fmt subscriber writing to
/// standard error.
///
/// Fails if the filter is invalid or a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), StagepipeError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_target(config.with_target)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| StagepipeError::Config(format!("failed to install subscriber: {e}")))
}
