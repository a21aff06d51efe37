//! Runner configuration.

use crate::core::ActionOnFail;
use crate::errors::StagepipeError;
use serde::{Deserialize, Serialize};

/// Layout of a dumped stage log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    /// Indented JSON.
    #[default]
    Pretty,
    /// Single-line JSON.
    Compact,
}

/// Configuration for a [`Pipe`](super::Pipe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Hand the stage log to the sink when validation fails or a run aborts.
    pub dump_log_on_failure: bool,
    /// Layout used by sinks that render the log.
    pub dump_format: DumpFormat,
    /// Policy for stages built through [`Pipe::stage`](super::Pipe::stage).
    pub default_action_on_fail: ActionOnFail,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            dump_log_on_failure: true,
            dump_format: DumpFormat::Pretty,
            default_action_on_fail: ActionOnFail::Break,
        }
    }
}

impl PipeConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, StagepipeError> {
        serde_json::from_str(json)
            .map_err(|e| StagepipeError::Config(format!("invalid pipe config: {e}")))
    }

    /// Sets whether the log is dumped on failure.
    #[must_use]
    pub const fn with_dump_log_on_failure(mut self, enabled: bool) -> Self {
        self.dump_log_on_failure = enabled;
        self
    }

    /// Sets the dump layout.
    #[must_use]
    pub const fn with_dump_format(mut self, format: DumpFormat) -> Self {
        self.dump_format = format;
        self
    }

    /// Sets the default failure policy.
    #[must_use]
    pub const fn with_default_action_on_fail(mut self, action: ActionOnFail) -> Self {
        self.default_action_on_fail = action;
        self
    }
}
