//! Per-stage failure policy.

use crate::errors::StagepipeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the driver should do when a stage body fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOnFail {
    /// Suppress recorded errors and let the pipeline proceed.
    Continue,
    /// Propagate recorded errors to the driver, which stops the pipeline.
    #[default]
    Break,
}

impl ActionOnFail {
    /// Returns true if errors should stop the pipeline.
    #[must_use]
    pub const fn is_break(&self) -> bool {
        matches!(self, Self::Break)
    }
}

impl fmt::Display for ActionOnFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Break => write!(f, "break"),
        }
    }
}

impl FromStr for ActionOnFail {
    type Err = StagepipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "break" => Ok(Self::Break),
            other => Err(StagepipeError::Config(format!(
                "unknown action_on_fail '{other}', expected 'continue' or 'break'"
            ))),
        }
    }
}
