//! Stage execution.
//!
//! This module provides:
//! - [`Stage`] definitions built with [`StageBuilder`]
//! - The [`Pipe`] runner, which records every invocation in a [`StageLog`]
//! - [`LogSink`] implementations that receive the log when a run fails

mod config;
mod log;
mod pipe;
mod sink;
mod stage;


pub use config::{DumpFormat, PipeConfig};
pub use log::{StageLog, StageLogEntry};
pub use pipe::Pipe;
pub use sink::{CollectingLogSink, LogSink, NoOpLogSink, StderrLogSink, TracingLogSink};
pub use stage::{Stage, StageBuilder, StageResult, PAYLOAD_PARAM};

#[cfg(test)]
pub use sink::MockLogSink;
