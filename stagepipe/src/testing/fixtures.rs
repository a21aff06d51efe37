//! Ready-made stages and pipes for tests.

use std::sync::Arc;

use crate::core::{ActionOnFail, Value};
use crate::pipeline::{CollectingLogSink, Pipe, PipeConfig, Stage, PAYLOAD_PARAM};

/// A pipe whose log dumps are kept in memory.
#[derive(Debug)]
pub struct TestPipe {
    /// The pipe under test.
    pub pipe: Pipe,
    /// Receives every dump made by `pipe`.
    pub sink: Arc<CollectingLogSink>,
}

impl TestPipe {
    /// Creates a test pipe with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PipeConfig::default())
    }

    /// Creates a test pipe with `config`.
    #[must_use]
    pub fn with_config(config: PipeConfig) -> Self {
        let sink = Arc::new(CollectingLogSink::new());
        let pipe = Pipe::with_config(config).with_sink(sink.clone());
        Self { pipe, sink }
    }

    /// Number of log dumps received.
    #[must_use]
    pub fn dump_count(&self) -> usize {
        self.sink.len()
    }
}

impl Default for TestPipe {
    fn default() -> Self {
        Self::new()
    }
}

/// A stage that returns its payload unchanged.
#[must_use]
pub fn identity_stage(name: impl Into<String>) -> Stage {
    Stage::new(name, ActionOnFail::Break, |args| {
        Ok(args.require(PAYLOAD_PARAM)?.clone())
    })
}

/// A stage that ignores its payload and returns `value`.
#[must_use]
pub fn constant_stage(name: impl Into<String>, value: impl Into<Value>) -> Stage {
    let value = value.into();
    Stage::new(name, ActionOnFail::Break, move |_| Ok(value.clone()))
}

/// A stage whose body always returns an error with `message`.
#[must_use]
pub fn failing_stage(name: impl Into<String>, message: &str, action: ActionOnFail) -> Stage {
    let message = message.to_string();
    Stage::new(name, action, move |_| Err(anyhow::anyhow!("{message}")))
}
