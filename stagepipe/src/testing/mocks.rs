//! Stages that record how they were called.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::binding::ArgumentBinding;
use crate::core::{ActionOnFail, Value};
use crate::errors::BindingError;
use crate::pipeline::{Stage, StageBuilder};

/// Shared record of the bindings a stage body received.
#[derive(Debug, Default)]
pub struct CallRecorder {
    calls: Mutex<Vec<ArgumentBinding>>,
}

impl CallRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, binding: &ArgumentBinding) {
        self.calls.lock().push(binding.clone());
    }

    /// Returns every recorded binding in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<ArgumentBinding> {
        self.calls.lock().clone()
    }

    /// Number of times the body ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets all recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

/// A stage that records its binding and returns its payload.
///
/// Returns the stage and the recorder it writes to.
#[must_use]
pub fn recording_stage(name: impl Into<String>) -> (Stage, Arc<CallRecorder>) {
    let recorder = Arc::new(CallRecorder::new());
    let stage = Stage::new(name, ActionOnFail::Break, recording_body(&recorder));
    (stage, recorder)
}

/// Like [`recording_stage`], but starting from a configured builder. The
/// stage returns the value bound to its first parameter.
pub fn recording_stage_with(
    builder: StageBuilder,
) -> Result<(Stage, Arc<CallRecorder>), BindingError> {
    let recorder = Arc::new(CallRecorder::new());
    let stage = builder.build(recording_body(&recorder))?;
    Ok((stage, recorder))
}

fn recording_body(
    recorder: &Arc<CallRecorder>,
) -> impl Fn(&ArgumentBinding) -> anyhow::Result<Value> + Send + Sync + 'static {
    let sink = Arc::clone(recorder);
    move |args| {
        sink.record(args);
        Ok(args.iter().next().map(|(_, v)| v.clone()).unwrap_or_default())
    }
}
