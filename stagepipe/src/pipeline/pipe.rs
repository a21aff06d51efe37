//! The stage runner and pipeline driver.

use super::config::PipeConfig;
use super::log::{StageLog, StageLogEntry};
use super::sink::{LogSink, StderrLogSink};
use super::stage::{Stage, StageBuilder, StageResult};
use crate::binding::CallArgs;
use crate::core::{ActionOnFail, Value};
use crate::errors::{StageExecutionError, StagepipeError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Caller-owned runner state: configuration, the stage log, the stage
/// counter and the sink that receives log dumps.
///
/// Each `Pipe` is independent. Stage indices start at zero and increase by
/// one every time a stage is entered.
pub struct Pipe {
    config: PipeConfig,
    run_id: Uuid,
    log: StageLog,
    next_index: usize,
    sink: Arc<dyn LogSink>,
}

impl Default for Pipe {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipe {
    /// Creates a pipe with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PipeConfig::default())
    }

    /// Creates a pipe with `config`, dumping to standard error.
    #[must_use]
    pub fn with_config(config: PipeConfig) -> Self {
        let sink = Arc::new(StderrLogSink::new(config.dump_format));
        Self {
            config,
            run_id: Uuid::new_v4(),
            log: StageLog::new(),
            next_index: 0,
            sink,
        }
    }

    /// Replaces the log sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Starts a stage builder that uses this pipe's default policy.
    #[must_use]
    pub fn stage(&self, name: impl Into<String>) -> StageBuilder {
        Stage::builder(name).action_on_fail(self.config.default_action_on_fail)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the stage log.
    #[must_use]
    pub const fn log(&self) -> &StageLog {
        &self.log
    }

    /// Number of stages entered so far.
    #[must_use]
    pub const fn stage_count(&self) -> usize {
        self.next_index
    }

    /// Renders the stage log as JSON in the configured format.
    #[must_use]
    pub fn log_json(&self) -> String {
        self.log.to_json(self.config.dump_format)
    }

    /// Hands the stage log to the sink.
    pub fn dump_log(&self, reason: &str) {
        self.sink.emit_log(&self.log, reason);
    }

    fn dump_on_failure(&self, reason: &str) {
        if self.config.dump_log_on_failure {
            self.dump_log(reason);
        }
    }

    /// Records `err` against the entry at `index`, closes the entry and
    /// dumps the log.
    fn abort(&mut self, index: usize, err: StagepipeError, reason: &str) -> StagepipeError {
        if let Some(entry) = self.log.get_mut(index) {
            entry.record(err.clone());
            entry.close();
        }
        self.dump_on_failure(reason);
        err
    }

    /// Invokes one stage.
    ///
    /// Binding, conversion and validation run before the body. If any of
    /// them fails the error is recorded, the log is dumped and the error is
    /// returned without running the body. A body error or panic is recorded
    /// and, under [`ActionOnFail::Break`], reported as
    /// [`StageResult::Failed`]. A returned value that fails the return
    /// chain is recorded and returned as an error.
    pub fn call_stage(
        &mut self,
        stage: &Stage,
        call: CallArgs,
    ) -> Result<StageResult, StagepipeError> {
        let index = self.next_index;
        self.next_index += 1;
        self.log.push(StageLogEntry::open(index, stage.name(), &call));
        debug!(
            stage = %stage.name(),
            index,
            run_id = %self.run_id,
            "Stage started"
        );

        let binding = match stage.rules().prepare(stage.signature(), &call) {
            Ok(binding) => binding,
            Err(err) => return Err(self.abort(index, err, "argument validation failed")),
        };

        let outcome = stage.invoke(&binding);

        let mut duration_ms = None;
        if let Some(entry) = self.log.get_mut(index) {
            entry.close();
            match &outcome {
                Ok(value) => entry.return_value = Some(value.clone()),
                Err(err) => entry.record(err.clone().into()),
            }
            duration_ms = entry.duration_ms();
        }
        debug!(
            stage = %stage.name(),
            index,
            duration_ms,
            ok = outcome.is_ok(),
            "Stage finished"
        );

        let value = match outcome {
            Ok(value) => value,
            Err(err) => return Ok(self.on_body_failure(stage, index, &err)),
        };

        if let Err(err) = stage.rules().check_return(&value) {
            return Err(self.abort(index, err.into(), "return validation failed"));
        }

        Ok(StageResult::Completed(value))
    }

    fn on_body_failure(
        &self,
        stage: &Stage,
        index: usize,
        err: &StageExecutionError,
    ) -> StageResult {
        match stage.action_on_fail() {
            ActionOnFail::Continue => {
                warn!(
                    stage = %stage.name(),
                    index,
                    error = %err,
                    "Stage failed, continuing"
                );
                StageResult::Completed(Value::None)
            }
            ActionOnFail::Break => StageResult::Failed {
                value: Value::None,
                errors: self
                    .log
                    .get(index)
                    .map(|entry| entry.exceptions.clone())
                    .unwrap_or_default(),
            },
        }
    }

    /// Runs `stages` in order, passing the payload to each as its single
    /// positional argument and threading the result forward.
    ///
    /// Stops at the first [`StageResult::Failed`], dumps the log and
    /// returns that stage's most recent error. Validation errors are
    /// returned as soon as they occur.
    pub fn run(
        &mut self,
        stages: &[Stage],
        payload: impl Into<Value>,
    ) -> Result<Value, StagepipeError> {
        let mut payload = payload.into();

        for stage in stages {
            match self.call_stage(stage, CallArgs::positional([payload]))? {
                StageResult::Completed(value) => payload = value,
                StageResult::Failed { errors, .. } => {
                    let err = errors.last().cloned().unwrap_or_else(|| {
                        StageExecutionError::new(stage.name(), "stage failed").into()
                    });
                    error!(
                        stage = %stage.name(),
                        run_id = %self.run_id,
                        error = %err,
                        "Pipeline aborted"
                    );
                    self.dump_on_failure("pipeline aborted");
                    return Err(err);
                }
            }
        }

        Ok(payload)
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("config", &self.config)
            .field("run_id", &self.run_id)
            .field("stage_count", &self.next_index)
            .field("log_entries", &self.log.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sink::{CollectingLogSink, MockLogSink, NoOpLogSink};
    use crate::pipeline::stage::PAYLOAD_PARAM;

    fn quiet() -> Pipe {
        Pipe::new().with_sink(Arc::new(NoOpLogSink))
    }

    fn doubler() -> Stage {
        Stage::builder("double")
            .build(|args| {
                let n = args.require(PAYLOAD_PARAM)?.as_int().unwrap_or_default();
                Ok(Value::Int(n * 2))
            })
            .unwrap()
    }

    #[test]
    fn test_call_stage_records_entry() {
        let mut pipe = quiet();
        let result = doubler().call(&mut pipe, CallArgs::positional([21])).unwrap();

        assert_eq!(result, StageResult::Completed(Value::Int(42)));
        let entry = pipe.log().get(0).unwrap();
        assert_eq!(entry.func, "double");
        assert_eq!(entry.args, vec![Value::Int(21)]);
        assert_eq!(entry.return_value, Some(Value::Int(42)));
        assert!(entry.is_closed());
        assert!(!entry.has_errors());
    }

    #[test]
    fn test_counter_is_monotonic() {
        let mut pipe = quiet();
        let stage = doubler();
        for i in 0..3 {
            stage.call(&mut pipe, CallArgs::positional([i])).unwrap();
        }
        let _ = stage.call(&mut pipe, CallArgs::new());

        assert_eq!(pipe.stage_count(), 4);
        assert_eq!(
            pipe.log().iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_binding_error_is_logged_and_dumped() {
        let sink = Arc::new(CollectingLogSink::new());
        let mut pipe = Pipe::new().with_sink(sink.clone());

        let err = doubler().call(&mut pipe, CallArgs::new()).unwrap_err();

        assert!(matches!(err, StagepipeError::Binding(_)));
        let entry = pipe.log().get(0).unwrap();
        assert_eq!(entry.exceptions, vec![err]);
        assert_eq!(entry.return_value, None);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_dump_disabled_by_config() {
        let mut sink = MockLogSink::new();
        sink.expect_emit_log().never();
        let mut pipe = Pipe::with_config(PipeConfig::default().with_dump_log_on_failure(false))
            .with_sink(Arc::new(sink));

        assert!(doubler().call(&mut pipe, CallArgs::new()).is_err());
    }

    #[test]
    fn test_stage_uses_pipe_default_policy() {
        let pipe = Pipe::with_config(
            PipeConfig::default().with_default_action_on_fail(ActionOnFail::Continue),
        );
        let stage = pipe.stage("s").build(|_| Ok(Value::None)).unwrap();
        assert_eq!(stage.action_on_fail(), ActionOnFail::Continue);
    }

    #[test]
    fn test_run_ids_differ() {
        assert_ne!(Pipe::new().run_id(), Pipe::new().run_id());
    }
}
