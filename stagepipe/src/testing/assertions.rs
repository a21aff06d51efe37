//! Assertions for stage results and errors.

use crate::core::Value;
use crate::errors::{InvalidArgumentsError, StageExecutionError, StagepipeError};
use crate::pipeline::{Pipe, StageResult};

/// Asserts that the stage completed and returns its value.
pub fn assert_completed(result: &StageResult) -> &Value {
    match result {
        StageResult::Completed(value) => value,
        StageResult::Failed { errors, .. } => {
            panic!("Expected completed stage, got failure: {errors:?}")
        }
    }
}

/// Asserts that the stage failed and returns its recorded errors.
pub fn assert_failed(result: &StageResult) -> &[StagepipeError] {
    assert!(
        !result.is_completed(),
        "Expected failed stage, got value: {:?}",
        result.value()
    );
    result.errors()
}

/// Asserts that `err` is a validation error naming exactly `arguments`,
/// in order.
pub fn assert_invalid_args<'a>(
    err: &'a StagepipeError,
    arguments: &[&str],
) -> &'a InvalidArgumentsError {
    let Some(invalid) = err.invalid_arguments() else {
        panic!("Expected invalid arguments error, got: {err}");
    };
    assert_eq!(
        invalid.arguments().collect::<Vec<_>>(),
        arguments,
        "Unexpected failing arguments"
    );
    invalid
}

/// Asserts that `err` is an execution error raised by `stage`.
pub fn assert_stage_error<'a>(err: &'a StagepipeError, stage: &str) -> &'a StageExecutionError {
    let Some(failure) = err.stage_execution() else {
        panic!("Expected stage execution error, got: {err}");
    };
    assert_eq!(failure.stage, stage, "Error raised by unexpected stage");
    failure
}

/// Asserts that the log entry at `index` recorded exactly `count` errors.
pub fn assert_logged_errors(pipe: &Pipe, index: usize, count: usize) {
    let Some(entry) = pipe.log().get(index) else {
        panic!("No log entry at index {index}; log has {} entries", pipe.log().len());
    };
    assert_eq!(
        entry.exceptions.len(),
        count,
        "Unexpected errors for stage '{}': {:?}",
        entry.func,
        entry.exceptions
    );
}
