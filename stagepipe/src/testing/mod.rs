//! Testing utilities for stagepipe pipelines.
//!
//! This module provides:
//! - Fixture stages and a pipe that collects its log dumps
//! - A recording stage for inspecting bound arguments
//! - Assertions for stage results and errors

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_completed, assert_failed, assert_invalid_args, assert_logged_errors,
    assert_stage_error,
};
pub use fixtures::{constant_stage, failing_stage, identity_stage, TestPipe};
pub use mocks::{recording_stage, recording_stage_with, CallRecorder};
