//! # Stagepipe
//!
//! Sequential data pipelines built from stages whose arguments are bound,
//! converted and validated before each stage body runs.
//!
//! Stagepipe provides:
//!
//! - **Argument binding**: declared signatures with defaults and keyword
//!   overrides
//! - **Validator and converter libraries**: composable per-argument chains
//! - **Validated functions**: [`validation::validate_args`] wraps any body
//! - **Stage runner**: a caller-owned [`pipeline::Pipe`] that logs every
//!   invocation and applies a per-stage failure policy
//!
//! ## Quick Start
//!
//! ```rust
//! use stagepipe::prelude::*;
//!
//! let double = Stage::builder("double")
//!     .rules(ArgRules::new().validate(PAYLOAD_PARAM, [is_type(ValueKind::Int)]))
//!     .build(|args| {
//!         let n = args.require(PAYLOAD_PARAM)?.as_int().unwrap_or_default();
//!         Ok(Value::Int(n * 2))
//!     })?;
//!
//! let mut pipe = Pipe::new();
//! let result = pipe.run(&[double.clone(), double], 3)?;
//! assert_eq!(result, Value::Int(12));
//! # Ok::<(), stagepipe::errors::StagepipeError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod binding;
pub mod converters;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod testing;
pub mod utils;
pub mod validation;
pub mod validators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::binding::{ArgumentBinding, CallArgs, Param, Signature};
    pub use crate::converters::{
        clip_max, clip_min, replace_none, strip_chars, to_lower, to_type, to_upper, Converter,
    };
    pub use crate::core::{ActionOnFail, Value, ValueKind};
    pub use crate::errors::{
        BindingError, FailureKind, InvalidArgumentsError, StageExecutionError, StagepipeError,
        ValidationFailure,
    };
    pub use crate::observability::{init_tracing, LoggingConfig};
    pub use crate::pipeline::{
        CollectingLogSink, DumpFormat, LogSink, NoOpLogSink, Pipe, PipeConfig, Stage,
        StageBuilder, StageLog, StageLogEntry, StageResult, StderrLogSink, TracingLogSink,
        PAYLOAD_PARAM,
    };
    pub use crate::validation::{validate_args, ArgRules, ValidatedFn, RETURN_KEY};
    pub use crate::validators::{
        contains, eq, ge, gt, is_in, is_type, is_type_any, le, lt, max_len, min_len, re_match,
        re_search, Validator,
    };
}
