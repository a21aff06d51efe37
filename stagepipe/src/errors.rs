//! Error types for stagepipe.
//!
//! Binding, validation and execution problems each have their own type so
//! that a stage log can record exactly what went wrong, and all of them fold
//! into [`StagepipeError`] at the API boundary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// The main error type for stagepipe operations.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StagepipeError {
    /// Call-site arguments could not be bound to the declared parameters.
    #[error("{0}")]
    Binding(#[from] BindingError),

    /// One or more arguments, or the return value, failed validation.
    #[error("{0}")]
    InvalidArguments(#[from] InvalidArgumentsError),

    /// A stage body returned an error or panicked.
    #[error("{0}")]
    StageExecution(#[from] StageExecutionError),

    /// A validator was configured with an invalid regular expression.
    #[error("Invalid pattern `{pattern}`: {reason}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StagepipeError {
    /// Returns the validation failures if this is a validation error.
    #[must_use]
    pub const fn invalid_arguments(&self) -> Option<&InvalidArgumentsError> {
        if let Self::InvalidArguments(err) = self {
            Some(err)
        } else {
            None
        }
    }

    /// Returns the execution error if a stage body failed.
    #[must_use]
    pub const fn stage_execution(&self) -> Option<&StageExecutionError> {
        if let Self::StageExecution(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

/// Error raised when arguments cannot be bound to a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BindingError {
    /// The declared parameter list itself is malformed.
    #[error("Invalid signature: {reason}")]
    InvalidSignature {
        /// What is wrong with the signature.
        reason: String,
    },

    /// More positional arguments than declared parameters.
    #[error("Takes {expected} positional argument(s) but {got} were given")]
    TooManyPositional {
        /// Number of declared parameters.
        expected: usize,
        /// Number of positional arguments supplied.
        got: usize,
    },

    /// Required parameters received neither a value nor a default.
    #[error("Missing required argument(s): {}", missing.join(", "))]
    MissingArguments {
        /// Names of the unbound parameters, in declaration order.
        missing: Vec<String>,
    },

    /// A call site passed a keyword argument under a reserved name.
    #[error("'{name}' is reserved and cannot be passed as an argument")]
    ReservedArgument {
        /// The reserved name.
        name: String,
    },

    /// A body asked for an argument that is not in its binding.
    #[error("No argument named '{name}' in binding")]
    UnknownArgument {
        /// The requested name.
        name: String,
    },
}

impl BindingError {
    /// Creates an invalid signature error.
    #[must_use]
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
        }
    }

    /// Creates an unknown argument error.
    #[must_use]
    pub fn unknown_argument(name: impl Into<String>) -> Self {
        Self::UnknownArgument { name: name.into() }
    }
}

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The value has the wrong kind for the check.
    TypeMismatch,
    /// The value has the right kind but violates the constraint.
    Constraint,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::Constraint => write!(f, "constraint violation"),
        }
    }
}

/// A single failed check against one argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Argument name, or `"return"`.
    pub argument: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable description.
    pub message: String,
}

impl ValidationFailure {
    /// Creates a type mismatch failure.
    #[must_use]
    pub fn type_mismatch(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            kind: FailureKind::TypeMismatch,
            message: message.into(),
        }
    }

    /// Creates a constraint violation failure.
    #[must_use]
    pub fn constraint(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            kind: FailureKind::Constraint,
            message: message.into(),
        }
    }

    /// Returns true for type mismatches.
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        self.kind == FailureKind::TypeMismatch
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ValidationFailure {}

/// Error raised when bound arguments or a return value fail validation.
///
/// Failures are grouped per argument and keep the order in which the
/// validators ran.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvalidArgumentsError {
    /// Failures keyed by argument name.
    pub failures: IndexMap<String, Vec<ValidationFailure>>,
}

impl InvalidArgumentsError {
    /// Creates an error from grouped failures.
    #[must_use]
    pub fn new(failures: IndexMap<String, Vec<ValidationFailure>>) -> Self {
        Self { failures }
    }

    /// Creates an error for a single argument.
    #[must_use]
    pub fn single(argument: impl Into<String>, failures: Vec<ValidationFailure>) -> Self {
        let mut map = IndexMap::new();
        map.insert(argument.into(), failures);
        Self { failures: map }
    }

    /// Returns the failures recorded for an argument.
    #[must_use]
    pub fn failures_for(&self, argument: &str) -> &[ValidationFailure] {
        self.failures.get(argument).map_or(&[], Vec::as_slice)
    }

    /// Returns the names of the failing arguments.
    pub fn arguments(&self) -> impl Iterator<Item = &str> {
        self.failures.keys().map(String::as_str)
    }

    /// Total number of failures across all arguments.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.values().map(Vec::len).sum()
    }

    fn render(&self) -> String {
        let view: IndexMap<&str, Vec<String>> = self
            .failures
            .iter()
            .map(|(arg, fails)| (arg.as_str(), fails.iter().map(ToString::to_string).collect()))
            .collect();
        serde_json::to_string_pretty(&view).unwrap_or_else(|_| format!("{view:?}"))
    }
}

impl fmt::Display for InvalidArgumentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid arguments: {}", self.render())
    }
}

impl std::error::Error for InvalidArgumentsError {}

/// Error captured from a stage body.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Stage '{stage}' failed: {message}")]
pub struct StageExecutionError {
    /// Name of the stage or wrapped function.
    pub stage: String,
    /// Top-level error message.
    pub message: String,
    /// Underlying causes, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    /// Whether the body panicked rather than returning an error.
    #[serde(default)]
    pub panicked: bool,
}

impl StageExecutionError {
    /// Creates a new execution error.
    #[must_use]
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            chain: Vec::new(),
            panicked: false,
        }
    }

    /// Captures an `anyhow` error, keeping its cause chain.
    #[must_use]
    pub fn from_anyhow(stage: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            stage: stage.into(),
            message: err.to_string(),
            chain: err.chain().skip(1).map(ToString::to_string).collect(),
            panicked: false,
        }
    }

    /// Captures a panic payload.
    #[must_use]
    pub fn from_panic(stage: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "stage panicked with a non-string payload".to_string());

        Self {
            stage: stage.into(),
            message,
            chain: Vec::new(),
            panicked: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_missing_arguments_display() {
        let err = BindingError::MissingArguments {
            missing: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required argument(s): a, b");
    }

    #[test]
    fn test_invalid_arguments_accessors() {
        let err = InvalidArgumentsError::single(
            "a",
            vec![
                ValidationFailure::type_mismatch("a", "`a` must be of type int. Got: str"),
                ValidationFailure::constraint("a", "`a` must be greater than 0. Got: x."),
            ],
        );

        assert_eq!(err.failure_count(), 2);
        assert_eq!(err.arguments().collect::<Vec<_>>(), vec!["a"]);
        assert!(err.failures_for("a")[0].is_type_mismatch());
        assert!(err.failures_for("b").is_empty());
    }

    #[test]
    fn test_invalid_arguments_display_is_json() {
        let err = InvalidArgumentsError::single(
            "return",
            vec![ValidationFailure::constraint("return", "too big")],
        );
        let text = err.to_string();
        assert!(text.starts_with("Invalid arguments: {"));
        assert!(text.contains("\"return\""));
        assert!(text.contains("constraint violation: too big"));
    }

    #[test]
    fn test_stage_execution_from_anyhow_keeps_chain() {
        let err: anyhow::Error = Err::<(), _>(anyhow::anyhow!("division by zero"))
            .context("computing ratio")
            .unwrap_err();
        let captured = StageExecutionError::from_anyhow("ratio", &err);

        assert_eq!(captured.message, "computing ratio");
        assert_eq!(captured.chain, vec!["division by zero".to_string()]);
        assert!(!captured.panicked);
    }

    #[test]
    fn test_stage_execution_from_panic() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let captured = StageExecutionError::from_panic("s", payload.as_ref());
        assert_eq!(captured.message, "boom");
        assert!(captured.panicked);
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = StagepipeError::Config("bad".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "config");
        assert_eq!(json["detail"], "bad");
    }
}
