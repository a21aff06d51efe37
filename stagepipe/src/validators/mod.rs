//! Validator predicates.
//!
//! Each constructor takes a constraint (a kind, a limit, a pattern, a set of
//! values) and returns a [`Validator`]: a named, stateless check of
//! `(argument_name, value)`. A check never panics on an ordinary mismatch;
//! it returns a [`ValidationFailure`] describing what was expected and what
//! was received.
//!
//! ```
//! use stagepipe::core::Value;
//! use stagepipe::validators::{gt, is_in};
//!
//! assert!(gt(0).check("n", &Value::Int(3)).is_ok());
//! assert!(is_in([0, 1, 2]).check("n", &Value::Int(5)).is_err());
//! ```

mod compare;
mod length;
mod membership;
mod pattern;

pub use compare::{eq, ge, gt, le, lt};
pub use length::{max_len, min_len};
pub use membership::{contains, is_in};
pub use pattern::{re_match, re_search};

use crate::core::{Value, ValueKind};
use crate::errors::ValidationFailure;
use std::fmt;
use std::sync::Arc;

/// Signature of a validator check.
pub type CheckFn = dyn Fn(&str, &Value) -> Result<(), ValidationFailure> + Send + Sync;

/// A named validation predicate.
#[derive(Clone)]
pub struct Validator {
    name: String,
    check: Arc<CheckFn>,
}

impl Validator {
    /// Creates a validator from a check function.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<(), ValidationFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Returns the validator's label, e.g. `gt(0)`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks `value`, bound to `argument`.
    pub fn check(&self, argument: &str, value: &Value) -> Result<(), ValidationFailure> {
        (self.check)(argument, value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .finish()
    }
}

/// Passes when the value is of kind `kind`.
#[must_use]
pub fn is_type(kind: ValueKind) -> Validator {
    Validator::new(format!("is_type({kind})"), move |arg, value| {
        if value.kind() == kind {
            Ok(())
        } else {
            Err(ValidationFailure::type_mismatch(
                arg,
                format!("`{arg}` must be of type {kind}. Got: {}", value.kind()),
            ))
        }
    })
}

/// Passes when the value is of any of `kinds`.
pub fn is_type_any<I>(kinds: I) -> Validator
where
    I: IntoIterator<Item = ValueKind>,
{
    let kinds: Vec<ValueKind> = kinds.into_iter().collect();
    let label = kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    Validator::new(format!("is_type_any({label})"), move |arg, value| {
        if kinds.contains(&value.kind()) {
            Ok(())
        } else {
            Err(ValidationFailure::type_mismatch(
                arg,
                format!("`{arg}` must be one of types [{label}]. Got: {}", value.kind()),
            ))
        }
    })
}
