//! Equality and ordering predicates.

use super::Validator;
use crate::core::{CompareError, Value};
use crate::errors::ValidationFailure;
use std::cmp::Ordering;

/// Passes when the value equals `expected`. `Int` and `Float` compare
/// numerically; values of unrelated kinds are simply unequal.
pub fn eq(expected: impl Into<Value>) -> Validator {
    let expected = expected.into();
    Validator::new(format!("eq({})", expected.repr()), move |arg, value| {
        if value.loose_eq(&expected) {
            Ok(())
        } else {
            Err(ValidationFailure::constraint(
                arg,
                format!(
                    "`{arg}` must equal {}. Got: {}.",
                    expected.repr(),
                    value.repr()
                ),
            ))
        }
    })
}

/// Passes when the value is greater than `limit`.
pub fn gt(limit: impl Into<Value>) -> Validator {
    ordered("gt", limit.into(), "greater than", Ordering::is_gt)
}

/// Passes when the value is less than `limit`.
pub fn lt(limit: impl Into<Value>) -> Validator {
    ordered("lt", limit.into(), "less than", Ordering::is_lt)
}

/// Passes when the value is greater than or equal to `limit`.
pub fn ge(limit: impl Into<Value>) -> Validator {
    ordered("ge", limit.into(), "greater than or equal to", Ordering::is_ge)
}

/// Passes when the value is less than or equal to `limit`.
pub fn le(limit: impl Into<Value>) -> Validator {
    ordered("le", limit.into(), "less than or equal to", Ordering::is_le)
}

fn ordered(
    name: &'static str,
    limit: Value,
    phrase: &'static str,
    accept: fn(Ordering) -> bool,
) -> Validator {
    Validator::new(format!("{name}({})", limit.repr()), move |arg, value| {
        match value.compare(&limit) {
            Ok(ord) if accept(ord) => Ok(()),
            Ok(_) | Err(CompareError::Unordered) => Err(ValidationFailure::constraint(
                arg,
                format!(
                    "`{arg}` must be {phrase} {}. Got: {}.",
                    limit.repr(),
                    value.repr()
                ),
            )),
            Err(err) => Err(ValidationFailure::type_mismatch(
                arg,
                format!("`{arg}` must be comparable with {}: {err}", limit.repr()),
            )),
        }
    })
}
