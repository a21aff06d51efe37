//! Length bounds for strings and collections.

use super::Validator;
use crate::errors::ValidationFailure;

/// Passes when the value's length is at most `limit`.
#[must_use]
pub fn max_len(limit: usize) -> Validator {
    bounded("max_len", limit, "less than or equal to", |len, limit| len <= limit)
}

/// Passes when the value's length is at least `limit`.
#[must_use]
pub fn min_len(limit: usize) -> Validator {
    bounded("min_len", limit, "greater than or equal to", |len, limit| len >= limit)
}

fn bounded(
    name: &'static str,
    limit: usize,
    phrase: &'static str,
    accept: fn(usize, usize) -> bool,
) -> Validator {
    Validator::new(format!("{name}({limit})"), move |arg, value| {
        let Some(len) = value.len() else {
            return Err(ValidationFailure::type_mismatch(
                arg,
                format!("`{arg}` of type {} has no length", value.kind()),
            ));
        };

        if accept(len, limit) {
            Ok(())
        } else {
            Err(ValidationFailure::constraint(
                arg,
                format!("`{arg}` must have a length {phrase} {limit}. Got length: {len}."),
            ))
        }
    })
}
