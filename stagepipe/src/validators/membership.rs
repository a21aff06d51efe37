//! Membership predicates.

use super::Validator;
use crate::core::Value;
use crate::errors::ValidationFailure;

/// Passes when the value equals one of `allowed`.
pub fn is_in<I, V>(allowed: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let allowed = Value::list(allowed);
    Validator::new(format!("is_in({})", allowed.repr()), move |arg, value| {
        if allowed.contains_item(value) == Some(true) {
            Ok(())
        } else {
            Err(ValidationFailure::constraint(
                arg,
                format!(
                    "`{arg}` must be one of {}. Got: {}.",
                    allowed.repr(),
                    value.repr()
                ),
            ))
        }
    })
}

/// Passes when the value contains every element of `required`.
///
/// Lists and tuples are searched by item, maps by key and strings by
/// substring. The failure message lists the missing elements.
pub fn contains<I, V>(required: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let required = Value::list(required);
    Validator::new(format!("contains({})", required.repr()), move |arg, value| {
        let mut missing = Vec::new();
        for item in required.as_items().unwrap_or_default() {
            match value.contains_item(item) {
                Some(true) => {}
                Some(false) => missing.push(item.clone()),
                None => {
                    return Err(ValidationFailure::type_mismatch(
                        arg,
                        format!(
                            "`{arg}` of type {} cannot contain {}",
                            value.kind(),
                            item.repr()
                        ),
                    ))
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::constraint(
                arg,
                format!(
                    "`{arg}` must contain all of {}. Missing: {}.",
                    required.repr(),
                    Value::List(missing).repr()
                ),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;

    #[test]
    fn test_is_in() {
        let validator = is_in([0, 1, 2]);
        assert!(validator.check("a", &Value::Int(2)).is_ok());
        assert!(validator.check("a", &Value::Float(1.0)).is_ok());

        let failure = validator.check("a", &Value::Int(5)).unwrap_err();
        assert_eq!(failure.message, "`a` must be one of [0, 1, 2]. Got: 5.");
    }

    #[test]
    fn test_contains_present() {
        let value = Value::list([1, 2, 3]);
        assert!(contains([2]).check("a", &value).is_ok());
        assert!(contains([1, 3]).check("a", &value).is_ok());
    }

    #[test]
    fn test_contains_names_missing() {
        let failure = contains([4]).check("a", &Value::list([1, 2, 3])).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Constraint);
        assert_eq!(failure.message, "`a` must contain all of [4]. Missing: [4].");

        let failure = contains([2, 4, 5])
            .check("a", &Value::list([1, 2, 3]))
            .unwrap_err();
        assert!(failure.message.ends_with("Missing: [4, 5]."));
    }

    #[test]
    fn test_contains_on_strings_and_maps() {
        assert!(contains(["ell"]).check("a", &Value::from("hello")).is_ok());
        assert!(contains(["k"]).check("a", &Value::map([("k", 1)])).is_ok());
    }

    #[test]
    fn test_contains_non_container() {
        let failure = contains([1]).check("a", &Value::Int(1)).unwrap_err();
        assert_eq!(failure.kind, FailureKind::TypeMismatch);
    }
}
