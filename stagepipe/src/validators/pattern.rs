//! Regular expression predicates.

use super::Validator;
use crate::errors::{StagepipeError, ValidationFailure};
use regex::Regex;

/// Passes when the whole string matches `pattern`.
pub fn re_match(pattern: &str) -> Result<Validator, StagepipeError> {
    let regex = compile(&format!("^(?:{pattern})$"), pattern)?;
    Ok(matcher("re_match", pattern, regex, "match"))
}

/// Passes when some part of the string matches `pattern`.
pub fn re_search(pattern: &str) -> Result<Validator, StagepipeError> {
    let regex = compile(pattern, pattern)?;
    Ok(matcher(
        "re_search",
        pattern,
        regex,
        "contain a match for",
    ))
}

fn compile(source: &str, pattern: &str) -> Result<Regex, StagepipeError> {
    Regex::new(source).map_err(|e| StagepipeError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn matcher(name: &'static str, pattern: &str, regex: Regex, phrase: &'static str) -> Validator {
    let pattern = pattern.to_string();
    Validator::new(format!("{name}({pattern})"), move |arg, value| {
        let Some(text) = value.as_str() else {
            return Err(ValidationFailure::type_mismatch(
                arg,
                format!(
                    "`{arg}` must be a string to {phrase} `{pattern}`. Got: {}",
                    value.kind()
                ),
            ));
        };

        if regex.is_match(text) {
            Ok(())
        } else {
            Err(ValidationFailure::constraint(
                arg,
                format!(
                    "`{arg}` must {phrase} the regex pattern `{pattern}`. Got: {}.",
                    value.repr()
                ),
            ))
        }
    })
}
