//! Argument conversion and validation around a wrapped function.
//!
//! [`ArgRules`] holds per-argument converter and validator chains plus an
//! optional chain for the return value. [`validate_args`] wraps a body so
//! that every call binds, converts and validates its arguments before the
//! body runs, and validates the result after.

use crate::binding::{ArgumentBinding, CallArgs, Signature};
use crate::converters::{apply_chain, Converter};
use crate::core::Value;
use crate::errors::{
    InvalidArgumentsError, StageExecutionError, StagepipeError, ValidationFailure,
};
use crate::validators::{is_type, Validator};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Reserved rule key for the return value.
pub const RETURN_KEY: &str = "return";

/// Body of a wrapped function or stage.
pub type BodyFn = dyn Fn(&ArgumentBinding) -> anyhow::Result<Value> + Send + Sync;

/// Converter and validator chains keyed by argument name.
#[derive(Debug, Clone, Default)]
pub struct ArgRules {
    validations: IndexMap<String, Vec<Validator>>,
    conversions: IndexMap<String, Vec<Converter>>,
}

impl ArgRules {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends validators to an argument's chain. Use [`RETURN_KEY`] or
    /// [`ArgRules::returns`] for the return value.
    #[must_use]
    pub fn validate<I>(mut self, argument: impl Into<String>, validators: I) -> Self
    where
        I: IntoIterator<Item = Validator>,
    {
        self.validations
            .entry(argument.into())
            .or_default()
            .extend(validators);
        self
    }

    /// Appends validators to the return value's chain.
    #[must_use]
    pub fn returns<I>(self, validators: I) -> Self
    where
        I: IntoIterator<Item = Validator>,
    {
        self.validate(RETURN_KEY, validators)
    }

    /// Appends converters to an argument's chain.
    #[must_use]
    pub fn convert<I>(mut self, argument: impl Into<String>, converters: I) -> Self
    where
        I: IntoIterator<Item = Converter>,
    {
        self.conversions
            .entry(argument.into())
            .or_default()
            .extend(converters);
        self
    }

    /// Returns true if no chains are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validations.is_empty() && self.conversions.is_empty()
    }

    /// Returns true if any argument or return validators are configured.
    #[must_use]
    pub fn has_validations(&self) -> bool {
        self.validations.values().any(|chain| !chain.is_empty())
    }

    /// Returns true if return value validators are configured.
    #[must_use]
    pub fn has_return_validations(&self) -> bool {
        self.validations
            .get(RETURN_KEY)
            .is_some_and(|chain| !chain.is_empty())
    }

    /// Returns the validator chain for an argument.
    #[must_use]
    pub fn validators_for(&self, argument: &str) -> &[Validator] {
        self.validations.get(argument).map_or(&[], Vec::as_slice)
    }

    /// Returns the converter chain for an argument.
    #[must_use]
    pub fn converters_for(&self, argument: &str) -> &[Converter] {
        self.conversions.get(argument).map_or(&[], Vec::as_slice)
    }

    /// Runs each converter chain over the matching bound argument.
    #[must_use]
    pub fn convert_binding(&self, mut binding: ArgumentBinding) -> ArgumentBinding {
        for (argument, chain) in &self.conversions {
            if chain.is_empty() {
                continue;
            }
            if let Some(value) = binding.get(argument).cloned() {
                binding.insert(argument.clone(), apply_chain(chain, argument, value));
            }
        }
        binding
    }

    /// Runs an argument's validator chain and returns every failure in
    /// chain order.
    #[must_use]
    pub fn check_value(&self, argument: &str, value: &Value) -> Vec<ValidationFailure> {
        self.validators_for(argument)
            .iter()
            .filter_map(|validator| validator.check(argument, value).err())
            .collect()
    }

    /// Validates every bound argument.
    ///
    /// A parameter's declared kind is checked first, then its configured
    /// chain. Failures are grouped by argument name.
    pub fn check_binding(
        &self,
        signature: &Signature,
        binding: &ArgumentBinding,
    ) -> Result<(), InvalidArgumentsError> {
        let mut failures: IndexMap<String, Vec<ValidationFailure>> = IndexMap::new();

        for (argument, value) in binding.iter() {
            let mut arg_failures: Vec<ValidationFailure> = signature
                .kind_of(argument)
                .and_then(|kind| is_type(kind).check(argument, value).err())
                .into_iter()
                .collect();
            arg_failures.extend(self.check_value(argument, value));

            if !arg_failures.is_empty() {
                failures.insert(argument.to_string(), arg_failures);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(InvalidArgumentsError::new(failures))
        }
    }

    /// Validates a return value against the [`RETURN_KEY`] chain.
    pub fn check_return(&self, value: &Value) -> Result<(), InvalidArgumentsError> {
        let failures = self.check_value(RETURN_KEY, value);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(InvalidArgumentsError::single(RETURN_KEY, failures))
        }
    }

    /// Binds, converts and validates a call.
    pub fn prepare(
        &self,
        signature: &Signature,
        call: &CallArgs,
    ) -> Result<ArgumentBinding, StagepipeError> {
        let binding = self.convert_binding(signature.bind(call)?);
        self.check_binding(signature, &binding)?;
        Ok(binding)
    }
}

/// A function wrapped with argument conversion and validation.
#[derive(Clone)]
pub struct ValidatedFn {
    name: String,
    signature: Signature,
    rules: ArgRules,
    body: Arc<BodyFn>,
}

impl ValidatedFn {
    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared signature.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the configured rules.
    #[must_use]
    pub const fn rules(&self) -> &ArgRules {
        &self.rules
    }

    /// Calls the wrapped function.
    ///
    /// The body only runs when every argument passes validation, and it
    /// receives the converted values. A result that fails the return chain
    /// is reported as an error keyed `"return"`.
    pub fn call(&self, call: &CallArgs) -> Result<Value, StagepipeError> {
        let binding = self.rules.prepare(&self.signature, call)?;
        debug!(function = %self.name, arguments = binding.len(), "Invoking validated function");

        let result = (self.body)(&binding)
            .map_err(|err| StageExecutionError::from_anyhow(self.name.as_str(), &err))?;

        self.rules.check_return(&result)?;
        Ok(result)
    }
}

impl fmt::Debug for ValidatedFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedFn")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// Wraps `body` so that calls are bound to `signature`, converted and
/// validated with `rules`.
///
/// # Errors
///
/// Returns an error if `signature` is malformed.
pub fn validate_args<F>(
    name: impl Into<String>,
    signature: Signature,
    rules: ArgRules,
    body: F,
) -> Result<ValidatedFn, StagepipeError>
where
    F: Fn(&ArgumentBinding) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    signature.check()?;
    Ok(ValidatedFn {
        name: name.into(),
        signature,
        rules,
        body: Arc::new(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::{replace_none, to_type};
    use crate::core::ValueKind;
    use crate::errors::{BindingError, FailureKind};
    use crate::validators::{gt, is_in, lt};
    use anyhow::Context;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn some_func_signature() -> Signature {
        Signature::new().param("a").param("b").param("c").param("d")
    }

    fn some_func(args: &ArgumentBinding) -> anyhow::Result<Value> {
        let a = args.require("a")?.as_int().context("a must be an int")?;
        let b = args.require("b")?.as_int().context("b must be an int")?;
        let d = args.require("d")?;
        if args.require("c")?.is_truthy() {
            Ok(Value::Int(a + b))
        } else {
            Ok(Value::Str(format!("{}_{d}", a - b)))
        }
    }

    #[test]
    fn test_no_rules_passes_through() {
        let func = validate_args("some_func", some_func_signature(), ArgRules::new(), some_func)
            .unwrap();
        let result = func
            .call(&CallArgs::positional([Value::Int(1), Value::Int(2), Value::Bool(true)]).arg("test"))
            .unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn test_converts_then_validates() {
        let rules = ArgRules::new()
            .validate("a", [is_type(ValueKind::Int)])
            .returns([is_type(ValueKind::Str)])
            .convert("a", [to_type(ValueKind::Int)])
            .convert("c", [to_type(ValueKind::Bool)]);
        let func = validate_args("some_func", some_func_signature(), rules, some_func).unwrap();

        let result = func
            .call(&CallArgs::positional([Value::Float(1.0), Value::Int(2), Value::Int(0)]).kwarg("d", "test"))
            .unwrap();
        assert_eq!(result, Value::from("-1_test"));
    }

    #[test]
    fn test_invalid_argument_never_invokes_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let rules = ArgRules::new()
            .validate("a", [is_type(ValueKind::Int)])
            .convert("c", [to_type(ValueKind::Bool)]);
        let func = validate_args("some_func", some_func_signature(), rules, move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            some_func(args)
        })
        .unwrap();

        let err = func
            .call(&CallArgs::positional([Value::Float(1.0), Value::Int(2), Value::Int(0)]).arg("test"))
            .unwrap_err();

        let invalid = err.invalid_arguments().unwrap();
        assert_eq!(invalid.arguments().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(invalid.failures_for("a")[0].kind, FailureKind::TypeMismatch);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_return_validation_failure() {
        let rules = ArgRules::new()
            .validate("a", [is_type(ValueKind::Int), gt(0)])
            .returns([lt(1)])
            .convert("c", [to_type(ValueKind::Bool)]);
        let func = validate_args("some_func", some_func_signature(), rules, some_func).unwrap();

        let err = func
            .call(&CallArgs::positional([Value::Int(1), Value::Int(2), Value::Int(1)]).arg("test"))
            .unwrap_err();

        let invalid = err.invalid_arguments().unwrap();
        assert_eq!(invalid.arguments().collect::<Vec<_>>(), vec![RETURN_KEY]);
        assert_eq!(invalid.failure_count(), 1);
    }

    #[test]
    fn test_failures_accumulate_in_chain_order() {
        let rules = ArgRules::new().validate("a", [is_type(ValueKind::Int), gt(10), is_in([1, 2])]);
        let sig = Signature::new().param("a");
        let binding = sig.bind(&CallArgs::positional([5])).unwrap();

        let err = rules.check_binding(&sig, &binding).unwrap_err();
        let messages: Vec<&str> = err
            .failures_for("a")
            .iter()
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "`a` must be greater than 10. Got: 5.",
                "`a` must be one of [1, 2]. Got: 5.",
            ]
        );
    }

    #[test]
    fn test_failures_grouped_per_argument() {
        let rules = ArgRules::new()
            .validate("a", [gt(0)])
            .validate("b", [gt(0), lt(-5)]);
        let sig = Signature::new().param("a").param("b");
        let binding = sig.bind(&CallArgs::positional([-1, -1])).unwrap();

        let err = rules.check_binding(&sig, &binding).unwrap_err();
        assert_eq!(err.failures_for("a").len(), 1);
        assert_eq!(err.failures_for("b").len(), 2);
        assert_eq!(err.failure_count(), 3);
    }

    #[test]
    fn test_declared_kind_is_checked() {
        let sig = Signature::new().typed_param("n", ValueKind::Int);
        let binding = sig.bind(&CallArgs::positional(["x"])).unwrap();
        let err = ArgRules::new().check_binding(&sig, &binding).unwrap_err();
        assert!(err.failures_for("n")[0].is_type_mismatch());
    }

    #[test]
    fn test_replace_none_then_validate() {
        let rules = ArgRules::new()
            .convert("a", [replace_none(0)])
            .validate("a", [is_type(ValueKind::Int)]);
        let sig = Signature::new().param("a");
        let call = CallArgs::positional([Value::None]);

        let raw = sig.bind(&call).unwrap();
        assert!(rules.check_binding(&sig, &raw).is_err());

        let binding = rules.prepare(&sig, &call).unwrap();
        assert_eq!(binding.get("a"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_extra_keywords_are_validated() {
        let rules = ArgRules::new().validate("extra", [gt(0)]);
        let func = validate_args("f", Signature::new(), rules, |_| Ok(Value::None)).unwrap();

        assert!(func.call(&CallArgs::new().kwarg("extra", 1)).is_ok());
        assert!(func.call(&CallArgs::new().kwarg("extra", -1)).is_err());
    }

    #[test]
    fn test_return_keyword_never_reaches_return_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let rules = ArgRules::new().returns([is_type(ValueKind::Int)]);
        let func = validate_args("f", Signature::new(), rules, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(1))
        })
        .unwrap();

        let err = func.call(&CallArgs::new().kwarg(RETURN_KEY, "x")).unwrap_err();

        assert!(matches!(
            err,
            StagepipeError::Binding(BindingError::ReservedArgument { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_binding_errors_surface() {
        let func = validate_args("f", Signature::new().param("a"), ArgRules::new(), |_| {
            Ok(Value::None)
        })
        .unwrap();
        let err = func.call(&CallArgs::new()).unwrap_err();
        assert!(matches!(
            err,
            StagepipeError::Binding(BindingError::MissingArguments { .. })
        ));
    }

    #[test]
    fn test_body_errors_are_stage_execution() {
        let func = validate_args("divide", Signature::new().param("n"), ArgRules::new(), |args| {
            let n = args.require("n")?.as_int().unwrap_or_default();
            if n == 0 {
                anyhow::bail!("division by zero");
            }
            Ok(Value::Int(10 / n))
        })
        .unwrap();

        assert_eq!(func.call(&CallArgs::positional([2])).unwrap(), Value::Int(5));
        let err = func.call(&CallArgs::positional([0])).unwrap_err();
        assert_eq!(err.stage_execution().unwrap().message, "division by zero");
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let result = validate_args(
            "f",
            Signature::new().param("a").param("a"),
            ArgRules::new(),
            |_| Ok(Value::None),
        );
        assert!(result.is_err());
    }
}
