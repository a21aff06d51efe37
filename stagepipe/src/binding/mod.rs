//! Argument binding.
//!
//! A [`Signature`] is the statically declared parameter schema of a stage or
//! wrapped function. [`Signature::bind`] combines it with the positional and
//! keyword arguments of a call site ([`CallArgs`]) into an
//! [`ArgumentBinding`]: one value per declared parameter, in declaration
//! order, followed by any extra keyword arguments.
//!
//! Lookups are presence-based: a supplied `0`, `""` or `false` is never
//! replaced by a default.

use crate::core::{Value, ValueKind};
use crate::errors::BindingError;
use crate::validation::RETURN_KEY;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Default value used when the call site omits the parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Expected kind, checked alongside the configured validators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,
}

impl Param {
    /// Creates a required parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            kind: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the expected kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Returns true if the parameter has no default.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Ordered parameter schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// Creates an empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Appends a required parameter.
    #[must_use]
    pub fn param(self, name: impl Into<String>) -> Self {
        self.with_param(Param::new(name))
    }

    /// Appends a parameter with a default value.
    #[must_use]
    pub fn param_with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.with_param(Param::new(name).with_default(default))
    }

    /// Appends a required parameter of a given kind.
    #[must_use]
    pub fn typed_param(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.with_param(Param::new(name).with_kind(kind))
    }

    /// Appends a typed parameter with a default value.
    #[must_use]
    pub fn typed_param_with_default(
        self,
        name: impl Into<String>,
        kind: ValueKind,
        default: impl Into<Value>,
    ) -> Self {
        self.with_param(Param::new(name).with_kind(kind).with_default(default))
    }

    /// Returns the declared parameters.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the declared parameter names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Returns the declared kind of a parameter, if any.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.get(name).and_then(|p| p.kind)
    }

    /// Returns true if any parameter declares a kind.
    #[must_use]
    pub fn has_typed_params(&self) -> bool {
        self.params.iter().any(|p| p.kind.is_some())
    }

    /// Number of parameters without defaults.
    #[must_use]
    pub fn num_required(&self) -> usize {
        self.params.iter().filter(|p| p.is_required()).count()
    }

    /// Checks that names are unique, not reserved, and that defaults only
    /// appear on trailing parameters.
    pub fn check(&self) -> Result<(), BindingError> {
        let mut seen = HashSet::new();
        let mut saw_default = false;

        for param in &self.params {
            if param.name.trim().is_empty() {
                return Err(BindingError::invalid_signature(
                    "parameter names cannot be empty",
                ));
            }
            if param.name == RETURN_KEY {
                return Err(BindingError::invalid_signature(format!(
                    "'{RETURN_KEY}' is reserved for return value validation"
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(BindingError::invalid_signature(format!(
                    "duplicate parameter '{}'",
                    param.name
                )));
            }
            if param.is_required() && saw_default {
                return Err(BindingError::invalid_signature(format!(
                    "required parameter '{}' follows a parameter with a default",
                    param.name
                )));
            }
            saw_default |= !param.is_required();
        }

        Ok(())
    }

    /// Binds call-site arguments to this signature.
    ///
    /// Positional values fill parameters in order, defaults fill the rest,
    /// and keyword values override both. Keywords that name no parameter
    /// are kept after the declared ones. The keyword `"return"` is
    /// rejected.
    pub fn bind(&self, call: &CallArgs) -> Result<ArgumentBinding, BindingError> {
        self.check()?;

        if call.kwargs.contains_key(RETURN_KEY) {
            return Err(BindingError::ReservedArgument {
                name: RETURN_KEY.to_string(),
            });
        }

        if call.args.len() > self.params.len() {
            return Err(BindingError::TooManyPositional {
                expected: self.params.len(),
                got: call.args.len(),
            });
        }

        let mut values = IndexMap::with_capacity(self.params.len() + call.kwargs.len());
        for (position, param) in self.params.iter().enumerate() {
            let value = call
                .args
                .get(position)
                .or(param.default.as_ref())
                .or_else(|| call.kwargs.get(&param.name));
            if let Some(value) = value {
                values.insert(param.name.clone(), value.clone());
            }
        }

        for (name, value) in &call.kwargs {
            values.insert(name.clone(), value.clone());
        }

        let missing: Vec<String> = self
            .params
            .iter()
            .filter(|p| !values.contains_key(&p.name))
            .map(|p| p.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(BindingError::MissingArguments { missing });
        }

        Ok(ArgumentBinding { values })
    }
}

/// Positional and keyword arguments supplied at a call site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Keyword arguments, in the order they were given.
    #[serde(default)]
    pub kwargs: IndexMap<String, Value>,
}

impl CallArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an argument list from positional values.
    pub fn positional<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            kwargs: IndexMap::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Adds a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }
}

/// Name → value mapping produced by [`Signature::bind`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentBinding {
    values: IndexMap<String, Value>,
}

impl ArgumentBinding {
    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the value bound to `name` or an `UnknownArgument` error.
    pub fn require(&self, name: &str) -> Result<&Value, BindingError> {
        self.values
            .get(name)
            .ok_or_else(|| BindingError::unknown_argument(name))
    }

    /// Replaces or adds a value, keeping the original position of an
    /// existing name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    /// Returns true if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates over bound names and values in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over bound names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the binding and returns the underlying map.
    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }
}

impl FromIterator<(String, Value)> for ArgumentBinding {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
