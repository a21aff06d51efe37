//! Stage definitions.

use super::pipe::Pipe;
use crate::binding::{ArgumentBinding, CallArgs, Signature};
use crate::core::{ActionOnFail, Value};
use crate::errors::{BindingError, StageExecutionError, StagepipeError};
use crate::validation::{ArgRules, BodyFn};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Name of the single parameter in a stage's default signature.
pub const PAYLOAD_PARAM: &str = "payload";

/// Outcome of a stage invocation that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    /// The stage completed, or failed under [`ActionOnFail::Continue`].
    Completed(Value),
    /// The body failed under [`ActionOnFail::Break`].
    Failed {
        /// Recorded return value; `None` when the body produced nothing.
        value: Value,
        /// Errors recorded for the invocation, in order.
        errors: Vec<StagepipeError>,
    },
}

impl StageResult {
    /// Returns true for [`StageResult::Completed`].
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Returns the carried value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Completed(value) | Self::Failed { value, .. } => value,
        }
    }

    /// Consumes the result and returns the carried value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Completed(value) | Self::Failed { value, .. } => value,
        }
    }

    /// Returns recorded errors; empty for completed stages.
    #[must_use]
    pub fn errors(&self) -> &[StagepipeError] {
        match self {
            Self::Completed(_) => &[],
            Self::Failed { errors, .. } => errors,
        }
    }
}

/// A named pipeline step: a body plus its signature, argument rules and
/// failure policy.
#[derive(Clone)]
pub struct Stage {
    name: String,
    signature: Signature,
    rules: ArgRules,
    action_on_fail: ActionOnFail,
    body: Arc<BodyFn>,
}

impl Stage {
    /// Starts building a stage.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> StageBuilder {
        StageBuilder::new(name)
    }

    /// Creates a stage with the default single `payload` parameter and no
    /// rules. Unlike [`StageBuilder::build`] this cannot fail.
    pub fn new<F>(name: impl Into<String>, action_on_fail: ActionOnFail, body: F) -> Self
    where
        F: Fn(&ArgumentBinding) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: default_signature(),
            rules: ArgRules::new(),
            action_on_fail,
            body: Arc::new(body),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage signature.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the argument rules.
    #[must_use]
    pub const fn rules(&self) -> &ArgRules {
        &self.rules
    }

    /// Returns the failure policy.
    #[must_use]
    pub const fn action_on_fail(&self) -> ActionOnFail {
        self.action_on_fail
    }

    /// Invokes the stage on `pipe`. See [`Pipe::call_stage`].
    pub fn call(&self, pipe: &mut Pipe, call: CallArgs) -> Result<StageResult, StagepipeError> {
        pipe.call_stage(self, call)
    }

    /// Runs the body, turning both errors and panics into a
    /// [`StageExecutionError`].
    pub(crate) fn invoke(&self, binding: &ArgumentBinding) -> Result<Value, StageExecutionError> {
        match catch_unwind(AssertUnwindSafe(|| (self.body)(binding))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(StageExecutionError::from_anyhow(self.name.as_str(), &err)),
            Err(payload) => Err(StageExecutionError::from_panic(
                self.name.as_str(),
                payload.as_ref(),
            )),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("rules", &self.rules)
            .field("action_on_fail", &self.action_on_fail)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Stage`].
#[derive(Debug, Clone)]
pub struct StageBuilder {
    name: String,
    signature: Option<Signature>,
    rules: ArgRules,
    action_on_fail: ActionOnFail,
}

impl StageBuilder {
    /// Creates a builder with the default signature and policy.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: None,
            rules: ArgRules::new(),
            action_on_fail: ActionOnFail::default(),
        }
    }

    /// Sets the parameter schema. Defaults to a single required
    /// `payload` parameter.
    #[must_use]
    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Sets the conversion and validation rules.
    #[must_use]
    pub fn rules(mut self, rules: ArgRules) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub const fn action_on_fail(mut self, action: ActionOnFail) -> Self {
        self.action_on_fail = action;
        self
    }

    /// Finishes the stage with `body`.
    pub fn build<F>(self, body: F) -> Result<Stage, BindingError>
    where
        F: Fn(&ArgumentBinding) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let signature = self.signature.unwrap_or_else(default_signature);
        signature.check()?;

        Ok(Stage {
            name: self.name,
            signature,
            rules: self.rules,
            action_on_fail: self.action_on_fail,
            body: Arc::new(body),
        })
    }
}

fn default_signature() -> Signature {
    Signature::new().param(PAYLOAD_PARAM)
}
