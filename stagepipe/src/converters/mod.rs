//! Converter predicates.
//!
//! A [`Converter`] transforms a bound argument before validation. Converters
//! never fail: when a value cannot be converted they log a warning and hand
//! back the original value untouched, leaving it to a validator to reject.

use crate::core::{CastError, Value, ValueKind};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Signature of a converter transform.
pub type ConvertFn = dyn Fn(&str, Value) -> Value + Send + Sync;

/// A named value transform.
#[derive(Clone)]
pub struct Converter {
    name: String,
    apply: Arc<ConvertFn>,
}

impl Converter {
    /// Creates a converter from an infallible transform.
    pub fn new<F>(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Creates a converter from a fallible transform. Failures are logged at
    /// warn level and the original value is returned.
    pub fn fallible<F>(name: impl Into<String>, convert: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self::new(name, move |arg, value| match convert(&value) {
            Ok(converted) => converted,
            Err(error) => {
                warn!(
                    argument = %arg,
                    converter = %label,
                    value = %value.repr(),
                    error = %error,
                    "Conversion failed, keeping original value"
                );
                value
            }
        })
    }

    /// Returns the converter's label, e.g. `to_type(int)`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Converts `value`, bound to `argument`.
    #[must_use]
    pub fn apply(&self, argument: &str, value: Value) -> Value {
        (self.apply)(argument, value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .finish()
    }
}

/// Applies `converters` left to right, feeding each output into the next.
/// An empty chain returns the value unchanged.
#[must_use]
pub fn apply_chain(converters: &[Converter], argument: &str, value: Value) -> Value {
    converters
        .iter()
        .fold(value, |value, converter| converter.apply(argument, value))
}

/// Casts the value to `kind`.
#[must_use]
pub fn to_type(kind: ValueKind) -> Converter {
    Converter::fallible(format!("to_type({kind})"), move |value| value.cast(kind))
}

/// Substitutes `default` when the value is `None`.
pub fn replace_none(default: impl Into<Value>) -> Converter {
    let default = default.into();
    Converter::new(format!("replace_none({})", default.repr()), move |_, value| {
        if value.is_none() {
            default.clone()
        } else {
            value
        }
    })
}

/// Reads the value as a float and raises it to at least `min`.
#[must_use]
pub fn clip_min(min: f64) -> Converter {
    Converter::fallible(format!("clip_min({min:?})"), move |value| {
        value.to_f64().map(|x| Value::Float(x.max(min)))
    })
}

/// Reads the value as a float and lowers it to at most `max`.
#[must_use]
pub fn clip_max(max: f64) -> Converter {
    Converter::fallible(format!("clip_max({max:?})"), move |value| {
        value.to_f64().map(|x| Value::Float(x.min(max)))
    })
}

/// Stringifies the value and trims any of `chars` from both ends.
pub fn strip_chars(chars: impl Into<String>) -> Converter {
    let chars: Vec<char> = chars.into().chars().collect();
    let label: String = chars.iter().collect();
    Converter::new(format!("strip_chars({label:?})"), move |_, value| {
        Value::Str(value.to_string().trim_matches(chars.as_slice()).to_string())
    })
}

/// Stringifies the value and lowercases it.
#[must_use]
pub fn to_lower() -> Converter {
    Converter::new("to_lower()", |_, value| Value::Str(value.to_string().to_lowercase()))
}

/// Stringifies the value and uppercases it.
#[must_use]
pub fn to_upper() -> Converter {
    Converter::new("to_upper()", |_, value| Value::Str(value.to_string().to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    type Fields = BTreeMap<String, String>;

    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<Mutex<Vec<(Level, Fields)>>>);

    impl CapturedEvents {
        fn at(&self, level: Level) -> Vec<Fields> {
            self.0
                .lock()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, fields)| fields.clone())
                .collect()
        }
    }

    struct FieldVisitor<'a>(&'a mut Fields);

    impl Visit for FieldVisitor<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: Subscriber> Layer<S> for CapturedEvents {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = Fields::new();
            event.record(&mut FieldVisitor(&mut fields));
            self.0.lock().push((*event.metadata().level(), fields));
        }
    }

    fn capture<T>(f: impl FnOnce() -> T) -> (T, CapturedEvents) {
        let events = CapturedEvents::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, events)
    }

    #[test]
    fn test_to_type() {
        assert_eq!(to_type(ValueKind::Int).apply("a", Value::Float(1.0)), Value::Int(1));
        assert_eq!(to_type(ValueKind::Float).apply("a", Value::Int(1)), Value::Float(1.0));
        assert_eq!(to_type(ValueKind::Str).apply("a", Value::Int(1)), Value::from("1"));
    }

    #[test]
    fn test_to_type_failure_keeps_original() {
        assert_eq!(to_type(ValueKind::List).apply("a", Value::Int(1)), Value::Int(1));
        assert_eq!(
            to_type(ValueKind::Int).apply("a", Value::from("abc")),
            Value::from("abc")
        );
    }

    #[test]
    fn test_replace_none() {
        let converter = replace_none("default");
        assert_eq!(converter.apply("a", Value::None), Value::from("default"));
        assert_eq!(converter.apply("a", Value::from("initial")), Value::from("initial"));
        assert_eq!(replace_none(1).apply("a", Value::Int(0)), Value::Int(0));
    }

    #[test]
    fn test_clip_min() {
        assert_eq!(clip_min(0.0).apply("a", Value::Int(-1)), Value::Float(0.0));
        assert_eq!(clip_min(0.0).apply("a", Value::Int(1)), Value::Float(1.0));
        assert_eq!(clip_min(0.0).apply("a", Value::from("-3")), Value::Float(0.0));
        assert_eq!(
            clip_min(0.0).apply("a", Value::list([-1])),
            Value::list([-1])
        );
    }

    #[test]
    fn test_clip_max() {
        assert_eq!(clip_max(0.0).apply("a", Value::Int(1)), Value::Float(0.0));
        assert_eq!(clip_max(0.0).apply("a", Value::Int(-1)), Value::Float(-1.0));
        assert_eq!(clip_max(0.0).apply("a", Value::list([1])), Value::list([1]));
    }

    #[test]
    fn test_strip_chars() {
        assert_eq!(strip_chars(" ").apply("a", Value::from("  ")), Value::from(""));
        assert_eq!(strip_chars(" ").apply("a", Value::from(" blah ")), Value::from("blah"));
        assert_eq!(
            strip_chars("[]").apply("a", Value::list([1, 2, 3, 4])),
            Value::from("1, 2, 3, 4")
        );
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(to_lower().apply("a", Value::from("BLAH")), Value::from("blah"));
        assert_eq!(to_lower().apply("a", Value::Int(1)), Value::from("1"));
        assert_eq!(
            to_upper().apply("a", Value::from("Some_Thing_With_Punc!")),
            Value::from("SOME_THING_WITH_PUNC!")
        );
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let value = Value::map([("k", Value::list([1, 2]))]);
        assert_eq!(apply_chain(&[], "a", value.clone()), value);
    }

    #[test]
    fn test_chain_runs_left_to_right() {
        let chain = [replace_none(" Mixed "), strip_chars(" "), to_upper()];
        assert_eq!(apply_chain(&chain, "a", Value::None), Value::from("MIXED"));
    }

    #[test]
    fn test_failed_conversion_emits_warning() {
        let (value, events) = capture(|| to_type(ValueKind::Int).apply("a", Value::from("abc")));

        assert_eq!(value, Value::from("abc"));
        let warnings = events.at(Level::WARN);
        assert_eq!(warnings.len(), 1);
        let fields = &warnings[0];
        assert_eq!(fields["argument"], "a");
        assert_eq!(fields["converter"], "to_type(int)");
        assert_eq!(fields["value"], "\"abc\"");
        assert!(fields["error"].starts_with("cannot convert str to int"));
    }

    #[test]
    fn test_successful_conversion_is_silent() {
        let (value, events) = capture(|| clip_min(0.0).apply("a", Value::Int(-3)));

        assert_eq!(value, Value::Float(0.0));
        assert!(events.at(Level::WARN).is_empty());
    }

    #[test]
    fn test_out_of_range_float_keeps_original() {
        let (value, events) = capture(|| to_type(ValueKind::Int).apply("a", Value::Float(1e30)));

        assert_eq!(value, Value::Float(1e30));
        assert_eq!(events.at(Level::WARN).len(), 1);
    }
}
