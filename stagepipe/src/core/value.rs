//! Tagged values passed between call sites, validators, converters and stages.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A dynamically-kinded value.
///
/// Stage arguments and payloads are carried as `Value`s so that a single
/// validator or converter can be applied to any argument. `None` is the
/// "absent" sentinel targeted by `replace_none`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    #[default]
    None,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Growable sequence.
    List(Vec<Value>),
    /// Fixed sequence. Serializes as a JSON array.
    Tuple(Vec<Value>),
    /// Insertion-ordered string-keyed map.
    Map(IndexMap<String, Value>),
}

/// The kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// [`Value::None`]
    None,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Int`]
    Int,
    /// [`Value::Float`]
    Float,
    /// [`Value::Str`]
    Str,
    /// [`Value::List`]
    List,
    /// [`Value::Tuple`]
    Tuple,
    /// [`Value::Map`]
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "str"),
            Self::List => write!(f, "list"),
            Self::Tuple => write!(f, "tuple"),
            Self::Map => write!(f, "map"),
        }
    }
}

/// Error returned when a value cannot be cast to another kind.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("cannot convert {from} to {to}: {reason}")]
pub struct CastError {
    /// Kind of the source value.
    pub from: ValueKind,
    /// Requested kind.
    pub to: ValueKind,
    /// Why the cast failed.
    pub reason: String,
}

impl CastError {
    fn new(from: ValueKind, to: ValueKind, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
        }
    }
}

/// Error returned when two values cannot be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompareError {
    /// The kinds have no ordering between them.
    #[error("cannot compare {left} with {right}")]
    Incomparable {
        /// Kind of the left operand.
        left: ValueKind,
        /// Kind of the right operand.
        right: ValueKind,
    },
    /// Same-kind values without an ordering (NaN).
    #[error("values are unordered")]
    Unordered,
}

impl Value {
    /// Builds a list from anything convertible to values.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a tuple from anything convertible to values.
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map from key/value pairs, keeping insertion order.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::List(_) => ValueKind::List,
            Self::Tuple(_) => ValueKind::Tuple,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// Returns true for [`Value::None`].
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the integer, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        if let Self::Int(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Returns the value as a float. Integers are widened.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let Self::Str(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Returns the boolean, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Returns the items of a `List` or `Tuple`.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map, if this is a `Map`.
    #[must_use]
    pub const fn as_map(&self) -> Option<&IndexMap<String, Self>> {
        if let Self::Map(map) = self {
            Some(map)
        } else {
            None
        }
    }

    /// Length of sized values: characters of a `Str`, items of a
    /// `List`/`Tuple`, entries of a `Map`.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Str(s) => Some(s.chars().count()),
            Self::List(items) | Self::Tuple(items) => Some(items.len()),
            Self::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Truthiness: `None`, `false`, zero and empty collections are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(x) => *x != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) | Self::Tuple(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Structural equality where `Int` and `Float` compare numerically.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => {
                cmp_int_float(*a, *b) == Some(Ordering::Equal)
            }
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.loose_eq(w)))
            }
            _ => self == other,
        }
    }

    /// Orders two values.
    ///
    /// Numbers order numerically across `Int`/`Float`, strings and booleans
    /// order naturally, and same-kind sequences order lexicographically.
    pub fn compare(&self, other: &Self) -> Result<Ordering, CompareError> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Ok(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => cmp_int_float(*a, *b).ok_or(CompareError::Unordered),
            (Self::Float(a), Self::Int(b)) => cmp_int_float(*b, *a)
                .map(Ordering::reverse)
                .ok_or(CompareError::Unordered),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).ok_or(CompareError::Unordered),
            (Self::Str(a), Self::Str(b)) => Ok(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Ok(a.cmp(b)),
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        ord => return Ok(ord),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(CompareError::Incomparable {
                left: self.kind(),
                right: other.kind(),
            }),
        }
    }

    /// Membership test.
    ///
    /// `List`/`Tuple` look for a loosely equal item, `Map` looks up a
    /// string key and `Str` looks for a substring. Returns `None` when this
    /// value cannot contain `item`.
    #[must_use]
    pub fn contains_item(&self, item: &Self) -> Option<bool> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items.iter().any(|v| v.loose_eq(item))),
            Self::Map(map) => Some(item.as_str().is_some_and(|k| map.contains_key(k))),
            Self::Str(s) => item.as_str().map(|needle| s.contains(needle)),
            _ => None,
        }
    }

    /// Numeric reading used by float casts and clamps. Accepts numbers,
    /// booleans and numeric strings.
    pub fn to_f64(&self) -> Result<f64, CastError> {
        match self {
            Self::Bool(b) => Ok(f64::from(u8::from(*b))),
            Self::Int(_) | Self::Float(_) => self
                .as_f64()
                .ok_or_else(|| CastError::new(self.kind(), ValueKind::Float, "not numeric")),
            Self::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| CastError::new(ValueKind::Str, ValueKind::Float, e.to_string())),
            _ => Err(CastError::new(
                self.kind(),
                ValueKind::Float,
                "no numeric representation",
            )),
        }
    }

    /// Casts this value to another kind.
    #[allow(clippy::cast_possible_truncation)]
    pub fn cast(&self, kind: ValueKind) -> Result<Self, CastError> {
        let fail = |reason: &str| CastError::new(self.kind(), kind, reason);

        match kind {
            ValueKind::None => Ok(Self::None),
            ValueKind::Bool => Ok(Self::Bool(self.is_truthy())),
            ValueKind::Str => Ok(Self::Str(self.to_string())),
            ValueKind::Int => match self {
                Self::Int(i) => Ok(Self::Int(*i)),
                Self::Bool(b) => Ok(Self::Int(i64::from(*b))),
                Self::Float(x) if !x.is_finite() => Err(fail("float is not finite")),
                Self::Float(x) if !in_i64_range(x.trunc()) => {
                    Err(fail("float out of integer range"))
                }
                Self::Float(x) => Ok(Self::Int(x.trunc() as i64)),
                Self::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Self::Int)
                    .map_err(|e| fail(&e.to_string())),
                _ => Err(fail("no integer representation")),
            },
            ValueKind::Float => self.to_f64().map(Self::Float).map_err(|e| fail(&e.reason)),
            ValueKind::List | ValueKind::Tuple => {
                let items = match self {
                    Self::List(items) | Self::Tuple(items) => items.clone(),
                    Self::Str(s) => s.chars().map(|c| Self::Str(c.to_string())).collect(),
                    Self::Map(map) => map.keys().cloned().map(Self::Str).collect(),
                    _ => return Err(fail("value is not iterable")),
                };
                Ok(if kind == ValueKind::List {
                    Self::List(items)
                } else {
                    Self::Tuple(items)
                })
            }
            ValueKind::Map => match self {
                Self::Map(map) => Ok(Self::Map(map.clone())),
                Self::List(items) | Self::Tuple(items) => items
                    .iter()
                    .map(|pair| match pair.as_items() {
                        Some([Self::Str(k), v]) => Ok((k.clone(), v.clone())),
                        _ => Err(fail("expected a sequence of (str, value) pairs")),
                    })
                    .collect::<Result<IndexMap<_, _>, _>>()
                    .map(Self::Map),
                _ => Err(fail("value is not a mapping")),
            },
        }
    }

    /// Renders the value the way it appears inside a container: strings
    /// quoted, everything else as its display form.
    #[must_use]
    pub fn repr(&self) -> String {
        Repr(self).to_string()
    }

    fn write_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                f.write_str(")")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: ")?;
                    v.write_repr(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// 2^63, the first float above every `i64`.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// True when the integral float `t` converts to `i64` without saturating.
fn in_i64_range(t: f64) -> bool {
    (-I64_UPPER..I64_UPPER).contains(&t)
}

/// Exact ordering of an integer against a float. `None` for NaN.
#[allow(clippy::cast_possible_truncation)]
fn cmp_int_float(i: i64, x: f64) -> Option<Ordering> {
    if x.is_nan() {
        return None;
    }
    let whole = x.trunc();
    if !in_i64_range(whole) {
        return Some(if whole > 0.0 { Ordering::Less } else { Ordering::Greater });
    }
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(x - whole)),
        ord => Some(ord),
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.write_repr(f)?;
    }
    Ok(())
}

struct Repr<'a>(&'a Value);

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_repr(f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => other.write_repr(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}
