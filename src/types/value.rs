//! The dynamic value model.
//!
//! Target objects have unknown-at-compile-time shape, so raw reads surface as
//! [`Value`]. This is the single place dynamic typing is tolerated; everything
//! downstream of [`FromValue`] is strictly typed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dynamically-typed value read from a target member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent or cleared content.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer, widened to 64 bits.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Text.
    Str(String),
    /// Ordered sequence of values.
    Seq(Vec<Value>),
}

impl Value {
    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
        }
    }

    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Element count for sequences, character count for strings.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Seq(items) => Some(items.len()),
            Value::Str(s) => Some(s.chars().count()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Interop for hosts that surface component state as JSON.
///
/// Objects flatten to a sequence of their values in key order; the engine has
/// no map type because target members are addressed by name one at a time.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Seq(map.into_values().map(Value::from).collect())
            }
        }
    }
}

/// Conversion from the dynamic model into a requested semantic type.
///
/// A `None` from [`from_value`](FromValue::from_value) is a fatal shape
/// mismatch at the accessor layer — there is no lossy coercion. Integers do
/// widen into `f64`, mirroring how targets store whole numbers in
/// floating-point members.
pub trait FromValue: Sized {
    /// Human-readable description of the expected shape, for diagnostics.
    fn expected() -> String;

    /// Attempt the conversion.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn expected() -> String {
        "any value".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn expected() -> String {
        "a boolean".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn expected() -> String {
        "an integer".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    fn expected() -> String {
        "a 32-bit integer".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl FromValue for u32 {
    fn expected() -> String {
        "a non-negative 32-bit integer".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => u32::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl FromValue for usize {
    fn expected() -> String {
        "a non-negative integer".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => usize::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn expected() -> String {
        "a number".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    fn expected() -> String {
        "a string".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn expected() -> String {
        format!("a sequence of {}", T::expected())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Seq(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> String {
        format!("{} or null", T::expected())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
