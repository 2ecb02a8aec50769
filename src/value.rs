//! Dynamic value model for tracked data objects.
//!
//! Properties of a data object hold [`Value`]s: primitives plus shared
//! objects. Two things matter about this type and both are observable
//! behavior of the whole engine:
//!
//! - **Sameness** ([`Value::same`]) decides whether a write is a no-op and
//!   whether a binding fires. Primitives compare by value, objects compare
//!   by pointer identity, and floats use IEEE equality (NaN is never the
//!   same as anything, itself included).
//! - **Rendering** (`Display`) decides what the view shows when a value is
//!   substituted into text or an input element.

use std::fmt;
use std::sync::Arc;

use crate::observe::Object;

/// A dynamic value stored in a data object property.
#[derive(Clone, Debug)]
pub enum Value {
    /// The absent-but-assigned value. Renders as `null`.
    Null,
    /// Boolean. Renders as `true` / `false`.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// IEEE double. Never `same` as an `Int` of equal magnitude.
    Float(f64),
    /// UTF-8 string. Renders verbatim, without quotes.
    Str(String),
    /// A shared (possibly tracked) object. Compared by identity.
    Object(Arc<Object>),
}

impl Value {
    /// Sameness check used by the write-skip and binding-update rules.
    ///
    /// Cross-variant comparisons are never same: `Int(1)` and `Float(1.0)`
    /// are different values here.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// [`Value::same`] lifted over optional values; two absences are same.
    pub(crate) fn option_same(a: Option<&Value>, b: Option<&Value>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        }
    }

    /// The object behind this value, if it is one.
    pub fn as_object(&self) -> Option<&Arc<Object>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Textual form substituted into view text and input elements.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Object(_) => f.write_str("[object]"),
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

impl From<Arc<Object>> for Value {
    fn from(v: Arc<Object>) -> Self {
        Value::Object(v)
    }
}
