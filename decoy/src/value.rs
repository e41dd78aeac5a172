//! Dynamic values passed to and returned from intercepted methods.
//!
//! Values render the way they are shown in failure messages: strings are
//! quoted, symbols carry a leading colon and lists are bracketed.

use std::fmt;

use ordered_float::OrderedFloat;

/// A dynamically typed argument or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// The absent value.
    #[default]
    Nil,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A float, ordered so values stay hashable.
    Float(OrderedFloat<f64>),
    /// A string.
    Str(String),
    /// An interned-style name such as `:baz`.
    Symbol(String),
    /// An ordered list of values.
    List(Vec<Value>),
}

/// The kind of a [`Value`], used by `is_a` matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Symbol,
    List,
}

impl Value {
    /// Create a symbol value.
    pub fn sym(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// Get the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Symbol(_) => ValueKind::Symbol,
            Value::List(_) => ValueKind::List,
        }
    }

    /// Check if this value is an integer or a float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x.into_inner()),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::List(items) => write!(f, "[{}]", join_inspected(items)),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Nil => "Nil",
            ValueKind::Bool => "Bool",
            ValueKind::Int => "Int",
            ValueKind::Float => "Float",
            ValueKind::Str => "Str",
            ValueKind::Symbol => "Symbol",
            ValueKind::List => "List",
        };
        f.write_str(name)
    }
}

/// Render values separated by `", "`, as they appear inside a signature.
pub fn join_inspected<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(OrderedFloat(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Build a `Vec<Value>` from anything convertible into [`Value`].
///
/// ```
/// use decoy::{args, Value};
///
/// let call_args = args![1, "two", Value::sym("three")];
/// assert_eq!(call_args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::Value::from($arg)),+]
    };
}
