use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::evaluator::EvalError;

/// The shape of a user-supplied expression function.
///
/// Functions receive the evaluated argument list in source order and return
/// either a value or an evaluation error. The same shape is invoked when an
/// accessor path resolves to a callable member.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use nutmeg::{EvalError, ExpressionFunction, Value};
///
/// let sum: ExpressionFunction = Arc::new(|args| {
///     let mut total = 0.0;
///     for arg in args {
///         match arg {
///             Value::Number(n) => total += n,
///             other => {
///                 return Err(EvalError::InvalidArgument(format!(
///                     "sum expects numbers, got '{}'",
///                     other
///                 )))
///             }
///         }
///     }
///     Ok(Value::Number(total))
/// });
/// ```
pub type ExpressionFunction = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A runtime value flowing through the evaluator.
///
/// Every number is an IEEE-754 double; integer-typed inputs are widened on
/// the way in (see the `From` conversions below). Patterns are compiled
/// regular expressions, either precompiled at optimization time or built on
/// the fly by the regex comparators.
#[derive(Clone)]
pub enum Value {
    /// The absent value, produced by failed-silent lookups and consumed by
    /// the `??` coalescing rules
    Null,

    /// IEEE-754 double
    Number(f64),

    /// Boolean (true/false)
    Boolean(bool),

    /// UTF-8 string
    String(String),

    /// Compiled regular expression
    Pattern(Regex),

    /// Ordered sequence of values, as produced by the `,` separator
    Array(Vec<Value>),

    /// String-keyed mapping, the target of accessor paths
    Object(HashMap<String, Value>),

    /// Callable member, invoked by accessor paths that resolve to it
    Function(ExpressionFunction),
}

impl Value {
    /// Human-readable name of the value's type, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Pattern(_) => "pattern",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a.as_str() == b.as_str(),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            // Callables have no structural identity
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Pattern(p) => write!(f, "Pattern({:?})", p.as_str()),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Function(_) => write!(f, "Function(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Pattern(p) => write!(f, "{}", p.as_str()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(_) | Value::Function(_) => write!(f, "{}", self.kind_name()),
        }
    }
}

// Integer-typed inputs are widened to doubles here, at the boundary, so the
// evaluator only ever sees one numeric representation.

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Object(map)
    }
}
