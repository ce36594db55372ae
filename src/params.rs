use std::collections::HashMap;

use crate::evaluator::EvalError;
use crate::value::Value;

/// A named-parameter source consulted during evaluation.
///
/// The single capability: fetch a value by name, or report that the name is
/// unavailable. The engine never mutates a parameter source.
///
/// # Examples
///
/// ```
/// use nutmeg::{EvalError, Parameters, Value};
///
/// struct Doubler;
///
/// impl Parameters for Doubler {
///     fn get(&self, name: &str) -> Result<Value, EvalError> {
///         match name {
///             "two" => Ok(Value::Number(2.0)),
///             _ => Err(EvalError::UnknownParameter(name.to_string())),
///         }
///     }
/// }
///
/// let expression = nutmeg::Expression::compile("two * 21").unwrap();
/// assert_eq!(expression.evaluate_with(&Doubler).unwrap(), Value::Number(42.0));
/// ```
pub trait Parameters {
    /// Gets the parameter of the given name. Failure to find it must be
    /// indicated by returning an error.
    fn get(&self, name: &str) -> Result<Value, EvalError>;
}

impl Parameters for HashMap<String, Value> {
    fn get(&self, name: &str) -> Result<Value, EvalError> {
        match HashMap::get(self, name) {
            Some(value) => Ok(value.clone()),
            None => Err(EvalError::UnknownParameter(name.to_string())),
        }
    }
}

/// The environment used when no parameters are supplied; every lookup fails.
pub struct EmptyParameters;

impl Parameters for EmptyParameters {
    fn get(&self, name: &str) -> Result<Value, EvalError> {
        Err(EvalError::UnknownParameter(name.to_string()))
    }
}
