use std::fmt;

use crate::operators::OperatorSymbol;
use crate::params::Parameters;
use crate::stage::{EvaluationStage, TypeCheck};
use crate::value::Value;

/// Errors that can occur while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A variable or accessor head with no entry in the parameter source
    UnknownParameter(String),

    /// An operand of the wrong type for its operator
    TypeError(String),

    /// An accessor path that cannot be walked to the end
    AccessError(String),

    /// A function invoked with arguments it cannot accept
    InvalidArgument(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownParameter(name) => write!(f, "No parameter '{}' found", name),
            EvalError::TypeError(msg) => write!(f, "{}", msg),
            EvalError::AccessError(msg) => write!(f, "{}", msg),
            EvalError::InvalidArgument(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

/// Post-order evaluation of a stage tree.
///
/// The left child is evaluated first; short-circuitable symbols may then
/// answer immediately or mark the right child as skipped. The skip marker is
/// a local flag, never an in-band value: a skipped ternary branch hands its
/// operator a null it ignores by construction.
pub(crate) fn evaluate_stage(
    stage: &EvaluationStage,
    parameters: &dyn Parameters,
    checks_types: bool,
) -> Result<Value, EvalError> {
    let mut left = Value::Null;
    if let Some(ref left_stage) = stage.left {
        left = evaluate_stage(left_stage, parameters, checks_types)?;
    }

    let mut skip_right = false;
    if stage.is_short_circuitable() {
        match stage.symbol {
            OperatorSymbol::And => {
                if left == Value::Boolean(false) {
                    return Ok(Value::Boolean(false));
                }
            }
            OperatorSymbol::Or => {
                if left == Value::Boolean(true) {
                    return Ok(Value::Boolean(true));
                }
            }
            OperatorSymbol::Coalesce => {
                if !left.is_null() {
                    return Ok(left);
                }
            }
            OperatorSymbol::TernaryTrue => {
                if left == Value::Boolean(false) {
                    skip_right = true;
                }
            }
            OperatorSymbol::TernaryFalse => {
                if !left.is_null() {
                    skip_right = true;
                }
            }
            _ => {}
        }
    }

    let mut right = Value::Null;
    if !skip_right {
        if let Some(ref right_stage) = stage.right {
            right = evaluate_stage(right_stage, parameters, checks_types)?;
        }
    }

    if checks_types {
        match stage.combined_type_check {
            // the type check needs both sides to decide whether the
            // operator can handle them
            Some(check) => {
                if !check(&left, &right) {
                    return Err(EvalError::TypeError(format_type_error(
                        stage.type_error_format,
                        &left,
                        stage.symbol,
                    )));
                }
            }
            None => {
                type_check(stage.left_type_check, &left, stage.symbol, stage.type_error_format)?;
                type_check(
                    stage.right_type_check,
                    &right,
                    stage.symbol,
                    stage.type_error_format,
                )?;
            }
        }
    }

    (stage.operator)(&left, &right, parameters)
}

pub(crate) fn type_check(
    check: Option<TypeCheck>,
    value: &Value,
    symbol: OperatorSymbol,
    format: &str,
) -> Result<(), EvalError> {
    match check {
        None => Ok(()),
        Some(check) if check(value) => Ok(()),
        Some(_) => Err(EvalError::TypeError(format_type_error(
            format, value, symbol,
        ))),
    }
}

fn format_type_error(format: &str, value: &Value, symbol: OperatorSymbol) -> String {
    format
        .replace("{value}", &value.to_string())
        .replace("{symbol}", &symbol.to_string())
}
