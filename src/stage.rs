use std::sync::Arc;

use regex::Regex;

use crate::evaluator::EvalError;
use crate::operators::OperatorSymbol;
use crate::params::Parameters;
use crate::value::{ExpressionFunction, Value};

/// Runtime implementation of a stage: `(left, right, parameters) -> value`.
pub(crate) type StageOperator =
    Arc<dyn Fn(&Value, &Value, &dyn Parameters) -> Result<Value, EvalError> + Send + Sync>;

pub(crate) type TypeCheck = fn(&Value) -> bool;
pub(crate) type CombinedTypeCheck = fn(&Value, &Value) -> bool;

pub(crate) const LOGICAL_ERROR_FORMAT: &str =
    "Value '{value}' cannot be used with the logical operator '{symbol}', it is not a bool";
pub(crate) const MODIFIER_ERROR_FORMAT: &str =
    "Value '{value}' cannot be used with the modifier '{symbol}', it is not a number";
pub(crate) const COMPARATOR_ERROR_FORMAT: &str =
    "Value '{value}' cannot be used with the comparator '{symbol}', it is not a number";
pub(crate) const TERNARY_ERROR_FORMAT: &str =
    "Value '{value}' cannot be used with the ternary operator '{symbol}', it is not a bool";
pub(crate) const PREFIX_ERROR_FORMAT: &str =
    "Value '{value}' cannot be used with the prefix '{symbol}'";

/// One node of the planned evaluation tree.
///
/// Children are owned exclusively by their parent; the tree is built once at
/// compile time and immutable afterwards.
pub(crate) struct EvaluationStage {
    pub symbol: OperatorSymbol,
    pub left: Option<Box<EvaluationStage>>,
    pub right: Option<Box<EvaluationStage>>,
    pub operator: StageOperator,
    pub left_type_check: Option<TypeCheck>,
    pub right_type_check: Option<TypeCheck>,
    pub combined_type_check: Option<CombinedTypeCheck>,
    pub type_error_format: &'static str,
}

impl EvaluationStage {
    /// A stage for a binary or prefix operator: implementation and type
    /// checks both come from the symbol.
    pub fn operation(
        symbol: OperatorSymbol,
        left: Option<Box<EvaluationStage>>,
        right: Option<Box<EvaluationStage>>,
        type_error_format: &'static str,
    ) -> Box<EvaluationStage> {
        let checks = find_type_checks(symbol);

        Box::new(EvaluationStage {
            symbol,
            left,
            right,
            operator: operator_for(symbol),
            left_type_check: checks.left,
            right_type_check: checks.right,
            combined_type_check: checks.combined,
            type_error_format,
        })
    }

    /// A structural stage (literal, parameter, clause, function, accessor)
    /// carrying its own operator and no type checks.
    pub fn bare(
        symbol: OperatorSymbol,
        right: Option<Box<EvaluationStage>>,
        operator: StageOperator,
    ) -> Box<EvaluationStage> {
        Box::new(EvaluationStage {
            symbol,
            left: None,
            right,
            operator,
            left_type_check: None,
            right_type_check: None,
            combined_type_check: None,
            type_error_format: "",
        })
    }

    pub fn literal(value: Value) -> Box<EvaluationStage> {
        EvaluationStage::bare(OperatorSymbol::Literal, None, make_literal_stage(value))
    }

    pub fn is_short_circuitable(&self) -> bool {
        matches!(
            self.symbol,
            OperatorSymbol::And
                | OperatorSymbol::Or
                | OperatorSymbol::TernaryTrue
                | OperatorSymbol::TernaryFalse
                | OperatorSymbol::Coalesce
        )
    }
}

/// The triplet of type checks attached to a symbol. Any member may be
/// absent, meaning type does not matter for that slot.
pub(crate) struct TypeChecks {
    pub left: Option<TypeCheck>,
    pub right: Option<TypeCheck>,
    pub combined: Option<CombinedTypeCheck>,
}

const NO_CHECKS: TypeChecks = TypeChecks {
    left: None,
    right: None,
    combined: None,
};

pub(crate) fn find_type_checks(symbol: OperatorSymbol) -> TypeChecks {
    match symbol {
        OperatorSymbol::Gt | OperatorSymbol::Lt | OperatorSymbol::Gte | OperatorSymbol::Lte => {
            TypeChecks {
                combined: Some(comparator_type_check),
                ..NO_CHECKS
            }
        }
        OperatorSymbol::Req | OperatorSymbol::Nreq => TypeChecks {
            left: Some(Value::is_string),
            right: Some(is_regex_or_string),
            combined: None,
        },
        OperatorSymbol::And | OperatorSymbol::Or => TypeChecks {
            left: Some(Value::is_boolean),
            right: Some(Value::is_boolean),
            combined: None,
        },
        OperatorSymbol::In => TypeChecks {
            right: Some(Value::is_array),
            ..NO_CHECKS
        },
        OperatorSymbol::BitwiseLshift
        | OperatorSymbol::BitwiseRshift
        | OperatorSymbol::BitwiseOr
        | OperatorSymbol::BitwiseAnd
        | OperatorSymbol::BitwiseXor => TypeChecks {
            left: Some(Value::is_number),
            right: Some(Value::is_number),
            combined: None,
        },
        OperatorSymbol::Plus => TypeChecks {
            combined: Some(addition_type_check),
            ..NO_CHECKS
        },
        OperatorSymbol::Minus
        | OperatorSymbol::Multiply
        | OperatorSymbol::Divide
        | OperatorSymbol::Modulus
        | OperatorSymbol::Exponent => TypeChecks {
            left: Some(Value::is_number),
            right: Some(Value::is_number),
            combined: None,
        },
        OperatorSymbol::Negate => TypeChecks {
            right: Some(Value::is_number),
            ..NO_CHECKS
        },
        OperatorSymbol::Invert => TypeChecks {
            right: Some(Value::is_boolean),
            ..NO_CHECKS
        },
        OperatorSymbol::BitwiseNot => TypeChecks {
            right: Some(Value::is_number),
            ..NO_CHECKS
        },
        OperatorSymbol::TernaryTrue => TypeChecks {
            left: Some(Value::is_boolean),
            ..NO_CHECKS
        },
        // equality and the else/coalesce branches are unchecked
        _ => NO_CHECKS,
    }
}

/// The runtime implementation for each operator symbol. Structural stages
/// receive their operators from dedicated constructors at plan sites.
pub(crate) fn operator_for(symbol: OperatorSymbol) -> StageOperator {
    match symbol {
        OperatorSymbol::Eq => Arc::new(equal_stage),
        OperatorSymbol::Neq => Arc::new(not_equal_stage),
        OperatorSymbol::Gt => Arc::new(gt_stage),
        OperatorSymbol::Lt => Arc::new(lt_stage),
        OperatorSymbol::Gte => Arc::new(gte_stage),
        OperatorSymbol::Lte => Arc::new(lte_stage),
        OperatorSymbol::Req => Arc::new(regex_stage),
        OperatorSymbol::Nreq => Arc::new(not_regex_stage),
        OperatorSymbol::In => Arc::new(in_stage),
        OperatorSymbol::And => Arc::new(and_stage),
        OperatorSymbol::Or => Arc::new(or_stage),
        OperatorSymbol::Plus => Arc::new(add_stage),
        OperatorSymbol::Minus => Arc::new(subtract_stage),
        OperatorSymbol::Multiply => Arc::new(multiply_stage),
        OperatorSymbol::Divide => Arc::new(divide_stage),
        OperatorSymbol::Modulus => Arc::new(modulus_stage),
        OperatorSymbol::Exponent => Arc::new(exponent_stage),
        OperatorSymbol::BitwiseAnd => Arc::new(bitwise_and_stage),
        OperatorSymbol::BitwiseOr => Arc::new(bitwise_or_stage),
        OperatorSymbol::BitwiseXor => Arc::new(bitwise_xor_stage),
        OperatorSymbol::BitwiseLshift => Arc::new(left_shift_stage),
        OperatorSymbol::BitwiseRshift => Arc::new(right_shift_stage),
        OperatorSymbol::Negate => Arc::new(negate_stage),
        OperatorSymbol::Invert => Arc::new(invert_stage),
        OperatorSymbol::BitwiseNot => Arc::new(bitwise_not_stage),
        OperatorSymbol::TernaryTrue => Arc::new(ternary_if_stage),
        OperatorSymbol::TernaryFalse | OperatorSymbol::Coalesce => Arc::new(ternary_else_stage),
        OperatorSymbol::Separate => Arc::new(separator_stage),
        OperatorSymbol::Value
        | OperatorSymbol::Literal
        | OperatorSymbol::Noop
        | OperatorSymbol::Functional
        | OperatorSymbol::Access => Arc::new(noop_stage_right),
    }
}

// ----------------------------------------------------------------------------
// type-check predicates
// ----------------------------------------------------------------------------

fn is_regex_or_string(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Pattern(_))
}

/// Ordering comparators work on two numbers or two strings, never a mix.
fn comparator_type_check(left: &Value, right: &Value) -> bool {
    (left.is_number() && right.is_number()) || (left.is_string() && right.is_string())
}

/// `+` adds two numbers or concatenates two strings.
fn addition_type_check(left: &Value, right: &Value) -> bool {
    (left.is_number() && right.is_number()) || (left.is_string() && right.is_string())
}

// ----------------------------------------------------------------------------
// operator implementations
//
// Operators re-verify their operands so that disabling the compile-attached
// type checks degrades to an error from inside the operator, not a panic.
// ----------------------------------------------------------------------------

fn numeric_operands(left: &Value, right: &Value, verb: &str) -> Result<(f64, f64), EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(EvalError::TypeError(format!(
            "Cannot {} {} and {}",
            verb,
            left.kind_name(),
            right.kind_name()
        ))),
    }
}

fn boolean_operands(left: &Value, right: &Value, verb: &str) -> Result<(bool, bool), EvalError> {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok((*a, *b)),
        _ => Err(EvalError::TypeError(format!(
            "Cannot {} {} and {}",
            verb,
            left.kind_name(),
            right.kind_name()
        ))),
    }
}

fn add_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        _ => {
            let (a, b) = numeric_operands(left, right, "add")?;
            Ok(Value::Number(a + b))
        }
    }
}

fn subtract_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "subtract")?;
    Ok(Value::Number(a - b))
}

fn multiply_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "multiply")?;
    Ok(Value::Number(a * b))
}

// division and modulus follow IEEE-754: infinities and NaN, never a panic
fn divide_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "divide")?;
    Ok(Value::Number(a / b))
}

fn modulus_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "take modulus of")?;
    Ok(Value::Number(a % b))
}

fn exponent_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "exponentiate")?;
    Ok(Value::Number(a.powf(b)))
}

fn equal_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    Ok(Value::Boolean(left == right))
}

fn not_equal_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    Ok(Value::Boolean(left != right))
}

fn gt_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(Value::Boolean(a > b));
    }
    let (a, b) = numeric_operands(left, right, "compare")?;
    Ok(Value::Boolean(a > b))
}

fn lt_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(Value::Boolean(a < b));
    }
    let (a, b) = numeric_operands(left, right, "compare")?;
    Ok(Value::Boolean(a < b))
}

fn gte_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(Value::Boolean(a >= b));
    }
    let (a, b) = numeric_operands(left, right, "compare")?;
    Ok(Value::Boolean(a >= b))
}

fn lte_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(Value::Boolean(a <= b));
    }
    let (a, b) = numeric_operands(left, right, "compare")?;
    Ok(Value::Boolean(a <= b))
}

fn and_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = boolean_operands(left, right, "logically conjoin")?;
    Ok(Value::Boolean(a && b))
}

fn or_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = boolean_operands(left, right, "logically disjoin")?;
    Ok(Value::Boolean(a || b))
}

fn pattern_operand(right: &Value) -> Result<Regex, EvalError> {
    match right {
        Value::Pattern(pattern) => Ok(pattern.clone()),
        Value::String(source) => Regex::new(source).map_err(|err| {
            EvalError::TypeError(format!(
                "Unable to compile regexp pattern '{}': {}",
                source, err
            ))
        }),
        other => Err(EvalError::TypeError(format!(
            "Cannot match against {}",
            other.kind_name()
        ))),
    }
}

fn regex_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    match left {
        Value::String(subject) => Ok(Value::Boolean(pattern_operand(right)?.is_match(subject))),
        other => Err(EvalError::TypeError(format!(
            "Cannot regex-match {}",
            other.kind_name()
        ))),
    }
}

fn not_regex_stage(left: &Value, right: &Value, parameters: &dyn Parameters) -> Result<Value, EvalError> {
    match regex_stage(left, right, parameters)? {
        Value::Boolean(matched) => Ok(Value::Boolean(!matched)),
        other => Ok(other),
    }
}

fn in_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    match right {
        Value::Array(items) => Ok(Value::Boolean(items.contains(left))),
        other => Err(EvalError::TypeError(format!(
            "Cannot search {} for membership",
            other.kind_name()
        ))),
    }
}

// bitwise operators truncate doubles: signed 64-bit for and/or/xor/not,
// unsigned 64-bit for shifts
fn bitwise_and_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "bitwise-and")?;
    Ok(Value::Number(((a as i64) & (b as i64)) as f64))
}

fn bitwise_or_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "bitwise-or")?;
    Ok(Value::Number(((a as i64) | (b as i64)) as f64))
}

fn bitwise_xor_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "bitwise-xor")?;
    Ok(Value::Number(((a as i64) ^ (b as i64)) as f64))
}

fn left_shift_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "shift")?;
    let shift = b as u64;
    let result = if shift >= 64 { 0 } else { (a as u64) << shift };
    Ok(Value::Number(result as f64))
}

fn right_shift_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    let (a, b) = numeric_operands(left, right, "shift")?;
    let shift = b as u64;
    let result = if shift >= 64 { 0 } else { (a as u64) >> shift };
    Ok(Value::Number(result as f64))
}

fn negate_stage(_: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    match right {
        Value::Number(n) => Ok(Value::Number(-n)),
        other => Err(EvalError::TypeError(format!(
            "Cannot negate {}",
            other.kind_name()
        ))),
    }
}

fn invert_stage(_: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    match right {
        Value::Boolean(b) => Ok(Value::Boolean(!b)),
        other => Err(EvalError::TypeError(format!(
            "Cannot invert {}",
            other.kind_name()
        ))),
    }
}

fn bitwise_not_stage(_: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    match right {
        Value::Number(n) => Ok(Value::Number(!(*n as i64) as f64)),
        other => Err(EvalError::TypeError(format!(
            "Cannot bitwise-complement {}",
            other.kind_name()
        ))),
    }
}

// The `?` operator: a true condition selects the right-hand value, a false
// one yields null for the enclosing `:` to fill in.
fn ternary_if_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    if *left == Value::Boolean(true) {
        return Ok(right.clone());
    }
    Ok(Value::Null)
}

// Shared by `:` and `??`: a non-null left passes through, otherwise the
// right-hand value is the answer.
fn ternary_else_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    if !left.is_null() {
        return Ok(left.clone());
    }
    Ok(right.clone())
}

fn separator_stage(left: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    match left {
        Value::Array(items) => {
            let mut list = items.clone();
            list.push(right.clone());
            Ok(Value::Array(list))
        }
        single => Ok(Value::Array(vec![single.clone(), right.clone()])),
    }
}

fn noop_stage_right(_: &Value, right: &Value, _: &dyn Parameters) -> Result<Value, EvalError> {
    Ok(right.clone())
}

// ----------------------------------------------------------------------------
// stage constructors needing captured data
// ----------------------------------------------------------------------------

pub(crate) fn make_literal_stage(value: Value) -> StageOperator {
    Arc::new(move |_, _, _| Ok(value.clone()))
}

pub(crate) fn make_parameter_stage(name: String) -> StageOperator {
    Arc::new(move |_, _, parameters| parameters.get(&name))
}

pub(crate) fn make_function_stage(function: ExpressionFunction) -> StageOperator {
    Arc::new(move |_, right, _| match right {
        Value::Null => function(&[]),
        Value::Array(args) => function(args),
        single => function(std::slice::from_ref(single)),
    })
}

/// Walks an accessor path: the first segment names a parameter, subsequent
/// segments resolve object fields. A segment resolving to a callable is
/// invoked, with the argument subtree's values when it is the terminal
/// segment.
pub(crate) fn make_accessor_stage(path: Vec<String>) -> StageOperator {
    Arc::new(move |_, right, parameters| {
        let mut current = parameters.get(&path[0])?;

        for (index, field) in path.iter().enumerate().skip(1) {
            let terminal = index == path.len() - 1;

            current = match current {
                Value::Object(ref members) => match members.get(field) {
                    Some(member) => member.clone(),
                    None => {
                        return Err(EvalError::AccessError(format!(
                            "Unable to access field or method '{}' in '{}'",
                            field,
                            path.join(".")
                        )))
                    }
                },
                ref other => {
                    return Err(EvalError::AccessError(format!(
                        "Unable to access field '{}' on {} value in '{}'",
                        field,
                        other.kind_name(),
                        path.join(".")
                    )))
                }
            };

            if let Value::Function(ref method) = current {
                let result = if terminal {
                    match right {
                        Value::Null => method(&[])?,
                        Value::Array(args) => method(args)?,
                        single => method(std::slice::from_ref(single))?,
                    }
                } else {
                    method(&[])?
                };
                current = result;
            }
        }

        Ok(current)
    })
}
