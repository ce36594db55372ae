//! Plans a token list into a stage tree.
//!
//! Each precedence level is one function; lower precedence calls into higher
//! precedence for its operands, and same-level operators are consumed
//! right-recursively. The re-order pass afterwards restores source order for
//! left-associative chains.

use std::fmt;

use crate::operators::{self, OperatorSymbol};
use crate::stage::{
    self, make_accessor_stage, make_function_stage, make_parameter_stage, operator_for,
    EvaluationStage,
};
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind, TokenValue};
use crate::transform;
use crate::value::Value;

/// Errors raised while planning a validated token list.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// A token that no precedence level knows how to turn into a stage
    UnplannedToken { kind: TokenKind, value: String },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::UnplannedToken { kind, value } => {
                write!(f, "Unable to plan token kind: '{}', value: '{}'", kind, value)
            }
        }
    }
}

impl std::error::Error for PlanError {}

type PlanResult = Result<Option<Box<EvaluationStage>>, PlanError>;
type Precedent = fn(&mut TokenStream) -> PlanResult;

/// Turns tokens into an execution tree, then re-orders same-precedence
/// operators and folds constant subtrees.
pub(crate) fn plan_stages(tokens: Vec<Token>) -> Result<Option<Box<EvaluationStage>>, PlanError> {
    let mut stream = TokenStream::new(tokens);

    let stage = match plan_tokens(&mut stream)? {
        Some(stage) => stage,
        None => return Ok(None),
    };

    let stage = transform::reorder_stages(stage);
    let stage = transform::fold_constants(stage);
    Ok(Some(stage))
}

fn plan_tokens(stream: &mut TokenStream) -> PlanResult {
    if !stream.has_next() {
        return Ok(None);
    }

    plan_separator(stream)
}

fn plan_separator(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::separator_symbol,
        &[TokenKind::Separator],
        "",
        plan_separator,
        Some(plan_ternary),
    )
}

fn plan_ternary(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::ternary_symbol,
        &[TokenKind::Ternary],
        stage::TERNARY_ERROR_FORMAT,
        plan_ternary,
        Some(plan_logical_or),
    )
}

fn plan_logical_or(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::logical_or_symbol,
        &[TokenKind::LogicalOp],
        stage::LOGICAL_ERROR_FORMAT,
        plan_logical_or,
        Some(plan_logical_and),
    )
}

fn plan_logical_and(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::logical_and_symbol,
        &[TokenKind::LogicalOp],
        stage::LOGICAL_ERROR_FORMAT,
        plan_logical_and,
        Some(plan_comparator),
    )
}

fn plan_comparator(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::comparator_symbol,
        &[TokenKind::Comparator],
        stage::COMPARATOR_ERROR_FORMAT,
        plan_comparator,
        Some(plan_bitwise),
    )
}

fn plan_bitwise(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::bitwise_symbol,
        &[TokenKind::Modifier],
        stage::MODIFIER_ERROR_FORMAT,
        plan_bitwise,
        Some(plan_shift),
    )
}

fn plan_shift(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::bitwise_shift_symbol,
        &[TokenKind::Modifier],
        stage::MODIFIER_ERROR_FORMAT,
        plan_shift,
        Some(plan_additive),
    )
}

fn plan_additive(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::additive_symbol,
        &[TokenKind::Modifier],
        stage::MODIFIER_ERROR_FORMAT,
        plan_additive,
        Some(plan_multiplicative),
    )
}

fn plan_multiplicative(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::multiplicative_symbol,
        &[TokenKind::Modifier],
        stage::MODIFIER_ERROR_FORMAT,
        plan_multiplicative,
        Some(plan_exponential),
    )
}

fn plan_exponential(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::exponential_symbol,
        &[TokenKind::Modifier],
        stage::MODIFIER_ERROR_FORMAT,
        plan_exponential,
        Some(plan_function),
    )
}

fn plan_prefix(stream: &mut TokenStream) -> PlanResult {
    plan_precedence_level(
        stream,
        operators::prefix_symbol,
        &[TokenKind::Prefix],
        stage::PREFIX_ERROR_FORMAT,
        plan_function,
        None,
    )
}

/// The usual shape of a precedence level: parse a left operand from the next
/// level up, consume one operator token if it belongs to this level, then
/// parse the right operand recursively at this level.
fn plan_precedence_level(
    stream: &mut TokenStream,
    symbols: fn(&str) -> Option<OperatorSymbol>,
    valid_kinds: &[TokenKind],
    type_error_format: &'static str,
    right_precedent: Precedent,
    left_precedent: Option<Precedent>,
) -> PlanResult {
    let left_stage = match left_precedent {
        Some(precedent) => precedent(stream)?,
        None => None,
    };

    while stream.has_next() {
        let token = stream.next();

        if !valid_kinds.is_empty() && !valid_kinds.contains(&token.kind) {
            break;
        }

        let symbol = match token.value.as_ref().and_then(|value| value.as_symbol()) {
            Some(lexeme) => match symbols(lexeme) {
                Some(symbol) => symbol,
                None => break,
            },
            None => break,
        };

        let right_stage = right_precedent(stream)?;

        return Ok(Some(EvaluationStage::operation(
            symbol,
            left_stage,
            right_stage,
            type_error_format,
        )));
    }

    stream.rewind();
    Ok(left_stage)
}

/// Functions bind tighter than any operator and wrap their operand in a
/// callable stage.
fn plan_function(stream: &mut TokenStream) -> PlanResult {
    if !stream.has_next() {
        return Ok(None);
    }

    let token = stream.next();

    if token.kind != TokenKind::Function {
        stream.rewind();
        return plan_accessor(stream);
    }

    let function = match token.value {
        Some(TokenValue::Function(function)) => function,
        other => {
            return Err(PlanError::UnplannedToken {
                kind: token.kind,
                value: display_value(&other),
            })
        }
    };

    let right_stage = plan_accessor(stream)?;

    Ok(Some(EvaluationStage::bare(
        OperatorSymbol::Functional,
        right_stage,
        make_function_stage(function),
    )))
}

/// Accessors plan to a path walk; a clause immediately after the path makes
/// the terminal segment a call, and the whole sub-expression that follows
/// becomes its argument list.
fn plan_accessor(stream: &mut TokenStream) -> PlanResult {
    if !stream.has_next() {
        return Ok(None);
    }

    let token = stream.next();

    if token.kind != TokenKind::Accessor {
        stream.rewind();
        return plan_value(stream);
    }

    let path = match token.value {
        Some(TokenValue::Path(path)) => path,
        other => {
            return Err(PlanError::UnplannedToken {
                kind: token.kind,
                value: display_value(&other),
            })
        }
    };

    let mut right_stage = None;
    if stream.has_next() {
        let next_token = stream.next();
        stream.rewind();

        if next_token.kind == TokenKind::Clause {
            right_stage = plan_tokens(stream)?;
        }
    }

    Ok(Some(EvaluationStage::bare(
        OperatorSymbol::Access,
        right_stage,
        make_accessor_stage(path),
    )))
}

/// The terminal level: literals, parameters, parenthesised sub-expressions,
/// and delegation back to prefixes.
fn plan_value(stream: &mut TokenStream) -> PlanResult {
    if !stream.has_next() {
        return Ok(None);
    }

    let token = stream.next();

    match (token.kind, token.value) {
        (TokenKind::Clause, _) => {
            let inner = plan_tokens(stream)?;

            // consume the matching clause-close
            if stream.has_next() {
                stream.next();
            }

            Ok(Some(EvaluationStage::bare(
                OperatorSymbol::Noop,
                inner,
                operator_for(OperatorSymbol::Noop),
            )))
        }

        // lets the enclosing level terminate cleanly
        (TokenKind::ClauseClose, _) => {
            stream.rewind();
            Ok(None)
        }

        (TokenKind::Variable, Some(TokenValue::Text(name))) => Ok(Some(EvaluationStage::bare(
            OperatorSymbol::Value,
            None,
            make_parameter_stage(name),
        ))),

        (TokenKind::Numeric, Some(TokenValue::Number(number))) => {
            Ok(Some(EvaluationStage::literal(Value::Number(number))))
        }
        (TokenKind::StringLiteral, Some(TokenValue::Text(text))) => {
            Ok(Some(EvaluationStage::literal(Value::String(text))))
        }
        (TokenKind::Pattern, Some(TokenValue::Pattern(pattern))) => {
            Ok(Some(EvaluationStage::literal(Value::Pattern(pattern))))
        }
        (TokenKind::Boolean, Some(TokenValue::Boolean(boolean))) => {
            Ok(Some(EvaluationStage::literal(Value::Boolean(boolean))))
        }
        (TokenKind::Time, Some(TokenValue::Time(time))) => Ok(Some(EvaluationStage::literal(
            Value::Number(time.timestamp() as f64),
        ))),

        (TokenKind::Prefix, _) => {
            stream.rewind();
            plan_prefix(stream)
        }

        (kind, value) => Err(PlanError::UnplannedToken {
            kind,
            value: display_value(&value),
        }),
    }
}

fn display_value(value: &Option<TokenValue>) -> String {
    value
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_default()
}
