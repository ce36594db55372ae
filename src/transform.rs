//! Compile-time transformations applied between parsing and evaluation:
//! precompiling regex comparands, re-ordering same-precedence stages into
//! source order, and folding constant subtrees.

use regex::Regex;

use crate::grammar::SyntaxError;
use crate::operators::{self, precedence_of, OperatorSymbol};
use crate::params::EmptyParameters;
use crate::stage::EvaluationStage;
use crate::evaluator;
use crate::token::{Token, TokenKind, TokenValue};

/// Replaces the string right-operand of a regex comparator with a
/// precompiled pattern token. Compilation failures surface as compile
/// errors rather than evaluation errors.
pub(crate) fn optimize_tokens(mut tokens: Vec<Token>) -> Result<Vec<Token>, SyntaxError> {
    for index in 0..tokens.len() {
        let token = &tokens[index];

        if token.kind != TokenKind::Comparator {
            continue;
        }

        let symbol = token
            .value
            .as_ref()
            .and_then(|value| value.as_symbol())
            .and_then(operators::comparator_symbol);
        if !matches!(symbol, Some(OperatorSymbol::Req) | Some(OperatorSymbol::Nreq)) {
            continue;
        }

        let source = match tokens.get(index + 1) {
            Some(Token {
                kind: TokenKind::StringLiteral,
                value: Some(TokenValue::Text(source)),
            }) => source.clone(),
            _ => continue,
        };

        let pattern =
            Regex::new(&source).map_err(|err| SyntaxError::InvalidPattern(err.to_string()))?;
        tokens[index + 1] = Token::new(TokenKind::Pattern, TokenValue::Pattern(pattern));
    }

    Ok(tokens)
}

/// Re-orders runs of same-precedence stages.
///
/// Each planner level is right-recursive, so `a - b - c` plans with the
/// rightmost operator at the root and would evaluate right-to-left. Walking
/// down the right spine, every run of two or more stages with one precedence
/// is rebuilt left-deep, so the leftmost source operator evaluates first.
/// Commutative operators are unaffected.
pub(crate) fn reorder_stages(stage: Box<EvaluationStage>) -> Box<EvaluationStage> {
    let precedence = precedence_of(stage.symbol);
    let mut run: Vec<Box<EvaluationStage>> = Vec::new();
    let mut tail: Option<Box<EvaluationStage>> = None;
    let mut next = Some(stage);

    while let Some(mut current) = next {
        if precedence_of(current.symbol) != precedence {
            // precedence break; the rest of the spine re-orders on its own
            tail = Some(reorder_stages(current));
            break;
        }

        if let Some(left) = current.left.take() {
            current.left = Some(reorder_stages(left));
        }

        next = current.right.take();
        run.push(current);
    }

    if run.len() < 2 {
        let mut only = run.pop().expect("a reorder run always holds its root");
        only.right = tail;
        return only;
    }

    mirror_stage_run(run, tail)
}

/// Rebuilds a right-leaning run left-deep. The run's detached left children
/// plus the spine tail are the operands in source order; operator N sits
/// between operands N and N+1, so the first operator becomes the innermost
/// stage and the last becomes the root.
fn mirror_stage_run(
    mut run: Vec<Box<EvaluationStage>>,
    tail: Option<Box<EvaluationStage>>,
) -> Box<EvaluationStage> {
    let mut operands: Vec<Option<Box<EvaluationStage>>> =
        run.iter_mut().map(|stage| stage.left.take()).collect();
    operands.push(tail);

    let mut operands = operands.into_iter();
    let mut rebuilt = operands.next().flatten();

    for mut stage in run {
        stage.left = rebuilt.take();
        stage.right = operands.next().flatten();
        rebuilt = Some(stage);
    }

    rebuilt.expect("a mirrored run holds at least two stages")
}

/// Post-order constant folding. A stage collapses to a literal when both
/// children are literals, its symbol is foldable, and its type checks and
/// operator all succeed; any error abandons the fold for that stage.
pub(crate) fn fold_constants(mut stage: Box<EvaluationStage>) -> Box<EvaluationStage> {
    if let Some(left) = stage.left.take() {
        stage.left = Some(fold_constants(left));
    }
    if let Some(right) = stage.right.take() {
        stage.right = Some(fold_constants(right));
    }

    fold_stage(stage)
}

fn fold_stage(stage: Box<EvaluationStage>) -> Box<EvaluationStage> {
    let both_literal = matches!(
        (&stage.left, &stage.right),
        (Some(left), Some(right))
            if left.symbol == OperatorSymbol::Literal && right.symbol == OperatorSymbol::Literal
    );
    if !both_literal {
        return stage;
    }

    // argument lists and membership keep their shape
    if matches!(stage.symbol, OperatorSymbol::Separate | OperatorSymbol::In) {
        return stage;
    }

    let empty = EmptyParameters;
    let null = crate::value::Value::Null;

    let left_value = match stage.left.as_ref() {
        Some(child) => match (child.operator)(&null, &null, &empty) {
            Ok(value) => value,
            Err(_) => return stage,
        },
        None => return stage,
    };
    let right_value = match stage.right.as_ref() {
        Some(child) => match (child.operator)(&null, &null, &empty) {
            Ok(value) => value,
            Err(_) => return stage,
        },
        None => return stage,
    };

    // typecheck, since the grammar checker is loose about which operator
    // symbols go together
    if evaluator::type_check(
        stage.left_type_check,
        &left_value,
        stage.symbol,
        stage.type_error_format,
    )
    .is_err()
    {
        return stage;
    }
    if evaluator::type_check(
        stage.right_type_check,
        &right_value,
        stage.symbol,
        stage.type_error_format,
    )
    .is_err()
    {
        return stage;
    }
    if let Some(check) = stage.combined_type_check {
        if !check(&left_value, &right_value) {
            return stage;
        }
    }

    match (stage.operator)(&left_value, &right_value, &empty) {
        Ok(result) => EvaluationStage::literal(result),
        Err(_) => stage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage;
    use crate::value::Value;

    fn literal(n: f64) -> Box<EvaluationStage> {
        EvaluationStage::literal(Value::Number(n))
    }

    fn evaluate(stage: &EvaluationStage) -> Value {
        evaluator::evaluate_stage(stage, &EmptyParameters, true).unwrap()
    }

    #[test]
    fn mirror_rebuilds_subtraction_chains_left_deep() {
        // 10 - 3 - 2, planned right-recursively
        let inner = EvaluationStage::operation(
            OperatorSymbol::Minus,
            Some(literal(3.0)),
            Some(literal(2.0)),
            stage::MODIFIER_ERROR_FORMAT,
        );
        let root = EvaluationStage::operation(
            OperatorSymbol::Minus,
            Some(literal(10.0)),
            Some(inner),
            stage::MODIFIER_ERROR_FORMAT,
        );

        let reordered = reorder_stages(root);
        assert_eq!(evaluate(&reordered), Value::Number(5.0));
    }

    #[test]
    fn folding_collapses_literal_pairs() {
        let root = EvaluationStage::operation(
            OperatorSymbol::Plus,
            Some(literal(2.0)),
            Some(literal(3.0)),
            stage::MODIFIER_ERROR_FORMAT,
        );

        let folded = fold_constants(root);
        assert_eq!(folded.symbol, OperatorSymbol::Literal);
        assert!(folded.left.is_none() && folded.right.is_none());
        assert_eq!(evaluate(&folded), Value::Number(5.0));
    }

    #[test]
    fn folding_skips_failed_type_checks() {
        // '3' < 2 keeps its stage; the error belongs to evaluation time
        let root = EvaluationStage::operation(
            OperatorSymbol::Lt,
            Some(EvaluationStage::literal(Value::String("3".to_string()))),
            Some(literal(2.0)),
            stage::COMPARATOR_ERROR_FORMAT,
        );

        let folded = fold_constants(root);
        assert_eq!(folded.symbol, OperatorSymbol::Lt);
    }
}
