// tests/grammar_tests.rs

use std::collections::HashMap;

use nutmeg::grammar::{check_balance, check_syntax};
use nutmeg::lexer::parse_tokens;
use nutmeg::{CompileError, Expression, SyntaxError};

fn lex(source: &str) -> Vec<nutmeg::Token> {
    parse_tokens(source, &HashMap::new()).unwrap()
}

fn compile_error(source: &str) -> CompileError {
    Expression::compile(source).err().unwrap_or_else(|| {
        panic!("expected '{}' to fail compilation", source);
    })
}

// ============================================================================
// Legal sequences
// ============================================================================

#[test]
fn test_valid_expressions_pass() {
    let test_cases = vec![
        "1",
        "1 + 2",
        "true && false",
        "!true",
        "-1 - -2",
        "(1)",
        "()",
        "(1, 2, 3)",
        "foo == 'bar'",
        "[escaped name] > 10",
        "1 > 2 ? 3 : 4",
        "x ?? 1",
        "1 in (1, 2)",
        "user.Name",
        "'a' =~ 'b'",
    ];

    for input in test_cases {
        let tokens = lex(input);
        assert!(
            check_syntax(&tokens).is_ok(),
            "Failed for input: {}",
            input
        );
        assert!(check_balance(&tokens).is_ok(), "Failed for input: {}", input);
    }
}

// ============================================================================
// Illegal transitions
// ============================================================================

#[test]
fn test_invalid_transitions() {
    let test_cases = vec![
        "5 5",
        "'a' 'b'",
        "true false",
        "1 + * 2",
        "&& true",
        "1 == == 2",
        "foo bar",
        ", 1",
    ];

    for input in test_cases {
        let tokens = lex(input);
        let err = check_syntax(&tokens).unwrap_err();
        assert!(
            matches!(err, SyntaxError::InvalidTransition { .. }),
            "Failed for input: {} (got {:?})",
            input,
            err
        );
    }
}

#[test]
fn test_transition_error_names_both_tokens() {
    let err = check_syntax(&lex("5 5")).unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("Cannot transition token types"),
        "unexpected message: {}",
        message
    );
    assert!(message.contains("NUMERIC"), "unexpected message: {}", message);
}

#[test]
fn test_undefined_function_special_case() {
    // a variable followed by a clause looks like a call to a function that
    // was never registered
    let err = check_syntax(&lex("foo(1)")).unwrap_err();
    assert_eq!(err, SyntaxError::UndefinedFunction("foo".to_string()));
    assert!(err.to_string().contains("Undefined function foo"));
}

// ============================================================================
// Expression endings
// ============================================================================

#[test]
fn test_unexpected_end() {
    let test_cases = vec!["1 +", "true &&", "1 <", "!", "-", "1 ? 2 :", "x ??", "1,"];

    for input in test_cases {
        let err = check_syntax(&lex(input)).unwrap_err();
        assert_eq!(
            err,
            SyntaxError::UnexpectedEnd,
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_empty_expression_cannot_end() {
    assert_eq!(check_syntax(&[]).unwrap_err(), SyntaxError::UnexpectedEnd);
    assert!(matches!(
        compile_error(""),
        CompileError::Syntax(SyntaxError::UnexpectedEnd)
    ));
}

// ============================================================================
// Balance
// ============================================================================

#[test]
fn test_unbalanced_parens() {
    let test_cases = vec!["(1", "1)", "((1)", "(1))", "(()"];

    for input in test_cases {
        let err = check_balance(&lex(input)).unwrap_err();
        assert_eq!(
            err,
            SyntaxError::UnbalancedParens,
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_compile_surfaces_balance_before_planning() {
    assert!(matches!(
        compile_error("(1"),
        CompileError::Syntax(SyntaxError::UnbalancedParens)
    ));
}

// ============================================================================
// Pattern optimization errors
// ============================================================================

#[test]
fn test_invalid_regex_fails_compilation() {
    let err = compile_error("'value' =~ '[unclosed'");
    assert!(matches!(
        err,
        CompileError::Syntax(SyntaxError::InvalidPattern(_))
    ));
    assert!(
        err.to_string().contains("Unable to compile regexp pattern"),
        "unexpected message: {}",
        err
    );
}

#[test]
fn test_regex_against_variable_is_not_precompiled() {
    // only string constants are rewritten; a variable right-hand side
    // compiles fine and is built at evaluation time
    assert!(Expression::compile("'value' =~ pattern").is_ok());
}
