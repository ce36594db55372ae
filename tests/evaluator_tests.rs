// tests/evaluator_tests.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use nutmeg::{eval, EvalError, Expression, ExpressionFunction, Value};

fn parameters(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
    let mut map = HashMap::new();
    for (name, value) in pairs {
        map.insert(name.to_string(), value);
    }
    map
}

fn object(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = HashMap::new();
    for (name, value) in pairs {
        map.insert(name.to_string(), value);
    }
    Value::Object(map)
}

fn evaluate(source: &str) -> Value {
    Expression::compile(source)
        .unwrap_or_else(|err| panic!("'{}' failed to compile: {}", source, err))
        .evaluate(None)
        .unwrap_or_else(|err| panic!("'{}' failed to evaluate: {}", source, err))
}

fn evaluate_with(source: &str, env: &HashMap<String, Value>) -> Value {
    Expression::compile(source)
        .unwrap_or_else(|err| panic!("'{}' failed to compile: {}", source, err))
        .evaluate(Some(env))
        .unwrap_or_else(|err| panic!("'{}' failed to evaluate: {}", source, err))
}

fn evaluate_error(source: &str, env: &HashMap<String, Value>) -> EvalError {
    Expression::compile(source)
        .unwrap_or_else(|err| panic!("'{}' failed to compile: {}", source, err))
        .evaluate(Some(env))
        .expect_err("expected an evaluation error")
}

/// A counting function table, for observing whether calls happen.
fn effect_functions() -> (HashMap<String, ExpressionFunction>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut functions: HashMap<String, ExpressionFunction> = HashMap::new();
    functions.insert(
        "effect".to_string(),
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Boolean(true))
        }),
    );

    (functions, calls)
}

// ============================================================================
// Arithmetic and literals
// ============================================================================

#[test]
fn test_arithmetic() {
    let test_cases = vec![
        ("2 + 3 * 4", 14.0),
        ("(2 + 3) * 4", 20.0),
        ("10 - 3 - 2", 5.0),
        ("2 ** 3 ** 2", 64.0),
        ("0xff + 1", 256.0),
        ("7 % 2", 1.0),
        ("10 / 4", 2.5),
        ("2 ** 0.5", std::f64::consts::SQRT_2),
        ("-(1 + 2)", -3.0),
        ("3 + -2", 1.0),
    ];

    for (input, expected) in test_cases {
        assert_eq!(
            evaluate(input),
            Value::Number(expected),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_division_follows_ieee754() {
    assert_eq!(evaluate("10 / 0"), Value::Number(f64::INFINITY));
    assert_eq!(evaluate("-10 / 0"), Value::Number(f64::NEG_INFINITY));

    match evaluate("10 % 0") {
        Value::Number(n) => assert!(n.is_nan()),
        other => panic!("expected NaN, got {:?}", other),
    }
}

#[test]
fn test_bitwise_operators() {
    let test_cases = vec![
        ("1 | 2", 3.0),
        ("6 & 3", 2.0),
        ("5 ^ 1", 4.0),
        ("2 << 3", 16.0),
        ("1024 >> 4", 64.0),
        ("~5", -6.0),
        ("~(-1)", 0.0),
    ];

    for (input, expected) in test_cases {
        assert_eq!(
            evaluate(input),
            Value::Number(expected),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_string_concatenation() {
    assert_eq!(evaluate("'foo' + 'bar'"), Value::String("foobar".to_string()));
    assert_eq!(
        evaluate("'a' + 'b' + 'c'"),
        Value::String("abc".to_string())
    );
}

#[test]
fn test_prefixes() {
    assert_eq!(evaluate("!(3 < 2)"), Value::Boolean(true));
    assert_eq!(evaluate("!true"), Value::Boolean(false));
    assert_eq!(evaluate("-7"), Value::Number(-7.0));
}

// ============================================================================
// Comparators
// ============================================================================

#[test]
fn test_comparators() {
    let test_cases = vec![
        ("1 < 2", true),
        ("2 <= 2", true),
        ("3 > 4", false),
        ("4 >= 4", true),
        ("1 == 1", true),
        ("1 != 1", false),
        ("'abc' < 'abd'", true),
        ("'b' >= 'a'", true),
        ("'a' == 'a'", true),
        ("1 == '1'", false),
        ("true == true", true),
        ("true != false", true),
    ];

    for (input, expected) in test_cases {
        assert_eq!(
            evaluate(input),
            Value::Boolean(expected),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_mixed_comparator_operands_fail() {
    let env = parameters(vec![("x", Value::from(1))]);
    let err = evaluate_error("x < 'a'", &env);
    assert!(
        err.to_string().contains("cannot be used with the comparator"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_membership() {
    assert_eq!(evaluate("1 in (1, 2, 3)"), Value::Boolean(true));
    assert_eq!(evaluate("4 in (1, 2, 3)"), Value::Boolean(false));
    assert_eq!(evaluate("'b' in ('a', 'b')"), Value::Boolean(true));

    // the right-hand side may come from a parameter
    let env = parameters(vec![(
        "allowed",
        Value::Array(vec![Value::from(2), Value::from(4)]),
    )]);
    assert_eq!(evaluate_with("2 in allowed", &env), Value::Boolean(true));
    assert_eq!(evaluate_with("3 in allowed", &env), Value::Boolean(false));
}

#[test]
fn test_membership_requires_a_sequence() {
    let err = evaluate_error("1 in 2", &HashMap::new());
    assert!(
        err.to_string().contains("cannot be used with the comparator"),
        "unexpected error: {}",
        err
    );
}

// ============================================================================
// Regex comparators
// ============================================================================

#[test]
fn test_regex_match() {
    let env = parameters(vec![("x", Value::from("apple"))]);

    assert_eq!(evaluate_with("x =~ '^a.*'", &env), Value::Boolean(true));
    assert_eq!(evaluate_with("x =~ '^b.*'", &env), Value::Boolean(false));
    assert_eq!(evaluate_with("x !~ '^b.*'", &env), Value::Boolean(true));
}

#[test]
fn test_regex_pattern_from_parameter() {
    // non-constant patterns compile at evaluation time
    let env = parameters(vec![
        ("x", Value::from("apple")),
        ("pattern", Value::from("pp")),
    ]);
    assert_eq!(evaluate_with("x =~ pattern", &env), Value::Boolean(true));

    let env = parameters(vec![
        ("x", Value::from("apple")),
        ("pattern", Value::from("[unclosed")),
    ]);
    let err = evaluate_error("x =~ pattern", &env);
    assert!(
        err.to_string().contains("Unable to compile regexp pattern"),
        "unexpected error: {}",
        err
    );
}

// ============================================================================
// Logical operators and short-circuits
// ============================================================================

#[test]
fn test_logical_operators() {
    assert_eq!(evaluate("true && false || true"), Value::Boolean(true));
    assert_eq!(evaluate("true && !false"), Value::Boolean(true));
    assert_eq!(evaluate("false || false"), Value::Boolean(false));
}

#[test]
fn test_and_short_circuits() {
    let (functions, calls) = effect_functions();
    let expression = Expression::compile_with_functions("false && effect()", &functions).unwrap();

    assert_eq!(expression.evaluate(None).unwrap(), Value::Boolean(false));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_or_short_circuits() {
    let (functions, calls) = effect_functions();
    let expression = Expression::compile_with_functions("true || effect()", &functions).unwrap();

    assert_eq!(expression.evaluate(None).unwrap(), Value::Boolean(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_coalesce_short_circuits() {
    let (functions, calls) = effect_functions();
    let expression = Expression::compile_with_functions("x ?? effect()", &functions).unwrap();

    let env = parameters(vec![("x", Value::from(5))]);
    assert_eq!(expression.evaluate(Some(&env)).unwrap(), Value::Number(5.0));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_ternary_skips_untaken_branches() {
    let (functions, calls) = effect_functions();

    let expression =
        Expression::compile_with_functions("false ? effect() : 2", &functions).unwrap();
    assert_eq!(expression.evaluate(None).unwrap(), Value::Number(2.0));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let expression =
        Expression::compile_with_functions("true ? 1 : effect()", &functions).unwrap();
    assert_eq!(expression.evaluate(None).unwrap(), Value::Number(1.0));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_short_circuit_still_runs_taken_branches() {
    let (functions, calls) = effect_functions();
    let expression = Expression::compile_with_functions("true && effect()", &functions).unwrap();

    assert_eq!(expression.evaluate(None).unwrap(), Value::Boolean(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Ternaries and coalescing
// ============================================================================

#[test]
fn test_ternary_with_parameters() {
    let expression = Expression::compile("score >= 50 ? 'pass' : 'fail'").unwrap();

    let env = parameters(vec![("score", Value::from(73))]);
    assert_eq!(
        expression.evaluate(Some(&env)).unwrap(),
        Value::String("pass".to_string())
    );

    let env = parameters(vec![("score", Value::from(12))]);
    assert_eq!(
        expression.evaluate(Some(&env)).unwrap(),
        Value::String("fail".to_string())
    );
}

#[test]
fn test_coalesce_fills_null() {
    // a present-but-null parameter coalesces; a missing one is an error
    let env = parameters(vec![("x", Value::Null)]);
    assert_eq!(evaluate_with("x ?? 7", &env), Value::Number(7.0));

    let env = parameters(vec![("x", Value::from(3))]);
    assert_eq!(evaluate_with("x ?? 7", &env), Value::Number(3.0));

    let err = evaluate_error("missing ?? 7", &HashMap::new());
    assert_eq!(err, EvalError::UnknownParameter("missing".to_string()));
    assert!(err.to_string().contains("No parameter 'missing' found"));
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_parameter_lookup() {
    let env = parameters(vec![("name", Value::from("alice"))]);
    assert_eq!(evaluate_with("name == 'alice'", &env), Value::Boolean(true));

    let env = parameters(vec![("name", Value::from("bob"))]);
    assert_eq!(evaluate_with("name == 'alice'", &env), Value::Boolean(false));
}

#[test]
fn test_bracketed_parameter_names() {
    let env = parameters(vec![("response time", Value::from(12))]);
    assert_eq!(
        evaluate_with("[response time] < 100", &env),
        Value::Boolean(true)
    );
}

#[test]
fn test_integer_parameters_widen_to_doubles() {
    let env = parameters(vec![("n", Value::from(7_i64))]);
    assert_eq!(evaluate_with("n + 0.5", &env), Value::Number(7.5));
}

#[test]
fn test_missing_parameter_is_an_error() {
    let err = evaluate_error("missing + 1", &HashMap::new());
    assert_eq!(err, EvalError::UnknownParameter("missing".to_string()));
}

// ============================================================================
// Functions
// ============================================================================

fn sum_function() -> ExpressionFunction {
    Arc::new(|args| {
        let mut total = 0.0;
        for arg in args {
            match arg {
                Value::Number(n) => total += n,
                other => {
                    return Err(EvalError::InvalidArgument(format!(
                        "sum expects numbers, got {}",
                        other.kind_name()
                    )))
                }
            }
        }
        Ok(Value::Number(total))
    })
}

#[test]
fn test_function_calls() {
    let mut functions: HashMap<String, ExpressionFunction> = HashMap::new();
    functions.insert("sum".to_string(), sum_function());
    functions.insert("answer".to_string(), Arc::new(|_| Ok(Value::from(42))));

    let test_cases = vec![
        ("sum(1, 2, 3)", 6.0),
        ("sum(5)", 5.0),
        ("sum()", 0.0),
        ("answer()", 42.0),
        ("sum(1, sum(2, 3))", 6.0),
        ("sum(1, 2) * 2", 6.0),
    ];

    for (input, expected) in test_cases {
        let expression = Expression::compile_with_functions(input, &functions).unwrap();
        assert_eq!(
            expression.evaluate(None).unwrap(),
            Value::Number(expected),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_function_errors_propagate() {
    let mut functions: HashMap<String, ExpressionFunction> = HashMap::new();
    functions.insert("sum".to_string(), sum_function());

    let expression = Expression::compile_with_functions("sum('a')", &functions).unwrap();
    let err = expression.evaluate(None).unwrap_err();
    assert!(
        err.to_string().contains("sum expects numbers"),
        "unexpected error: {}",
        err
    );
}

// ============================================================================
// Accessors
// ============================================================================

fn user_env() -> HashMap<String, Value> {
    let greet: ExpressionFunction = Arc::new(|args| {
        let name = args
            .first()
            .map(|arg| arg.to_string())
            .unwrap_or_else(|| "nobody".to_string());
        Ok(Value::String(format!("hello {}", name)))
    });

    parameters(vec![(
        "user",
        object(vec![
            ("Name", Value::from("alice")),
            ("Age", Value::from(30)),
            (
                "Address",
                object(vec![("City", Value::from("amsterdam"))]),
            ),
            ("Greet", Value::Function(greet)),
        ]),
    )])
}

#[test]
fn test_accessor_fields() {
    let env = user_env();

    assert_eq!(
        evaluate_with("user.Name", &env),
        Value::String("alice".to_string())
    );
    assert_eq!(evaluate_with("user.Age + 1", &env), Value::Number(31.0));
    assert_eq!(
        evaluate_with("user.Address.City", &env),
        Value::String("amsterdam".to_string())
    );
    assert_eq!(
        evaluate_with("user.Name == 'alice'", &env),
        Value::Boolean(true)
    );
}

#[test]
fn test_accessor_method_calls() {
    let env = user_env();

    assert_eq!(
        evaluate_with("user.Greet('bob')", &env),
        Value::String("hello bob".to_string())
    );
    assert_eq!(
        evaluate_with("user.Greet()", &env),
        Value::String("hello nobody".to_string())
    );
}

#[test]
fn test_accessor_misses() {
    let env = user_env();

    let err = evaluate_error("user.Missing", &env);
    assert!(matches!(err, EvalError::AccessError(_)));

    let err = evaluate_error("user.Name.Length", &env);
    assert!(matches!(err, EvalError::AccessError(_)));

    let err = evaluate_error("ghost.Name", &HashMap::new());
    assert_eq!(err, EvalError::UnknownParameter("ghost".to_string()));
}

#[test]
fn test_unexported_accessor_fails_compilation() {
    assert!(Expression::compile("user.name").is_err());
    assert!(Expression::compile("user.Name").is_ok());
}

// ============================================================================
// Time literals
// ============================================================================

#[test]
fn test_time_literals_become_epoch_seconds() {
    assert_eq!(
        evaluate("'2014-01-02T14:02:48Z' == 1388671368"),
        Value::Boolean(true)
    );
    assert_eq!(
        evaluate("'2014-01-02T00:00:00Z' < '2014-01-03T00:00:00Z'"),
        Value::Boolean(true)
    );
    assert_eq!(
        evaluate("'2014-01-02T00:00:00Z' + 60 == '2014-01-02T00:01:00Z'"),
        Value::Boolean(true)
    );
}

// ============================================================================
// Type-check gating
// ============================================================================

#[test]
fn test_type_checks_can_be_disabled() {
    // with checks on, a numeric ternary condition is rejected up front
    let expression = Expression::compile("1 ? 2 : 3").unwrap();
    assert!(expression.evaluate(None).is_err());

    // with checks off the operators get their shot; `?` treats a non-true
    // condition as false
    let mut unchecked = Expression::compile("1 ? 2 : 3").unwrap();
    unchecked.checks_types = false;
    assert_eq!(unchecked.evaluate(None).unwrap(), Value::Number(3.0));
}

#[test]
fn test_disabled_checks_still_fail_inside_operators() {
    let mut expression = Expression::compile("'a' - 1").unwrap();
    expression.checks_types = false;

    let err = expression.evaluate(None).unwrap_err();
    assert!(
        err.to_string().contains("Cannot subtract"),
        "unexpected error: {}",
        err
    );
}

// ============================================================================
// Convenience wrapper
// ============================================================================

#[test]
fn test_eval_returns_values() {
    assert_eq!(eval("2 + 3 * 4"), Value::Number(14.0));
    assert_eq!(eval("'foo' + 'bar'"), Value::String("foobar".to_string()));
    assert_eq!(eval("3 > 2"), Value::Boolean(true));
}

#[test]
fn test_eval_collapses_failures_to_false() {
    // compile failures
    assert_eq!(eval(""), Value::Boolean(false));
    assert_eq!(eval("1 +"), Value::Boolean(false));
    assert_eq!(eval("(1"), Value::Boolean(false));

    // evaluation failures
    assert_eq!(eval("missing ?? 7"), Value::Boolean(false));
    assert_eq!(eval("1 < 'a'"), Value::Boolean(false));
}

// ============================================================================
// Compiled-expression reuse
// ============================================================================

#[test]
fn test_compile_once_evaluate_many() {
    let expression = Expression::compile("n * 2").unwrap();

    for n in 0..10 {
        let env = parameters(vec![("n", Value::from(n))]);
        assert_eq!(
            expression.evaluate(Some(&env)).unwrap(),
            Value::Number((n * 2) as f64)
        );
    }
}

#[test]
fn test_expressions_are_shareable_across_threads() {
    let expression = Arc::new(Expression::compile("n * n").unwrap());

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let expression = expression.clone();
            thread::spawn(move || {
                let env = parameters(vec![("n", Value::from(n))]);
                expression.evaluate(Some(&env)).unwrap()
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Value::Number((n * n) as f64));
    }
}

#[test]
fn test_expression_introspection() {
    let expression = Expression::compile("a + b * 2").unwrap();
    assert_eq!(expression.variables(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(expression.to_string(), "a + b * 2");
}
