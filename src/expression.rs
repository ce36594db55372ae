use std::collections::HashMap;
use std::fmt;

use crate::evaluator::{self, EvalError};
use crate::grammar::{self, SyntaxError};
use crate::lexer::{self, LexError};
use crate::params::{EmptyParameters, Parameters};
use crate::planner::{self, PlanError};
use crate::stage::EvaluationStage;
use crate::token::{Token, TokenKind, TokenValue};
use crate::transform;
use crate::value::{ExpressionFunction, Value};

/// Any error produced while turning source text into a compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Character-level scanning failure
    Lex(LexError),
    /// Token-sequence or balance failure
    Syntax(SyntaxError),
    /// Stage-planning failure
    Plan(PlanError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(err) => write!(f, "{}", err),
            CompileError::Syntax(err) => write!(f, "{}", err),
            CompileError::Plan(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError::Lex(err)
    }
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        CompileError::Syntax(err)
    }
}

impl From<PlanError> for CompileError {
    fn from(err: PlanError) -> Self {
        CompileError::Plan(err)
    }
}

/// A compiled expression, ready to evaluate against parameter environments.
///
/// Compilation runs the full pipeline once: lex, balance and grammar checks,
/// token optimization, stage planning, re-ordering, and constant folding.
/// The result is immutable; a compiled expression can be evaluated any
/// number of times, from any thread, without re-parsing.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use nutmeg::{Expression, Value};
///
/// let expression = Expression::compile("score >= 50 ? 'pass' : 'fail'").unwrap();
///
/// let mut parameters = HashMap::new();
/// parameters.insert("score".to_string(), Value::from(73));
///
/// let result = expression.evaluate(Some(&parameters)).unwrap();
/// assert_eq!(result, Value::String("pass".to_string()));
/// ```
pub struct Expression {
    input: String,
    tokens: Vec<Token>,
    stages: Option<Box<EvaluationStage>>,

    /// When false, the evaluator skips the per-operator type checks and any
    /// mismatch is reported from inside the operator instead.
    pub checks_types: bool,
}

impl Expression {
    /// Compiles an expression with no function table.
    pub fn compile(source: &str) -> Result<Expression, CompileError> {
        Expression::compile_with_functions(source, &HashMap::new())
    }

    /// Compiles an expression whose identifiers may refer to the given
    /// functions.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use std::sync::Arc;
    /// use nutmeg::{Expression, ExpressionFunction, Value};
    ///
    /// let mut functions: HashMap<String, ExpressionFunction> = HashMap::new();
    /// functions.insert(
    ///     "double".to_string(),
    ///     Arc::new(|args| match args {
    ///         [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
    ///         _ => Err(nutmeg::EvalError::InvalidArgument(
    ///             "double takes one number".to_string(),
    ///         )),
    ///     }),
    /// );
    ///
    /// let expression = Expression::compile_with_functions("double(21)", &functions).unwrap();
    /// assert_eq!(expression.evaluate(None).unwrap(), Value::Number(42.0));
    /// ```
    pub fn compile_with_functions(
        source: &str,
        functions: &HashMap<String, ExpressionFunction>,
    ) -> Result<Expression, CompileError> {
        let tokens = lexer::parse_tokens(source, functions)?;

        grammar::check_balance(&tokens)?;
        grammar::check_syntax(&tokens)?;

        let tokens = transform::optimize_tokens(tokens)?;
        let stages = planner::plan_stages(tokens.clone())?;

        Ok(Expression {
            input: source.to_string(),
            tokens,
            stages,
            checks_types: true,
        })
    }

    /// Evaluates against a parameter map, or against an empty environment
    /// when `None` is supplied.
    pub fn evaluate(
        &self,
        parameters: Option<&HashMap<String, Value>>,
    ) -> Result<Value, EvalError> {
        match parameters {
            Some(map) => self.evaluate_with(map),
            None => self.evaluate_with(&EmptyParameters),
        }
    }

    /// Evaluates against any parameter source.
    pub fn evaluate_with(&self, parameters: &dyn Parameters) -> Result<Value, EvalError> {
        match &self.stages {
            Some(root) => evaluator::evaluate_stage(root, parameters, self.checks_types),
            None => Ok(Value::Null),
        }
    }

    /// The names of the variables the expression refers to, in source order.
    pub fn variables(&self) -> Vec<String> {
        self.tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Variable)
            .filter_map(|token| match &token.value {
                Some(TokenValue::Text(name)) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input)
    }
}

/// One-shot convenience evaluation: compiles and evaluates with no
/// parameters, collapsing every failure (and a null result) to `false`.
///
/// # Examples
///
/// ```
/// use nutmeg::{eval, Value};
///
/// assert_eq!(eval("2 + 3 * 4"), Value::Number(14.0));
/// assert_eq!(eval("1 +"), Value::Boolean(false));
/// ```
pub fn eval(source: &str) -> Value {
    let expression = match Expression::compile(source) {
        Ok(expression) => expression,
        Err(_) => return Value::Boolean(false),
    };

    match expression.evaluate(None) {
        Ok(Value::Null) | Err(_) => Value::Boolean(false),
        Ok(value) => value,
    }
}
