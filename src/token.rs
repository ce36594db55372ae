use std::fmt;

use chrono::{DateTime, Local};
use regex::Regex;

use crate::value::ExpressionFunction;

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Unknown,

    Prefix,
    Numeric,
    Boolean,
    StringLiteral,
    Pattern,
    Time,
    Variable,
    Function,
    Separator,
    Accessor,

    Comparator,
    LogicalOp,
    Modifier,

    Clause,
    ClauseClose,

    Ternary,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Unknown => "UNKNOWN",
            TokenKind::Prefix => "PREFIX",
            TokenKind::Numeric => "NUMERIC",
            TokenKind::Boolean => "BOOLEAN",
            TokenKind::StringLiteral => "STRING",
            TokenKind::Pattern => "PATTERN",
            TokenKind::Time => "TIME",
            TokenKind::Variable => "VARIABLE",
            TokenKind::Function => "FUNCTION",
            TokenKind::Separator => "SEPARATOR",
            TokenKind::Accessor => "ACCESSOR",
            TokenKind::Comparator => "COMPARATOR",
            TokenKind::LogicalOp => "LOGICALOP",
            TokenKind::Modifier => "MODIFIER",
            TokenKind::Clause => "CLAUSE",
            TokenKind::ClauseClose => "CLAUSE_CLOSE",
            TokenKind::Ternary => "TERNARY",
        };
        write!(f, "{}", name)
    }
}

/// Payload carried by a token.
///
/// Symbolic tokens (operators, clauses, separators) carry their raw lexeme
/// as `Symbol`; literals carry decoded values; accessors carry the ordered
/// path segments; functions carry the registered callable.
#[derive(Clone)]
pub enum TokenValue {
    Number(f64),
    Boolean(bool),
    Text(String),
    Pattern(Regex),
    Time(DateTime<Local>),
    Path(Vec<String>),
    Function(ExpressionFunction),
    Symbol(String),
}

impl TokenValue {
    /// The raw lexeme for symbolic tokens, if this is one.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            TokenValue::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for TokenValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TokenValue::Number(a), TokenValue::Number(b)) => a == b,
            (TokenValue::Boolean(a), TokenValue::Boolean(b)) => a == b,
            (TokenValue::Text(a), TokenValue::Text(b)) => a == b,
            (TokenValue::Pattern(a), TokenValue::Pattern(b)) => a.as_str() == b.as_str(),
            (TokenValue::Time(a), TokenValue::Time(b)) => a == b,
            (TokenValue::Path(a), TokenValue::Path(b)) => a == b,
            (TokenValue::Symbol(a), TokenValue::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Number(n) => write!(f, "Number({})", n),
            TokenValue::Boolean(b) => write!(f, "Boolean({})", b),
            TokenValue::Text(s) => write!(f, "Text({:?})", s),
            TokenValue::Pattern(p) => write!(f, "Pattern({:?})", p.as_str()),
            TokenValue::Time(t) => write!(f, "Time({})", t),
            TokenValue::Path(p) => write!(f, "Path({:?})", p),
            TokenValue::Function(_) => write!(f, "Function(..)"),
            TokenValue::Symbol(s) => write!(f, "Symbol({:?})", s),
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Number(n) => write!(f, "{}", n),
            TokenValue::Boolean(b) => write!(f, "{}", b),
            TokenValue::Text(s) => write!(f, "{}", s),
            TokenValue::Pattern(p) => write!(f, "{}", p.as_str()),
            TokenValue::Time(t) => write!(f, "{}", t),
            TokenValue::Path(p) => write!(f, "{}", p.join(".")),
            TokenValue::Function(_) => write!(f, "<function>"),
            TokenValue::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// One lexed token: a kind plus an optional payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Option<TokenValue>,
}

impl Token {
    pub fn new(kind: TokenKind, value: TokenValue) -> Self {
        Token {
            kind,
            value: Some(value),
        }
    }
}
