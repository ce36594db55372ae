use std::fmt;

use crate::token::{Token, TokenKind};

/// One row of the token transition table.
///
/// `is_eof` marks kinds after which an expression may legally end;
/// `is_nullable` marks kinds whose tokens may carry no payload.
#[derive(Debug)]
pub struct LexerState {
    pub kind: TokenKind,
    pub is_eof: bool,
    pub is_nullable: bool,
    pub valid_next_kinds: &'static [TokenKind],
}

impl LexerState {
    pub fn can_transition_to(&self, kind: TokenKind) -> bool {
        self.valid_next_kinds.contains(&kind)
    }
}

// One row per token kind, plus the UNKNOWN start row. Constant for all
// purposes except the compiler.
pub static VALID_LEXER_STATES: &[LexerState] = &[
    LexerState {
        kind: TokenKind::Unknown,
        is_eof: false,
        is_nullable: true,
        valid_next_kinds: &[
            TokenKind::Prefix,
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::Variable,
            TokenKind::Pattern,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::StringLiteral,
            TokenKind::Time,
            TokenKind::Clause,
        ],
    },
    LexerState {
        kind: TokenKind::Clause,
        is_eof: false,
        is_nullable: true,
        valid_next_kinds: &[
            TokenKind::Prefix,
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::Variable,
            TokenKind::Pattern,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::StringLiteral,
            TokenKind::Time,
            TokenKind::Clause,
            TokenKind::ClauseClose,
        ],
    },
    LexerState {
        kind: TokenKind::ClauseClose,
        is_eof: true,
        is_nullable: true,
        valid_next_kinds: &[
            TokenKind::Comparator,
            TokenKind::Modifier,
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::Variable,
            TokenKind::StringLiteral,
            TokenKind::Pattern,
            TokenKind::Time,
            TokenKind::Clause,
            TokenKind::ClauseClose,
            TokenKind::LogicalOp,
            TokenKind::Ternary,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Numeric,
        is_eof: true,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Modifier,
            TokenKind::Comparator,
            TokenKind::LogicalOp,
            TokenKind::ClauseClose,
            TokenKind::Ternary,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Boolean,
        is_eof: true,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Modifier,
            TokenKind::Comparator,
            TokenKind::LogicalOp,
            TokenKind::ClauseClose,
            TokenKind::Ternary,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::StringLiteral,
        is_eof: true,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Modifier,
            TokenKind::Comparator,
            TokenKind::LogicalOp,
            TokenKind::ClauseClose,
            TokenKind::Ternary,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Time,
        is_eof: true,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Modifier,
            TokenKind::Comparator,
            TokenKind::LogicalOp,
            TokenKind::ClauseClose,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Pattern,
        is_eof: true,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Modifier,
            TokenKind::Comparator,
            TokenKind::LogicalOp,
            TokenKind::ClauseClose,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Variable,
        is_eof: true,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Modifier,
            TokenKind::Comparator,
            TokenKind::LogicalOp,
            TokenKind::ClauseClose,
            TokenKind::Ternary,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Modifier,
        is_eof: false,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Prefix,
            TokenKind::Numeric,
            TokenKind::Variable,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::StringLiteral,
            TokenKind::Boolean,
            TokenKind::Clause,
            TokenKind::ClauseClose,
        ],
    },
    LexerState {
        kind: TokenKind::Comparator,
        is_eof: false,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Prefix,
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::Variable,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::StringLiteral,
            TokenKind::Time,
            TokenKind::Clause,
            TokenKind::ClauseClose,
            TokenKind::Pattern,
        ],
    },
    LexerState {
        kind: TokenKind::LogicalOp,
        is_eof: false,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Prefix,
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::Variable,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::StringLiteral,
            TokenKind::Time,
            TokenKind::Clause,
            TokenKind::ClauseClose,
        ],
    },
    LexerState {
        kind: TokenKind::Prefix,
        is_eof: false,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::Variable,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::Clause,
            TokenKind::ClauseClose,
        ],
    },
    LexerState {
        kind: TokenKind::Ternary,
        is_eof: false,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Prefix,
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::StringLiteral,
            TokenKind::Time,
            TokenKind::Variable,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::Clause,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Function,
        is_eof: false,
        is_nullable: false,
        valid_next_kinds: &[TokenKind::Clause],
    },
    LexerState {
        kind: TokenKind::Accessor,
        is_eof: true,
        is_nullable: false,
        valid_next_kinds: &[
            TokenKind::Clause,
            TokenKind::Modifier,
            TokenKind::Comparator,
            TokenKind::LogicalOp,
            TokenKind::ClauseClose,
            TokenKind::Ternary,
            TokenKind::Separator,
        ],
    },
    LexerState {
        kind: TokenKind::Separator,
        is_eof: false,
        is_nullable: true,
        valid_next_kinds: &[
            TokenKind::Prefix,
            TokenKind::Numeric,
            TokenKind::Boolean,
            TokenKind::StringLiteral,
            TokenKind::Time,
            TokenKind::Variable,
            TokenKind::Function,
            TokenKind::Accessor,
            TokenKind::Clause,
        ],
    },
];

/// The start row, before any token has been read.
pub fn start_state() -> &'static LexerState {
    &VALID_LEXER_STATES[0]
}

/// The row describing what may follow a token of the given kind.
pub fn state_for(kind: TokenKind) -> &'static LexerState {
    VALID_LEXER_STATES
        .iter()
        .find(|state| state.kind == kind)
        .unwrap_or(&VALID_LEXER_STATES[0])
}

/// Errors found by the token-sequence checks.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    /// Two adjacent tokens whose kinds may not follow one another
    InvalidTransition { from: String, to: String },

    /// A variable name used as if it were a registered function
    UndefinedFunction(String),

    /// A token of a non-nullable kind carrying no payload
    MissingValue(TokenKind),

    /// Clause opens and closes do not pair up
    UnbalancedParens,

    /// The expression stops at a point where it cannot legally end
    UnexpectedEnd,

    /// A regex-comparator operand that does not compile
    InvalidPattern(String),
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxError::InvalidTransition { from, to } => {
                write!(f, "Cannot transition token types from {} to {}", from, to)
            }
            SyntaxError::UndefinedFunction(name) => write!(f, "Undefined function {}", name),
            SyntaxError::MissingValue(kind) => {
                write!(f, "Token kind '{}' cannot have a nil value", kind)
            }
            SyntaxError::UnbalancedParens => write!(f, "Unbalanced parenthesis"),
            SyntaxError::UnexpectedEnd => write!(f, "Unexpected end of expression"),
            SyntaxError::InvalidPattern(msg) => {
                write!(f, "Unable to compile regexp pattern: {}", msg)
            }
        }
    }
}

impl std::error::Error for SyntaxError {}

fn describe(kind: TokenKind, value: Option<&crate::token::TokenValue>) -> String {
    match value {
        Some(v) => format!("{} [{}]", kind, v),
        None => format!("{} []", kind),
    }
}

/// Walks the token sequence through the transition table, verifying that
/// every adjacent pair is a legal transition and that non-nullable kinds
/// carry values. The final state must allow the expression to end.
pub fn check_syntax(tokens: &[Token]) -> Result<(), SyntaxError> {
    let mut state = start_state();
    let mut last_token: Option<&Token> = None;

    for token in tokens {
        if !state.can_transition_to(token.kind) {
            // Call out a specific error for tokens looking like they want to
            // be functions.
            if let Some(last) = last_token {
                if last.kind == TokenKind::Variable && token.kind == TokenKind::Clause {
                    let name = last
                        .value
                        .as_ref()
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    return Err(SyntaxError::UndefinedFunction(name));
                }
            }

            return Err(SyntaxError::InvalidTransition {
                from: describe(state.kind, last_token.and_then(|t| t.value.as_ref())),
                to: describe(token.kind, token.value.as_ref()),
            });
        }

        state = state_for(token.kind);

        if !state.is_nullable && token.value.is_none() {
            return Err(SyntaxError::MissingValue(token.kind));
        }

        last_token = Some(token);
    }

    if !state.is_eof {
        return Err(SyntaxError::UnexpectedEnd);
    }
    Ok(())
}

/// Checks the balance of clause tokens across the whole expression.
pub fn check_balance(tokens: &[Token]) -> Result<(), SyntaxError> {
    let mut parens: i64 = 0;

    for token in tokens {
        match token.kind {
            TokenKind::Clause => parens += 1,
            TokenKind::ClauseClose => parens -= 1,
            _ => {}
        }
    }

    if parens != 0 {
        return Err(SyntaxError::UnbalancedParens);
    }
    Ok(())
}
