use std::collections::HashMap;
use std::fmt;

use crate::grammar::{self, LexerState};
use crate::operators;
use crate::timestamp;
use crate::token::{Token, TokenKind, TokenValue};
use crate::value::ExpressionFunction;

/// Errors that can occur while scanning source text into tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// A hex literal that does not parse as an unsigned 64-bit value
    MalformedHex(String),
    /// A decimal literal that does not parse as a double
    MalformedNumber(String),
    /// A `[` with no matching `]`
    UnclosedBracket,
    /// A quote with no matching closing quote
    UnclosedString,
    /// A dotted identifier ending in `.`
    HangingAccessor(String),
    /// A dotted identifier with a lowercase path segment
    UnexportedField { field: String, token: String },
    /// A symbol run that is not a known operator
    InvalidToken(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::MalformedHex(text) => {
                write!(f, "Unable to parse hex value '{}' to a number", text)
            }
            LexError::MalformedNumber(text) => {
                write!(f, "Unable to parse numeric value '{}' to a number", text)
            }
            LexError::UnclosedBracket => write!(f, "Unclosed parameter bracket"),
            LexError::UnclosedString => write!(f, "Unclosed string literal"),
            LexError::HangingAccessor(token) => {
                write!(f, "Hanging accessor on token '{}'", token)
            }
            LexError::UnexportedField { field, token } => write!(
                f,
                "Unable to access unexported field '{}' in token '{}'",
                field, token
            ),
            LexError::InvalidToken(text) => write!(f, "Invalid token: '{}'", text),
        }
    }
}

impl std::error::Error for LexError {}

struct CharStream {
    chars: Vec<char>,
    position: usize,
}

impl CharStream {
    fn new(source: &str) -> Self {
        CharStream {
            chars: source.chars().collect(),
            position: 0,
        }
    }

    fn can_read(&self) -> bool {
        self.position < self.chars.len()
    }

    fn read(&mut self) -> char {
        let character = self.chars[self.position];
        self.position += 1;
        character
    }

    /// Moves the cursor backwards; a negative amount skips forwards.
    fn rewind(&mut self, amount: isize) {
        self.position = (self.position as isize - amount).max(0) as usize;
    }
}

/// Converts source text into an ordered token list.
///
/// The function table is consulted to distinguish function names from plain
/// variables. Whitespace between tokens is skipped; an unreadable character
/// run is a lex error.
pub fn parse_tokens(
    source: &str,
    functions: &HashMap<String, ExpressionFunction>,
) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut stream = CharStream::new(source);
    let mut state = grammar::start_state();

    while stream.can_read() {
        match read_token(&mut stream, state, functions)? {
            Some(token) => {
                state = grammar::state_for(token.kind);
                tokens.push(token);
            }
            None => break,
        }
    }

    Ok(tokens)
}

fn read_token(
    stream: &mut CharStream,
    state: &LexerState,
    functions: &HashMap<String, ExpressionFunction>,
) -> Result<Option<Token>, LexError> {
    // numeric is 0-9, or . or 0x followed by hex digits
    // string starts with a quote
    // variable is alphanumeric, always starts with a letter
    // bracket always means variable
    // symbols are anything non-alphanumeric, read greedily
    while stream.can_read() {
        let character = stream.read();

        if character.is_whitespace() {
            continue;
        }

        // numeric constant
        if is_numeric(character) {
            if stream.can_read() && character == '0' {
                let next = stream.read();

                if stream.can_read() && next == 'x' {
                    let (lexeme, _) = read_until_false(stream, false, true, true, is_hex_digit);
                    let parsed = u64::from_str_radix(&lexeme, 16)
                        .map_err(|_| LexError::MalformedHex(lexeme.clone()))?;

                    return Ok(Some(Token::new(
                        TokenKind::Numeric,
                        TokenValue::Number(parsed as f64),
                    )));
                }
                stream.rewind(1);
            }

            let lexeme = read_token_until_false(stream, is_numeric);
            let parsed: f64 = lexeme
                .parse()
                .map_err(|_| LexError::MalformedNumber(lexeme.clone()))?;

            return Ok(Some(Token::new(
                TokenKind::Numeric,
                TokenValue::Number(parsed),
            )));
        }

        // comma, separator
        if character == ',' {
            return Ok(Some(Token::new(
                TokenKind::Separator,
                TokenValue::Symbol(",".to_string()),
            )));
        }

        // escaped variable
        if character == '[' {
            let (name, completed) =
                read_until_false(stream, true, false, true, |c| c != ']');

            if !completed {
                return Err(LexError::UnclosedBracket);
            }

            // the read normally rewinds to the closing bracket, which we
            // want to skip
            stream.rewind(-1);
            return Ok(Some(Token::new(
                TokenKind::Variable,
                TokenValue::Text(name),
            )));
        }

        // regular variable - or function, boolean, accessor?
        if character.is_alphabetic() {
            let lexeme = read_token_until_false(stream, is_variable_name);
            return classify_identifier(lexeme, functions).map(Some);
        }

        if character == '\'' || character == '"' {
            let (literal, completed) = read_string_literal(stream, character);

            if !completed {
                return Err(LexError::UnclosedString);
            }

            // check to see if this can be parsed as a time
            let token = match timestamp::try_parse_time(&literal) {
                Some(time) => Token::new(TokenKind::Time, TokenValue::Time(time)),
                None => Token::new(TokenKind::StringLiteral, TokenValue::Text(literal)),
            };
            return Ok(Some(token));
        }

        if character == '(' {
            return Ok(Some(Token::new(
                TokenKind::Clause,
                TokenValue::Symbol("(".to_string()),
            )));
        }

        if character == ')' {
            return Ok(Some(Token::new(
                TokenKind::ClauseClose,
                TokenValue::Symbol(")".to_string()),
            )));
        }

        // must be a known symbol
        let lexeme = read_token_until_false(stream, is_not_alphanumeric);

        // "-" can mean "prefixed negation" or "minus", depending on what the
        // last token admits
        let kind = if state.can_transition_to(TokenKind::Prefix)
            && operators::prefix_symbol(&lexeme).is_some()
        {
            TokenKind::Prefix
        } else if operators::modifier_symbol(&lexeme).is_some() {
            TokenKind::Modifier
        } else if operators::logical_symbol(&lexeme).is_some() {
            TokenKind::LogicalOp
        } else if operators::comparator_symbol(&lexeme).is_some() {
            TokenKind::Comparator
        } else if operators::ternary_symbol(&lexeme).is_some() {
            TokenKind::Ternary
        } else {
            return Err(LexError::InvalidToken(lexeme));
        };

        return Ok(Some(Token::new(kind, TokenValue::Symbol(lexeme))));
    }

    Ok(None)
}

fn classify_identifier(
    lexeme: String,
    functions: &HashMap<String, ExpressionFunction>,
) -> Result<Token, LexError> {
    let mut token = Token::new(TokenKind::Variable, TokenValue::Text(lexeme.clone()));

    // boolean?
    if lexeme == "true" {
        token = Token::new(TokenKind::Boolean, TokenValue::Boolean(true));
    } else if lexeme == "false" {
        token = Token::new(TokenKind::Boolean, TokenValue::Boolean(false));
    }

    // textual operator? force lower case for consistency
    if lexeme == "in" || lexeme == "IN" {
        token = Token::new(TokenKind::Comparator, TokenValue::Symbol("in".to_string()));
    }

    // function?
    if let Some(function) = functions.get(&lexeme) {
        token = Token::new(TokenKind::Function, TokenValue::Function(function.clone()));
    }

    // accessor?
    if lexeme.contains('.') {
        // check that it doesn't end with a hanging period
        if lexeme.ends_with('.') {
            return Err(LexError::HangingAccessor(lexeme));
        }

        let segments: Vec<String> = lexeme.split('.').map(str::to_string).collect();

        // check that none of them are unexported; only capitalised fields
        // and methods are reachable at evaluation time
        for segment in &segments[1..] {
            if let Some(first) = segment.chars().next() {
                if first.to_uppercase().next() != Some(first) {
                    return Err(LexError::UnexportedField {
                        field: segment.clone(),
                        token: lexeme.clone(),
                    });
                }
            }
        }

        token = Token::new(TokenKind::Accessor, TokenValue::Path(segments));
    }

    Ok(token)
}

fn read_token_until_false(stream: &mut CharStream, condition: impl Fn(char) -> bool) -> String {
    stream.rewind(1);
    read_until_false(stream, false, true, true, condition).0
}

/// Reads characters until the condition is false or whitespace is broken.
/// The second return is false if the stream ended before either happened.
fn read_until_false(
    stream: &mut CharStream,
    include_whitespace: bool,
    break_whitespace: bool,
    allow_escaping: bool,
    condition: impl Fn(char) -> bool,
) -> (String, bool) {
    let mut buffer = String::new();
    let mut conditioned = false;

    while stream.can_read() {
        let character = stream.read();

        // backslashes escape anything
        if allow_escaping && character == '\\' {
            if stream.can_read() {
                buffer.push(stream.read());
            }
            continue;
        }

        if character.is_whitespace() {
            if break_whitespace && !buffer.is_empty() {
                conditioned = true;
                break;
            }
            if !include_whitespace {
                continue;
            }
        }

        if condition(character) {
            buffer.push(character);
        } else {
            conditioned = true;
            stream.rewind(1);
            break;
        }
    }

    (buffer, conditioned)
}

/// Reads a quoted literal up to the matching quote, honoring escapes.
fn read_string_literal(stream: &mut CharStream, quote: char) -> (String, bool) {
    let mut buffer = String::new();

    while stream.can_read() {
        let character = stream.read();

        if character == '\\' {
            if stream.can_read() {
                buffer.push(stream.read());
            }
            continue;
        }

        if character == quote {
            return (buffer, true);
        }
        buffer.push(character);
    }

    (buffer, false)
}

fn is_hex_digit(character: char) -> bool {
    character.is_ascii_hexdigit()
}

fn is_numeric(character: char) -> bool {
    character.is_ascii_digit() || character == '.'
}

fn is_variable_name(character: char) -> bool {
    character.is_alphanumeric() || character == '_' || character == '.'
}

fn is_not_alphanumeric(character: char) -> bool {
    !(character.is_ascii_digit()
        || character.is_alphanumeric()
        || character == '('
        || character == ')'
        || character == '['
        || character == ']'
        || character == '\''
        || character == '"')
}
