use std::fmt;

/// Every semantic operator a planned stage can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSymbol {
    Value,
    Literal,
    Noop,

    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Req,
    Nreq,
    In,

    And,
    Or,

    Plus,
    Minus,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseLshift,
    BitwiseRshift,
    Multiply,
    Divide,
    Modulus,
    Exponent,

    Negate,
    Invert,
    BitwiseNot,

    TernaryTrue,
    TernaryFalse,
    Coalesce,

    Functional,
    Access,
    Separate,
}

impl fmt::Display for OperatorSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OperatorSymbol::Value => "VALUE",
            OperatorSymbol::Literal => "LITERAL",
            OperatorSymbol::Noop => "NOOP",
            OperatorSymbol::Eq => "==",
            OperatorSymbol::Neq => "!=",
            OperatorSymbol::Gt => ">",
            OperatorSymbol::Lt => "<",
            OperatorSymbol::Gte => ">=",
            OperatorSymbol::Lte => "<=",
            OperatorSymbol::Req => "=~",
            OperatorSymbol::Nreq => "!~",
            OperatorSymbol::In => "in",
            OperatorSymbol::And => "&&",
            OperatorSymbol::Or => "||",
            OperatorSymbol::Plus => "+",
            OperatorSymbol::Minus => "-",
            OperatorSymbol::BitwiseAnd => "&",
            OperatorSymbol::BitwiseOr => "|",
            OperatorSymbol::BitwiseXor => "^",
            OperatorSymbol::BitwiseLshift => "<<",
            OperatorSymbol::BitwiseRshift => ">>",
            OperatorSymbol::Multiply => "*",
            OperatorSymbol::Divide => "/",
            OperatorSymbol::Modulus => "%",
            OperatorSymbol::Exponent => "**",
            OperatorSymbol::Negate => "-",
            OperatorSymbol::Invert => "!",
            OperatorSymbol::BitwiseNot => "~",
            OperatorSymbol::TernaryTrue => "?",
            OperatorSymbol::TernaryFalse => ":",
            OperatorSymbol::Coalesce => "??",
            OperatorSymbol::Functional => "FUNCTIONAL",
            OperatorSymbol::Access => "ACCESS",
            OperatorSymbol::Separate => ",",
        };
        write!(f, "{}", text)
    }
}

/// Binding strength tiers, consulted only when mirroring sibling stages.
///
/// The planner encodes precedence structurally through the nesting of its
/// level functions; this ordering exists so the reorder pass can recognize
/// runs of equal-strength operators down the right spine of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    Noop,
    Value,
    Functional,
    Prefix,
    Exponential,
    Additive,
    Bitwise,
    BitwiseShift,
    Multiplicative,
    Comparator,
    Ternary,
    LogicalAnd,
    LogicalOr,
    Separate,
}

pub fn precedence_of(symbol: OperatorSymbol) -> Precedence {
    match symbol {
        OperatorSymbol::Noop => Precedence::Noop,
        OperatorSymbol::Value | OperatorSymbol::Literal => Precedence::Value,
        OperatorSymbol::Eq
        | OperatorSymbol::Neq
        | OperatorSymbol::Gt
        | OperatorSymbol::Lt
        | OperatorSymbol::Gte
        | OperatorSymbol::Lte
        | OperatorSymbol::Req
        | OperatorSymbol::Nreq
        | OperatorSymbol::In => Precedence::Comparator,
        OperatorSymbol::And => Precedence::LogicalAnd,
        OperatorSymbol::Or => Precedence::LogicalOr,
        OperatorSymbol::BitwiseAnd | OperatorSymbol::BitwiseOr | OperatorSymbol::BitwiseXor => {
            Precedence::Bitwise
        }
        OperatorSymbol::BitwiseLshift | OperatorSymbol::BitwiseRshift => Precedence::BitwiseShift,
        OperatorSymbol::Plus | OperatorSymbol::Minus => Precedence::Additive,
        OperatorSymbol::Multiply | OperatorSymbol::Divide | OperatorSymbol::Modulus => {
            Precedence::Multiplicative
        }
        OperatorSymbol::Exponent => Precedence::Exponential,
        OperatorSymbol::Negate | OperatorSymbol::Invert | OperatorSymbol::BitwiseNot => {
            Precedence::Prefix
        }
        OperatorSymbol::TernaryTrue | OperatorSymbol::TernaryFalse | OperatorSymbol::Coalesce => {
            Precedence::Ternary
        }
        OperatorSymbol::Functional | OperatorSymbol::Access => Precedence::Functional,
        OperatorSymbol::Separate => Precedence::Separate,
    }
}

/// Comparator lexemes, also consulted during lexing and token optimization.
pub fn comparator_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "==" => Some(OperatorSymbol::Eq),
        "!=" => Some(OperatorSymbol::Neq),
        ">" => Some(OperatorSymbol::Gt),
        ">=" => Some(OperatorSymbol::Gte),
        "<" => Some(OperatorSymbol::Lt),
        "<=" => Some(OperatorSymbol::Lte),
        "=~" => Some(OperatorSymbol::Req),
        "!~" => Some(OperatorSymbol::Nreq),
        "in" => Some(OperatorSymbol::In),
        _ => None,
    }
}

pub fn logical_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "&&" => Some(OperatorSymbol::And),
        "||" => Some(OperatorSymbol::Or),
        _ => None,
    }
}

pub fn logical_and_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "&&" => Some(OperatorSymbol::And),
        _ => None,
    }
}

pub fn logical_or_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "||" => Some(OperatorSymbol::Or),
        _ => None,
    }
}

pub fn bitwise_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "^" => Some(OperatorSymbol::BitwiseXor),
        "&" => Some(OperatorSymbol::BitwiseAnd),
        "|" => Some(OperatorSymbol::BitwiseOr),
        _ => None,
    }
}

pub fn bitwise_shift_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        ">>" => Some(OperatorSymbol::BitwiseRshift),
        "<<" => Some(OperatorSymbol::BitwiseLshift),
        _ => None,
    }
}

pub fn additive_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "+" => Some(OperatorSymbol::Plus),
        "-" => Some(OperatorSymbol::Minus),
        _ => None,
    }
}

pub fn multiplicative_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "*" => Some(OperatorSymbol::Multiply),
        "/" => Some(OperatorSymbol::Divide),
        "%" => Some(OperatorSymbol::Modulus),
        _ => None,
    }
}

pub fn exponential_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "**" => Some(OperatorSymbol::Exponent),
        _ => None,
    }
}

pub fn prefix_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "-" => Some(OperatorSymbol::Negate),
        "!" => Some(OperatorSymbol::Invert),
        "~" => Some(OperatorSymbol::BitwiseNot),
        _ => None,
    }
}

pub fn ternary_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "?" => Some(OperatorSymbol::TernaryTrue),
        ":" => Some(OperatorSymbol::TernaryFalse),
        "??" => Some(OperatorSymbol::Coalesce),
        _ => None,
    }
}

/// All arithmetic and bitwise lexemes together. The lexer needs this wider
/// set for classification; the planner levels use the narrower sets above.
pub fn modifier_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "+" => Some(OperatorSymbol::Plus),
        "-" => Some(OperatorSymbol::Minus),
        "*" => Some(OperatorSymbol::Multiply),
        "/" => Some(OperatorSymbol::Divide),
        "%" => Some(OperatorSymbol::Modulus),
        "**" => Some(OperatorSymbol::Exponent),
        "&" => Some(OperatorSymbol::BitwiseAnd),
        "|" => Some(OperatorSymbol::BitwiseOr),
        "^" => Some(OperatorSymbol::BitwiseXor),
        ">>" => Some(OperatorSymbol::BitwiseRshift),
        "<<" => Some(OperatorSymbol::BitwiseLshift),
        _ => None,
    }
}

pub fn separator_symbol(lexeme: &str) -> Option<OperatorSymbol> {
    match lexeme {
        "," => Some(OperatorSymbol::Separate),
        _ => None,
    }
}
