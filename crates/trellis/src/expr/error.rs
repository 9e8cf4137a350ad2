//! Error types for the expression engine.

use thiserror::Error;

/// Fatal parse failure raised by [`compile`](super::compile).
///
/// Compilation either succeeds completely or fails with one of these; no
/// partial result is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// `$` was followed by a character that can start neither a variable
    /// name nor plain text.
    #[error("unexpected character {found:?} after '$' at offset {offset}")]
    BadVariable { found: char, offset: usize },

    /// A string literal was opened but never closed.
    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },
}

/// Failure raised by [`evaluate`](super::evaluate).
///
/// Everything the compiler passes through leniently — unknown names, bad
/// operand types, malformed syntax — surfaces here at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The expression references `$name` but the variable table has no such
    /// entry.
    #[error("unknown variable ${0}")]
    UnknownVariable(String),

    /// The expression calls `name(...)` but the function table has no such
    /// entry.
    #[error("unknown function {0}()")]
    UnknownFunction(String),

    /// A token that cannot appear at this position.
    #[error("unexpected {0}")]
    UnexpectedToken(String),

    /// The expression ended mid-construct.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Numeric division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Operand types do not fit the operator.
    #[error("type error: {0}")]
    Type(String),

    /// A host function reported a failure.
    #[error("{0}")]
    Function(String),
}
