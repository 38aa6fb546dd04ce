//! Parse-time failures. Distinct from [`fr_syntax::FrError`]: a program that
//! fails to parse never reaches the checker or the semantics, so it has no
//! [`fr_syntax::Phase`] to report. Call sites that need a single error type
//! across parse+check+run (the CLI) wrap this with `#[from]`, the way the
//! teacher's own crate-boundary error enums wrap each other's errors.

use fr_syntax::Span;

use crate::lexer::Token;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected character {found:?} at {span}")]
    UnexpectedChar { span: Span, found: char },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("unexpected token {found:?} at {span}, expected {expected}")]
    UnexpectedToken {
        span: Span,
        found: Token,
        expected: &'static str,
    },

    #[error("invalid type annotation at {span}: {message}")]
    InvalidType { span: Span, message: String },
}

pub type Result<T> = std::result::Result<T, ParseError>;
