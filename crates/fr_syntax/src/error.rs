use std::fmt;

use crate::span::Span;

/// Which analysis raised an [`FrError`].
///
/// The top-level driver uses this to keep checker and semantic failures on
/// separate channels, so that both analyses can be run independently on the
/// same input (see the soundness property: a program must either check AND
/// run, or fail both).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Phase {
    Check,
    Semantics,
}

/// Borrow-checker failure kinds.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CheckErrorKind {
    UndeclaredVariable,
    Redeclaration,
    UseOfMoved,
    TypeMismatch,
    BorrowConflict,
    AssignmentToBorrowed,
    LifetimeEscape,
    BadDereference,
    InvalidIndex,
}

/// Operational-semantics failure kinds.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SemErrorKind {
    DanglingReference,
    ReadOfEmptyCell,
    WriteToEmptyCell,
    Stuck,
}

/// The single classification tag shared by every [`FrError`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    Check(CheckErrorKind),
    Semantics(SemErrorKind),
}

impl ErrorKind {
    pub fn phase(self) -> Phase {
        match self {
            ErrorKind::Check(_) => Phase::Check,
            ErrorKind::Semantics(_) => Phase::Semantics,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ErrorKind::Check(CheckErrorKind::UndeclaredVariable) => "undeclared-variable",
            ErrorKind::Check(CheckErrorKind::Redeclaration) => "redeclaration",
            ErrorKind::Check(CheckErrorKind::UseOfMoved) => "use-of-moved",
            ErrorKind::Check(CheckErrorKind::TypeMismatch) => "type-mismatch",
            ErrorKind::Check(CheckErrorKind::BorrowConflict) => "borrow-conflict",
            ErrorKind::Check(CheckErrorKind::AssignmentToBorrowed) => "assignment-to-borrowed",
            ErrorKind::Check(CheckErrorKind::LifetimeEscape) => "lifetime-escape",
            ErrorKind::Check(CheckErrorKind::BadDereference) => "bad-dereference",
            ErrorKind::Check(CheckErrorKind::InvalidIndex) => "invalid-index",
            ErrorKind::Semantics(SemErrorKind::DanglingReference) => "dangling-reference",
            ErrorKind::Semantics(SemErrorKind::ReadOfEmptyCell) => "read-of-empty-cell",
            ErrorKind::Semantics(SemErrorKind::WriteToEmptyCell) => "write-to-empty-cell",
            ErrorKind::Semantics(SemErrorKind::Stuck) => "stuck",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The single tagged error type raised by every rule in the checker and the
/// semantics. Carries a source span and a classification tag; no rule
/// recovers from a failure once raised.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} at {span}: {message}")]
pub struct FrError {
    pub span: Span,
    pub kind: ErrorKind,
    pub message: String,
}

impl FrError {
    pub fn new(span: Span, kind: ErrorKind, message: impl Into<String>) -> Self {
        FrError {
            span,
            kind,
            message: message.into(),
        }
    }

    pub fn check(span: Span, kind: CheckErrorKind, message: impl Into<String>) -> Self {
        FrError::new(span, ErrorKind::Check(kind), message)
    }

    pub fn semantics(span: Span, kind: SemErrorKind, message: impl Into<String>) -> Self {
        FrError::new(span, ErrorKind::Semantics(kind), message)
    }

    pub fn phase(&self) -> Phase {
        self.kind.phase()
    }

    pub fn is_check_error(&self) -> bool {
        self.phase() == Phase::Check
    }

    pub fn is_semantic_error(&self) -> bool {
        self.phase() == Phase::Semantics
    }
}

pub type Result<T> = std::result::Result<T, FrError>;
