//! The term AST shared by the borrow checker and the operational semantics.

use std::fmt;

use crate::lifetime::Lifetime;
use crate::path::LVal;
use crate::span::Span;

/// How a variable (or, more generally, an l-value) is accessed.
///
/// `Unspecified` is a placeholder the parser emits for the surface `?lv`
/// form; the checker rewrites it to `Move` or `Copy` before applying the
/// core rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Move,
    Copy,
    Unspecified,
}

/// A single term in the core language. Every node carries a [`Span`] into
/// the original source text; spans are ignored by structural equality used
/// in the round-trip property.
#[derive(Debug, Clone)]
pub struct Term {
    pub span: Span,
    pub kind: TermKind,
}

impl Term {
    pub fn new(span: Span, kind: TermKind) -> Self {
        Term { span, kind }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}
impl Eq for Term {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermKind {
    /// A literal runtime integer. Only `0` exists in the parsed surface
    /// grammar's `Integer` is a sequence of digits, negative literals are not
    /// part of the grammar; integers are otherwise opaque scalars.
    IntLit(i64),
    /// `let mut x = e`. The `mut` keyword is required by the surface grammar
    /// but does not affect the core semantics, which treats every binding as
    /// mutable (there is no separate immutable-binding type).
    Let {
        name: String,
        init: Box<Term>,
    },
    /// `lv = e`.
    Assign {
        target: LVal,
        value: Box<Term>,
    },
    /// A read of an l-value under a given access discipline: bare `lv` is a
    /// move, `!lv` an explicit copy, `?lv` unspecified.
    Access {
        kind: AccessKind,
        lval: LVal,
    },
    /// `&lv` or `&mut lv`.
    Borrow {
        mutable: bool,
        lval: LVal,
    },
    /// `box e`: allocate `e`'s value at the root (global) lifetime.
    Box(Box<Term>),
    /// `{ t1; t2; ...; tn }`, tagged with the fresh lifetime introduced on
    /// entry.
    Block {
        lifetime: Lifetime,
        body: Vec<Term>,
    },
    /// A term produced by a pluggable extension (if/else, tuples, function
    /// calls). Core `check`/`execute` do not interpret these themselves;
    /// they dispatch to whichever extension registered for the matching
    /// variant (`fr_ext`).
    Ext(ExtTerm),
}

/// The extension term grammar. Kept in the shared AST
/// crate because both the checker and the reducer need to pattern-match on
/// it to dispatch to an extension, even though neither implements its rules
/// directly.
/// `==` or `!=` in an `if` condition. The language has no boolean type, so
/// the condition is always a direct comparison of two l-values, never an
/// arbitrary term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtTerm {
    /// `if lv1 == lv2 { then } else { else_ }` (or `!=`). Both arms are
    /// `Block`s; `lhs`/`rhs` are read with copy semantics.
    If {
        lhs: LVal,
        op: CompareOp,
        rhs: LVal,
        then_branch: Box<Term>,
        else_branch: Box<Term>,
    },
    /// `(t1, t2, ..., tn)`.
    Tuple(Vec<Term>),
    /// `name::<'a, ...>(arg1, ..., argn)`.
    Call {
        name: String,
        lifetime_args: usize,
        args: Vec<Term>,
    },
}

impl fmt::Display for ExtTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtTerm::If { lhs, op, rhs, then_branch, else_branch } => {
                write!(f, "if {lhs} {op} {rhs} {then_branch} else {else_branch}")
            }
            ExtTerm::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            ExtTerm::Call { name, lifetime_args, args } => {
                write!(f, "{name}")?;
                if *lifetime_args > 0 {
                    write!(f, "::<")?;
                    for i in 0..*lifetime_args {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "'_")?;
                    }
                    write!(f, ">")?;
                }
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TermKind::IntLit(n) => write!(f, "{n}"),
            TermKind::Let { name, init } => write!(f, "let mut {name} = {init}"),
            TermKind::Assign { target, value } => write!(f, "{target} = {value}"),
            TermKind::Access {
                kind: AccessKind::Move,
                lval,
            } => write!(f, "{lval}"),
            TermKind::Access {
                kind: AccessKind::Copy,
                lval,
            } => write!(f, "!{lval}"),
            TermKind::Access {
                kind: AccessKind::Unspecified,
                lval,
            } => write!(f, "?{lval}"),
            TermKind::Borrow {
                mutable: true,
                lval,
            } => write!(f, "&mut {lval}"),
            TermKind::Borrow {
                mutable: false,
                lval,
            } => write!(f, "&{lval}"),
            TermKind::Box(inner) => write!(f, "box {inner}"),
            TermKind::Block { body, .. } => {
                write!(f, "{{ ")?;
                for (i, t) in body.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "; }}")
            }
            TermKind::Ext(ext) => write!(f, "{ext}"),
        }
    }
}
