//! Shared AST, lifetimes, l-values and diagnostic types for FeatherweightRust.
//!
//! This crate is the common substrate the borrow checker
//! (`fr_borrowck`), the operational semantics (`fr_semantics`), the store
//! (`fr_store`) and the extensions (`fr_ext`) are all built on: one AST, one
//! notion of l-value and path, one lifetime tree, one error type.

pub mod error;
pub mod lifetime;
pub mod path;
pub mod span;
pub mod term;
pub mod value;

pub use error::{CheckErrorKind, ErrorKind, FrError, Phase, Result, SemErrorKind};
pub use lifetime::{Lifetime, LifetimeArena};
pub use path::{LVal, Path, PathElem};
pub use span::Span;
pub use term::{AccessKind, CompareOp, ExtTerm, Term, TermKind};
pub use value::{Addr, Value};
