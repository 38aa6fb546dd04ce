//! Surface syntax for FeatherweightRust: a `nom`-based lexer feeding a
//! hand-rolled recursive-descent parser, producing the [`fr_syntax::Term`]
//! AST that the checker and the reducer both consume directly.
//!
//! The grammar is small enough that reaching for `nom` beyond the
//! tokenizing layer would be disproportionate: this crate uses `nom` for
//! [`lexer::lex`] only, and a plain recursive descent over the resulting
//! token stream for everything else.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use lexer::{Spanned, Token};
pub use parser::{parse, parse_program};
