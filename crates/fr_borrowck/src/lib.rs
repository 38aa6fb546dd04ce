//! The flow-sensitive type system that assigns each variable a type tracking
//! its ownership, mutability and the set of l-vals it may borrow from, and
//! rejects programs that violate aliasing/mutability rules.

pub mod borrow;
pub mod checker;
pub mod extension;
pub mod retype;

pub use borrow::{escapes, is_borrowed, is_mutably_borrowed, locals_at};
pub use checker::{check, check_with_extensions, Checker};
pub use extension::Extension;
pub use retype::retype_lval;
