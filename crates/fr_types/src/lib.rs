//! The typing environment and type algebra shared by the borrow checker and
//! its extensions.

pub mod env;
pub mod resolve;
pub mod ty;

pub use env::Environment;
pub use resolve::resolve;
pub use ty::{Mutability, Type};
