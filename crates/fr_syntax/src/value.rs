//! Runtime values produced by the operational semantics.

use std::fmt;

/// An address into the [store](../fr_store). Never appears in parsed source;
/// produced only by `Borrow` and `Box` reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(pub usize);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fully reduced term.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    /// A reference to a store cell. `owning` distinguishes a `box e`
    /// allocation (which owns its heap cell, and must be recursively
    /// finalised when the binding holding it goes out of scope) from a
    /// `&`/`&mut` borrow (which does not own the cell it points at). This is
    /// the global-lifetime flag attached to box values.
    Location { addr: Addr, owning: bool },
    Unit,
    Tuple(Vec<Value>),
}

impl Value {
    pub fn borrow(addr: Addr) -> Value {
        Value::Location { addr, owning: false }
    }

    pub fn owned(addr: Addr) -> Value {
        Value::Location { addr, owning: true }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<Addr> {
        match self {
            Value::Location { addr, .. } => Some(*addr),
            _ => None,
        }
    }

    pub fn is_owning(&self) -> bool {
        matches!(self, Value::Location { owning: true, .. })
    }

    /// The field projections of a tuple value, or `None` for any other
    /// value shape.
    pub fn field(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Tuple(fields) => fields.get(i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Location { addr, .. } => write!(f, "{addr}"),
            Value::Unit => write!(f, "()"),
            Value::Tuple(fields) => {
                write!(f, "(")?;
                for (i, v) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
        }
    }
}
