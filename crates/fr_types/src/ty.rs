//! The type algebra: `Int`, `Box(T)`, borrows tagged with their possible
//! referents, `Undefined` (a moved-out slot), and the tuple/unit extension
//! variants.

use std::collections::BTreeSet;
use std::fmt;

use fr_syntax::LVal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Shared,
    Mut,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutability::Shared => write!(f, ""),
            Mutability::Mut => write!(f, "mut "),
        }
    }
}

/// A type assigned to a variable (or the result of an expression) by the
/// borrow checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Copy-semantics scalar.
    Int,
    /// Owns a heap cell of type `T`; move-only.
    Box(Box<Type>),
    /// A borrow of mutability `m`, recording exactly which l-values it may
    /// point to. Shared borrows are `Copy`; mutable borrows are move-only.
    Ref { mutability: Mutability, refs: BTreeSet<LVal> },
    /// Placeholder for a moved-out slot: present in the environment but not
    /// usable.
    Undefined,
    /// Extension: the unit value's type.
    Unit,
    /// Extension: a fixed-arity product type.
    Tuple(Vec<Type>),
}

impl Type {
    pub fn shared_ref(refs: impl IntoIterator<Item = LVal>) -> Type {
        Type::Ref {
            mutability: Mutability::Shared,
            refs: refs.into_iter().collect(),
        }
    }

    pub fn mut_ref(refs: impl IntoIterator<Item = LVal>) -> Type {
        Type::Ref {
            mutability: Mutability::Mut,
            refs: refs.into_iter().collect(),
        }
    }

    /// Copy-semantics types can be read without being moved out of the
    /// environment. Transitively: a tuple of copy types is copy.
    pub fn is_copy(&self) -> bool {
        match self {
            Type::Int | Type::Unit => true,
            Type::Ref { mutability: Mutability::Shared, .. } => true,
            Type::Ref { mutability: Mutability::Mut, .. } => false,
            Type::Box(_) => false,
            Type::Undefined => false,
            Type::Tuple(fields) => fields.iter().all(Type::is_copy),
        }
    }

    pub fn is_move_only(&self) -> bool {
        !self.is_copy()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Type::Undefined)
    }

    /// The l-values a reference type may point to, if any.
    pub fn referents(&self) -> Option<&BTreeSet<LVal>> {
        match self {
            Type::Ref { refs, .. } => Some(refs),
            _ => None,
        }
    }

    /// `compatible(self, other)`: required on assignment, where `self` is the
    /// existing (LHS) type and `other` the incoming (RHS) type.
    ///
    /// - Two `Int`s are always compatible.
    /// - Two boxes are compatible iff their payloads are.
    /// - Two borrows are compatible iff same mutability; mutable borrows
    ///   require exactly the same referent set, shared borrows only need
    ///   their *roots* (variable names) to agree.
    /// - Tuples are compatible componentwise.
    /// - Anything else (including `Undefined` on either side) is not
    ///   compatible.
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Int, Type::Int) => true,
            (Type::Unit, Type::Unit) => true,
            (Type::Box(a), Type::Box(b)) => a.compatible(b),
            (
                Type::Ref { mutability: Mutability::Shared, refs: a },
                Type::Ref { mutability: Mutability::Shared, refs: b },
            ) => {
                let roots_a: BTreeSet<&str> = a.iter().map(|lv| lv.var.as_str()).collect();
                let roots_b: BTreeSet<&str> = b.iter().map(|lv| lv.var.as_str()).collect();
                roots_a == roots_b
            }
            (
                Type::Ref { mutability: Mutability::Mut, refs: a },
                Type::Ref { mutability: Mutability::Mut, refs: b },
            ) => a == b,
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.compatible(y))
            }
            _ => false,
        }
    }

    /// Subtyping used when widening a shared-borrow l-val set (the set may
    /// grow); mutable borrows are invariant so subtyping degrades to
    /// equality for them.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Int, Type::Int) => true,
            (Type::Unit, Type::Unit) => true,
            (Type::Box(a), Type::Box(b)) => a.is_subtype_of(b),
            (
                Type::Ref { mutability: Mutability::Shared, refs: a },
                Type::Ref { mutability: Mutability::Shared, refs: b },
            ) => a.is_subset(b),
            (
                Type::Ref { mutability: Mutability::Mut, refs: a },
                Type::Ref { mutability: Mutability::Mut, refs: b },
            ) => a == b,
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_subtype_of(y))
            }
            _ => false,
        }
    }

    /// The join of two types along a control-flow merge: the least type both
    /// are a subtype of, if one exists. Used by the if/else extension to
    /// combine branch-result types and branch-result environments.
    pub fn join(&self, other: &Type) -> Option<Type> {
        match (self, other) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (Type::Unit, Type::Unit) => Some(Type::Unit),
            (Type::Box(a), Type::Box(b)) => a.join(b).map(|t| Type::Box(Box::new(t))),
            (
                Type::Ref { mutability: Mutability::Shared, refs: a },
                Type::Ref { mutability: Mutability::Shared, refs: b },
            ) => Some(Type::shared_ref(a.union(b).cloned())),
            (
                Type::Ref { mutability: Mutability::Mut, refs: a },
                Type::Ref { mutability: Mutability::Mut, refs: b },
            ) if a == b => Some(self.clone()),
            (Type::Tuple(a), Type::Tuple(b)) if a.len() == b.len() => {
                let joined: Option<Vec<Type>> =
                    a.iter().zip(b).map(|(x, y)| x.join(y)).collect();
                joined.map(Type::Tuple)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Unit => write!(f, "()"),
            Type::Undefined => write!(f, "<moved>"),
            Type::Box(inner) => write!(f, "box {inner}"),
            Type::Ref { mutability, refs } => {
                write!(f, "&{mutability}{{")?;
                for (i, lv) in refs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{lv}")?;
                }
                write!(f, "}}")
            }
            Type::Tuple(fields) => {
                write!(f, "(")?;
                for (i, t) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_copy_box_is_not() {
        assert!(Type::Int.is_copy());
        assert!(!Type::Box(Box::new(Type::Int)).is_copy());
    }

    #[test]
    fn tuple_of_copies_is_copy() {
        assert!(Type::Tuple(vec![Type::Int, Type::Int]).is_copy());
        assert!(!Type::Tuple(vec![Type::Int, Type::Box(Box::new(Type::Int))]).is_copy());
    }

    #[test]
    fn mut_refs_are_invariant() {
        let a = Type::mut_ref([LVal::var("x")]);
        let b = Type::mut_ref([LVal::var("x"), LVal::var("y")]);
        assert!(!a.compatible(&b));
        assert!(!a.is_subtype_of(&b));
    }

    #[test]
    fn shared_refs_widen_by_root() {
        let a = Type::shared_ref([LVal::var("x")]);
        let b = Type::shared_ref([LVal::var("x"), LVal::var("y")]);
        assert!(a.is_subtype_of(&b));
        assert!(a.compatible(&b));
    }
}
