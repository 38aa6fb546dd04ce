//! Borrow tracking: "which currently-live bindings hold a reference whose
//! l-val set path-conflicts with a given target?". Answered by scanning the environment; there is no separate
//! borrow table, since a `Type::Ref`'s l-val set already records everything
//! a live borrow needs.

use fr_syntax::{Lifetime, LVal};
use fr_types::{Environment, Mutability, Type};

/// True iff some binding in `env` holds a reference whose referent set
/// path-conflicts with `target`. Used by `Assign`/`Move` to reject writing to
/// (or moving out from under) a borrowed l-val.
pub fn is_borrowed(env: &Environment, target: &LVal) -> bool {
    env.iter().any(|(_, ty, _)| match ty.referents() {
        Some(refs) => refs.iter().any(|r| r.conflicts_with(target)),
        None => false,
    })
}

/// True iff some binding in `env` holds a *mutable* reference whose referent
/// set path-conflicts with `target`. Used by `Borrow shared` to check that no
/// live exclusive borrow already covers the l-val.
pub fn is_mutably_borrowed(env: &Environment, target: &LVal) -> bool {
    env.iter().any(|(_, ty, _)| match ty {
        Type::Ref {
            mutability: Mutability::Mut,
            refs,
        } => refs.iter().any(|r| r.conflicts_with(target)),
        _ => false,
    })
}

/// Recursively check that `ty` does not name (through `Ref`, `Box`, or
/// `Tuple`) any l-val rooted at a name in `locals` — the escape check run
/// when a block's lifetime ends.
pub fn escapes(ty: &Type, locals: &std::collections::BTreeSet<&str>) -> bool {
    match ty {
        Type::Ref { refs, .. } => refs.iter().any(|lv| locals.contains(lv.var.as_str())),
        Type::Box(inner) => escapes(inner, locals),
        Type::Tuple(fields) => fields.iter().any(|f| escapes(f, locals)),
        Type::Int | Type::Unit | Type::Undefined => false,
    }
}

/// The set of variable names declared exactly at `lifetime`, used both to
/// build the escape-check set and to strip the environment on block exit.
pub fn locals_at(env: &Environment, lifetime: Lifetime) -> std::collections::BTreeSet<&str> {
    env.iter()
        .filter(|(_, _, lt)| *lt == lifetime)
        .map(|(name, _, _)| name)
        .collect()
}
