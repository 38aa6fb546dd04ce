//! `resolve(env, lv) -> Type`: walk an l-value's path elementwise over the
//! typing environment, discharging dereferences and field projections.

use fr_syntax::{CheckErrorKind, FrError, LVal, PathElem, Result, Span};

use crate::ty::{Mutability, Type};
use crate::Environment;

/// Resolve `lv`'s type in `env`. Dereferencing a `Box(T)` yields `T`;
/// dereferencing a borrow `&ᵐ {lv1..lvn}` requires every referent to resolve
/// to the same type (for mutable borrows, `S` must already be a singleton —
/// checked by the caller when the dereference occurs in a write position)
/// and yields that common type. Field `i` on a `Tuple` projects its `i`-th
/// component.
pub fn resolve(env: &Environment, lv: &LVal, span: Span) -> Result<Type> {
    let (mut ty, _) = env
        .lookup(&lv.var)
        .cloned()
        .ok_or_else(|| undeclared(&lv.var, span))?;
    for elem in lv.path.elems() {
        ty = step(env, ty, *elem, span)?;
    }
    Ok(ty)
}

fn step(env: &Environment, ty: Type, elem: PathElem, span: Span) -> Result<Type> {
    match (elem, ty) {
        (PathElem::Deref, Type::Box(inner)) => Ok(*inner),
        (PathElem::Deref, Type::Ref { refs, .. }) => {
            let mut pointee: Option<Type> = None;
            for referent in &refs {
                let candidate = resolve(env, referent, span)?;
                match &pointee {
                    None => pointee = Some(candidate),
                    Some(existing) if *existing == candidate => {}
                    Some(_) => {
                        return Err(FrError::check(
                            span,
                            CheckErrorKind::TypeMismatch,
                            "borrow's referents do not agree on a pointee type",
                        ))
                    }
                }
            }
            pointee.ok_or_else(|| {
                FrError::check(
                    span,
                    CheckErrorKind::BadDereference,
                    "borrow has no referents to dereference",
                )
            })
        }
        (PathElem::Deref, other) => Err(FrError::check(
            span,
            CheckErrorKind::BadDereference,
            format!("cannot dereference a value of type {other}"),
        )),
        (PathElem::Field(i), Type::Tuple(mut fields)) => {
            if i < fields.len() {
                Ok(fields.swap_remove(i))
            } else {
                Err(FrError::check(
                    span,
                    CheckErrorKind::InvalidIndex,
                    format!("tuple has no field {i}"),
                ))
            }
        }
        (PathElem::Field(i), other) => Err(FrError::check(
            span,
            CheckErrorKind::InvalidIndex,
            format!("cannot project field {i} out of a value of type {other}"),
        )),
    }
}

/// Whether `Type::Ref { mutability: Mut, .. }` at `lv` (after dereferencing
/// through any prefix) has a singleton referent set, required for a mutable
/// dereference used as a write target.
pub fn mut_borrow_is_singleton(ty: &Type) -> bool {
    matches!(ty, Type::Ref { mutability: Mutability::Mut, refs } if refs.len() == 1)
}

fn undeclared(name: &str, span: Span) -> FrError {
    FrError::check(
        span,
        CheckErrorKind::UndeclaredVariable,
        format!("undeclared variable `{name}`"),
    )
}
