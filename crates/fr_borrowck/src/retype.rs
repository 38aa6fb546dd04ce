//! Rewriting the type stored for an l-val's root variable after a write (or
//! a move, which is typed as a write of `Undefined`).
//!
//! A path made only of `Field` and `Box`-`Deref` steps is owned storage: the
//! new type is spliced into the enclosing `Tuple`/`Box` and the result is
//! written back under the same variable. A `Deref` through a `Ref`, though,
//! doesn't own its pointee — the reference's own type records only *which*
//! l-val(s) it may point to, not their type — so the remainder of the path is
//! redirected onto the (necessarily singleton, for a write) referent instead.

use fr_syntax::{CheckErrorKind, FrError, LVal, PathElem, Result, Span};
use fr_types::{Environment, Mutability, Type};

/// Rewrite the type reached by following `lv`'s path to `new_ty`, returning
/// the environment with every root variable touched (possibly more than one,
/// if the path redirects through a reference) updated accordingly.
pub fn retype_lval(env: &Environment, lv: &LVal, new_ty: Type, span: Span) -> Result<Environment> {
    retype_var(env, &lv.var, lv.path.elems(), new_ty, span)
}

fn retype_var(env: &Environment, var: &str, elems: &[PathElem], new_ty: Type, span: Span) -> Result<Environment> {
    let (root_ty, _) = env
        .lookup(var)
        .cloned()
        .ok_or_else(|| undeclared(var, span))?;
    let (rebuilt, env2) = rebuild(env.clone(), root_ty, elems, new_ty, span)?;
    Ok(env2.update(var, rebuilt))
}

/// Returns the type to splice in at this position, plus the environment
/// (possibly touched by a `Ref` redirect along the way).
fn rebuild(env: Environment, cur: Type, elems: &[PathElem], new_ty: Type, span: Span) -> Result<(Type, Environment)> {
    let Some((head, rest)) = elems.split_first() else {
        return Ok((new_ty, env));
    };
    match (*head, cur) {
        (PathElem::Deref, Type::Box(inner)) => {
            let (rebuilt_inner, env2) = rebuild(env, *inner, rest, new_ty, span)?;
            Ok((Type::Box(Box::new(rebuilt_inner)), env2))
        }
        (
            PathElem::Deref,
            Type::Ref {
                mutability: Mutability::Mut,
                refs,
            },
        ) => {
            if refs.len() != 1 {
                return Err(FrError::check(
                    span,
                    CheckErrorKind::BorrowConflict,
                    "write through a mutable reference requires a singleton referent",
                ));
            }
            let referent = refs.iter().next().unwrap().clone();
            let mut redirected = referent.path.elems().to_vec();
            redirected.extend_from_slice(rest);
            let env2 = retype_var(&env, &referent.var, &redirected, new_ty, span)?;
            Ok((
                Type::Ref {
                    mutability: Mutability::Mut,
                    refs,
                },
                env2,
            ))
        }
        (PathElem::Deref, Type::Ref { mutability: Mutability::Shared, .. }) => Err(FrError::check(
            span,
            CheckErrorKind::BorrowConflict,
            "cannot write through a shared reference",
        )),
        (PathElem::Deref, other) => Err(FrError::check(
            span,
            CheckErrorKind::BadDereference,
            format!("cannot dereference a value of type {other}"),
        )),
        (PathElem::Field(i), Type::Tuple(mut fields)) => {
            if i >= fields.len() {
                return Err(FrError::check(
                    span,
                    CheckErrorKind::InvalidIndex,
                    format!("tuple has no field {i}"),
                ));
            }
            let slot = std::mem::replace(&mut fields[i], Type::Unit);
            let (rebuilt, env2) = rebuild(env, slot, rest, new_ty, span)?;
            fields[i] = rebuilt;
            Ok((Type::Tuple(fields), env2))
        }
        (PathElem::Field(i), other) => Err(FrError::check(
            span,
            CheckErrorKind::InvalidIndex,
            format!("cannot project field {i} out of a value of type {other}"),
        )),
    }
}

fn undeclared(name: &str, span: Span) -> FrError {
    FrError::check(
        span,
        CheckErrorKind::UndeclaredVariable,
        format!("undeclared variable `{name}`"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_syntax::{Lifetime, LifetimeArena};

    fn root() -> Lifetime {
        LifetimeArena::new().root()
    }

    #[test]
    fn strong_update_replaces_the_whole_type() {
        let env = Environment::empty().declare("x", Type::Int, root());
        let env = retype_lval(&env, &LVal::var("x"), Type::Box(Box::new(Type::Int)), Span::DUMMY).unwrap();
        assert_eq!(env.lookup("x").unwrap().0, Type::Box(Box::new(Type::Int)));
    }

    #[test]
    fn field_write_splices_into_the_tuple() {
        let env = Environment::empty().declare("x", Type::Tuple(vec![Type::Int, Type::Int]), root());
        let lv = LVal::var("x").field(1);
        let env = retype_lval(&env, &lv, Type::Undefined, Span::DUMMY).unwrap();
        assert_eq!(
            env.lookup("x").unwrap().0,
            Type::Tuple(vec![Type::Int, Type::Undefined])
        );
    }

    #[test]
    fn deref_through_mut_ref_redirects_to_the_referent() {
        let env = Environment::empty()
            .declare("x", Type::Int, root())
            .declare("p", Type::mut_ref([LVal::var("x")]), root());
        let lv = LVal::var("p").deref();
        let env = retype_lval(&env, &lv, Type::Int, Span::DUMMY).unwrap();
        assert_eq!(env.lookup("x").unwrap().0, Type::Int);
        assert_eq!(env.lookup("p").unwrap().0, Type::mut_ref([LVal::var("x")]));
    }

    #[test]
    fn deref_through_shared_ref_is_rejected() {
        let env = Environment::empty()
            .declare("x", Type::Int, root())
            .declare("p", Type::shared_ref([LVal::var("x")]), root());
        let lv = LVal::var("p").deref();
        let err = retype_lval(&env, &lv, Type::Int, Span::DUMMY).unwrap_err();
        assert_eq!(err.kind, fr_syntax::ErrorKind::Check(CheckErrorKind::BorrowConflict));
    }
}
