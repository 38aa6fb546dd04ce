//! The tuple extension: `(t1, ..., tn)` constructors.
//! `lv.i` field projection and the disjointness of sibling fields under a
//! mutable borrow are properties of [`fr_syntax::Path`]/[`fr_types::Type`]
//! that the core checker already implements (`fr_borrowck::borrow`); this
//! extension only owns the constructor term itself.

use fr_borrowck::Checker;
use fr_semantics::Thread;
use fr_syntax::{ExtTerm, FrError, Lifetime, Span, Value};
use fr_types::{Environment, Type};

pub struct TupleExt;

impl fr_borrowck::Extension for TupleExt {
    fn try_check(
        &self,
        checker: &mut Checker,
        env: &Environment,
        lifetime: Lifetime,
        ext: &ExtTerm,
        _span: Span,
    ) -> Option<Result<(Type, Environment), FrError>> {
        let ExtTerm::Tuple(elems) = ext else {
            return None;
        };
        Some(check_tuple(checker, env, lifetime, elems))
    }
}

fn check_tuple(
    checker: &mut Checker,
    env: &Environment,
    lifetime: Lifetime,
    elems: &[fr_syntax::Term],
) -> Result<(Type, Environment), FrError> {
    log::debug!("checking {}-tuple at {lifetime}", elems.len());
    let mut cur_env = env.clone();
    let mut tys = Vec::with_capacity(elems.len());
    for elem in elems {
        let (ty, next_env) = checker.check(&cur_env, lifetime, elem)?;
        tys.push(ty);
        cur_env = next_env;
    }
    Ok((Type::Tuple(tys), cur_env))
}

pub struct TupleReduce;

impl fr_semantics::ReduceExt for TupleReduce {
    fn try_step(&self, thread: &mut Thread, ext: &ExtTerm, _span: Span) -> Option<Result<Value, FrError>> {
        let ExtTerm::Tuple(elems) = ext else {
            return None;
        };
        Some(step_tuple(thread, elems))
    }
}

fn step_tuple(thread: &mut Thread, elems: &[fr_syntax::Term]) -> Result<Value, FrError> {
    let mut values = Vec::with_capacity(elems.len());
    for elem in elems {
        values.push(thread.eval_nested(elem.clone())?);
    }
    Ok(Value::Tuple(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_borrowck::check_with_extensions;
    use fr_semantics::execute_with_extensions;
    use fr_semantics::thread::DEFAULT_FUEL;
    use fr_syntax::{AccessKind, LVal, LifetimeArena, Term, TermKind};

    fn t(kind: TermKind) -> Term {
        Term::new(Span::DUMMY, kind)
    }

    #[test]
    fn seed_6_disjoint_tuple_field_borrow_checks_and_runs() {
        // { let mut x = (1,2); let mut y = &mut x.0; x.1 }
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let program = t(TermKind::Block {
            lifetime: outer,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::Ext(ExtTerm::Tuple(vec![
                        t(TermKind::IntLit(1)),
                        t(TermKind::IntLit(2)),
                    ])))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::Borrow {
                        mutable: true,
                        lval: LVal::var("x").field(0),
                    })),
                }),
                t(TermKind::Access {
                    kind: AccessKind::Copy,
                    lval: LVal::var("x").field(1),
                }),
            ],
        });
        let ty = check_with_extensions(&arena, &program, vec![Box::new(TupleExt)]).unwrap();
        assert_eq!(ty, Type::Int);
        let (_, value) =
            execute_with_extensions(&arena, program, vec![Box::new(TupleReduce)], DEFAULT_FUEL).unwrap();
        assert_eq!(value, Value::Int(2));
    }

    #[test]
    fn seed_6_borrowing_the_same_field_twice_conflicts() {
        // Projecting x.0 again while y already borrows it mutably is rejected.
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let program = t(TermKind::Block {
            lifetime: outer,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::Ext(ExtTerm::Tuple(vec![
                        t(TermKind::IntLit(1)),
                        t(TermKind::IntLit(2)),
                    ])))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::Borrow {
                        mutable: true,
                        lval: LVal::var("x").field(0),
                    })),
                }),
                t(TermKind::Borrow {
                    mutable: false,
                    lval: LVal::var("x").field(0),
                }),
            ],
        });
        let err = check_with_extensions(&arena, &program, vec![Box::new(TupleExt)]).unwrap_err();
        assert_eq!(
            err.kind,
            fr_syntax::ErrorKind::Check(fr_syntax::CheckErrorKind::BorrowConflict)
        );
    }
}
