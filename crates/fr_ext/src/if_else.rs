//! The `if`/`else` extension. The condition is always a
//! direct `==`/`!=` comparison of two l-values (there is no boolean type, so
//! no other condition form is expressible); both operands must resolve to
//! `Int` and are read with copy semantics. Both branches must type-check to
//! compatible (joinable) result types and environments.

use fr_borrowck::Checker;
use fr_semantics::Thread;
use fr_syntax::{CheckErrorKind, CompareOp, ExtTerm, FrError, Lifetime, SemErrorKind, Span};
use fr_types::{resolve, Environment, Type};

pub struct IfElseExt;

impl fr_borrowck::Extension for IfElseExt {
    fn try_check(
        &self,
        checker: &mut Checker,
        env: &Environment,
        lifetime: Lifetime,
        ext: &ExtTerm,
        span: Span,
    ) -> Option<Result<(Type, Environment), FrError>> {
        let ExtTerm::If {
            lhs,
            op: _,
            rhs,
            then_branch,
            else_branch,
        } = ext
        else {
            return None;
        };
        Some(check_if(checker, env, lifetime, lhs, rhs, then_branch, else_branch, span))
    }
}

fn check_if(
    checker: &mut Checker,
    env: &Environment,
    lifetime: Lifetime,
    lhs: &fr_syntax::LVal,
    rhs: &fr_syntax::LVal,
    then_branch: &fr_syntax::Term,
    else_branch: &fr_syntax::Term,
    span: Span,
) -> Result<(Type, Environment), FrError> {
    for operand in [lhs, rhs] {
        let ty = resolve::resolve(env, operand, span)?;
        if ty != Type::Int {
            return Err(FrError::check(
                span,
                CheckErrorKind::TypeMismatch,
                format!("`if` operand `{operand}` of type {ty} is not a comparable scalar"),
            ));
        }
    }
    log::debug!("checking if/else at {lifetime}");
    let (then_ty, then_env) = checker.check(env, lifetime, then_branch)?;
    let (else_ty, else_env) = checker.check(env, lifetime, else_branch)?;
    let result_ty = then_ty.join(&else_ty).ok_or_else(|| {
        FrError::check(
            span,
            CheckErrorKind::TypeMismatch,
            format!("`if` branches produce incompatible types {then_ty} and {else_ty}"),
        )
    })?;
    let result_env = then_env.join(&else_env).ok_or_else(|| {
        FrError::check(
            span,
            CheckErrorKind::TypeMismatch,
            "`if` branches leave incompatible environments behind",
        )
    })?;
    Ok((result_ty, result_env))
}

pub struct IfElseReduce;

impl fr_semantics::ReduceExt for IfElseReduce {
    fn try_step(
        &self,
        thread: &mut Thread,
        ext: &ExtTerm,
        span: Span,
    ) -> Option<Result<fr_syntax::Value, FrError>> {
        let ExtTerm::If {
            lhs,
            op,
            rhs,
            then_branch,
            else_branch,
        } = ext
        else {
            return None;
        };
        Some(step_if(thread, lhs, *op, rhs, then_branch, else_branch, span))
    }
}

fn step_if(
    thread: &mut Thread,
    lhs: &fr_syntax::LVal,
    op: CompareOp,
    rhs: &fr_syntax::LVal,
    then_branch: &fr_syntax::Term,
    else_branch: &fr_syntax::Term,
    span: Span,
) -> Result<fr_syntax::Value, FrError> {
    let lhs_val = thread.state.read_lval(lhs, span)?;
    let rhs_val = thread.state.read_lval(rhs, span)?;
    let (Some(l), Some(r)) = (lhs_val.as_int(), rhs_val.as_int()) else {
        return Err(FrError::semantics(
            span,
            SemErrorKind::Stuck,
            "`if` operands did not reduce to integers",
        ));
    };
    let taken = match op {
        CompareOp::Eq => l == r,
        CompareOp::Ne => l != r,
    };
    let branch = if taken { then_branch } else { else_branch };
    thread.eval_nested(branch.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_borrowck::check_with_extensions;
    use fr_semantics::execute_with_extensions;
    use fr_semantics::thread::DEFAULT_FUEL;
    use fr_syntax::{LVal, LifetimeArena, Term, TermKind, Value};

    fn t(kind: TermKind) -> Term {
        Term::new(Span::DUMMY, kind)
    }

    fn sample_program(arena: &mut LifetimeArena) -> Term {
        // { let mut x = 1; let mut y = 1; if x == y { 10 } else { 20 } }
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let then_lt = arena.fresh_within(outer);
        let else_lt = arena.fresh_within(outer);
        t(TermKind::Block {
            lifetime: outer,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(1))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::IntLit(1))),
                }),
                t(TermKind::Ext(ExtTerm::If {
                    lhs: LVal::var("x"),
                    op: CompareOp::Eq,
                    rhs: LVal::var("y"),
                    then_branch: Box::new(t(TermKind::Block {
                        lifetime: then_lt,
                        body: vec![t(TermKind::IntLit(10))],
                    })),
                    else_branch: Box::new(t(TermKind::Block {
                        lifetime: else_lt,
                        body: vec![t(TermKind::IntLit(20))],
                    })),
                })),
            ],
        })
    }

    #[test]
    fn checks_and_runs_the_taken_branch() {
        let mut arena = LifetimeArena::new();
        let program = sample_program(&mut arena);
        let ty = check_with_extensions(&arena, &program, vec![Box::new(IfElseExt)]).unwrap();
        assert_eq!(ty, Type::Int);
        let (_, value) =
            execute_with_extensions(&arena, program, vec![Box::new(IfElseReduce)], DEFAULT_FUEL).unwrap();
        assert_eq!(value, Value::Int(10));
    }

    #[test]
    fn non_int_operand_is_rejected() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let then_lt = arena.fresh_within(outer);
        let else_lt = arena.fresh_within(outer);
        let program = t(TermKind::Block {
            lifetime: outer,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::Box(Box::new(t(TermKind::IntLit(1)))))),
                }),
                t(TermKind::Ext(ExtTerm::If {
                    lhs: LVal::var("x"),
                    op: CompareOp::Eq,
                    rhs: LVal::var("x"),
                    then_branch: Box::new(t(TermKind::Block {
                        lifetime: then_lt,
                        body: vec![t(TermKind::IntLit(1))],
                    })),
                    else_branch: Box::new(t(TermKind::Block {
                        lifetime: else_lt,
                        body: vec![t(TermKind::IntLit(2))],
                    })),
                })),
            ],
        });
        let err = check_with_extensions(&arena, &program, vec![Box::new(IfElseExt)]).unwrap_err();
        assert_eq!(err.kind, fr_syntax::ErrorKind::Check(CheckErrorKind::TypeMismatch));
    }
}
