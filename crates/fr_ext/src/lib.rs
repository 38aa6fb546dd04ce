//! The pluggable extensions that turn the core calculus into the full
//! surface language: `if`/`else`, tuples, and function
//! declarations/calls. Each extension is a pair of independent handlers —
//! one implementing `fr_borrowck::Extension`, one implementing
//! `fr_semantics::ReduceExt` — registered in the same order on both the
//! checker and the reducer so `TermKind::Ext` dispatch agrees between them.

pub mod functions;
pub mod if_else;
pub mod program;
pub mod tuple;

pub use functions::{FnDecl, FunctionsExt, FunctionsReduce, TypeAnnotation};
pub use if_else::{IfElseExt, IfElseReduce};
pub use program::Program;
pub use tuple::{TupleExt, TupleReduce};

use fr_borrowck::{Checker, Extension};
use fr_semantics::{Thread, ReduceExt};
use fr_syntax::{LifetimeArena, Result};
use fr_types::Type;

/// Type-check a whole [`Program`]: validate every function declaration's
/// body once, then check `program.body` with the standard extension set
/// (if/else, tuples, calls) registered.
pub fn check_program(arena: &LifetimeArena, program: &Program) -> Result<Type> {
    let mut checker = Checker::new(arena);
    let functions = FunctionsExt::new(&mut checker, program.fns.clone())?;
    let extensions: Vec<Box<dyn Extension>> = vec![Box::new(IfElseExt), Box::new(TupleExt), Box::new(functions)];
    let mut checker = Checker::with_extensions(arena, extensions);
    let root = checker.root();
    let (ty, _env) = checker.check(&fr_types::Environment::empty(), root, &program.body)?;
    Ok(ty)
}

/// Execute a whole [`Program`] with the standard reducer-side extension set.
pub fn execute_program(
    arena: &LifetimeArena,
    program: Program,
    fuel: u64,
) -> Result<(fr_store::MachineState, fr_syntax::Value)> {
    let reducers: Vec<Box<dyn ReduceExt>> = vec![
        Box::new(IfElseReduce),
        Box::new(TupleReduce),
        Box::new(FunctionsReduce::new(&program.fns)),
    ];
    fr_semantics::execute_with_extensions(arena, program.body, reducers, fuel)
}

/// The standard checker-side extension set (if/else and tuples; functions
/// are omitted since they require declaration-time validation and so can
/// only be constructed through [`FunctionsExt::new`]).
pub fn standard_check_extensions() -> Vec<Box<dyn Extension>> {
    vec![Box::new(IfElseExt), Box::new(TupleExt)]
}

/// The standard reducer-side extension set, excluding function calls (see
/// [`standard_check_extensions`]).
pub fn standard_reduce_extensions() -> Vec<Box<dyn ReduceExt>> {
    vec![Box::new(IfElseReduce), Box::new(TupleReduce)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_syntax::{AccessKind, ExtTerm, LVal, Span, Term, TermKind};

    fn t(kind: TermKind) -> Term {
        Term::new(Span::DUMMY, kind)
    }

    #[test]
    fn calls_a_reborrowing_function() {
        // fn reborrow<'a>(x: &'a mut int) -> &'a mut int { x }
        // { let mut x = 1; let mut y = reborrow::<'a>(&mut x); *y = 2; *y }
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let decl = FnDecl {
            name: "reborrow".into(),
            lifetime_params: vec!["'a".into()],
            params: vec![(
                "x".into(),
                TypeAnnotation::Ref {
                    mutable: true,
                    lifetime: 0,
                    pointee: Box::new(TypeAnnotation::Int),
                },
            )],
            ret: TypeAnnotation::Ref {
                mutable: true,
                lifetime: 0,
                pointee: Box::new(TypeAnnotation::Int),
            },
            body: t(TermKind::Access {
                kind: AccessKind::Move,
                lval: LVal::var("x"),
            }),
            span: Span::DUMMY,
        };

        let outer = arena.fresh_within(root);
        let body = t(TermKind::Block {
            lifetime: outer,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(1))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::Ext(ExtTerm::Call {
                        name: "reborrow".into(),
                        lifetime_args: 1,
                        args: vec![t(TermKind::Borrow {
                            mutable: true,
                            lval: LVal::var("x"),
                        })],
                    }))),
                }),
                t(TermKind::Assign {
                    target: LVal::var("y").deref(),
                    value: Box::new(t(TermKind::IntLit(2))),
                }),
                t(TermKind::Access {
                    kind: AccessKind::Copy,
                    lval: LVal::var("y").deref(),
                }),
            ],
        });
        let program = Program {
            fns: vec![decl],
            body,
            span: Span::DUMMY,
        };

        let ty = check_program(&arena, &program).unwrap();
        assert_eq!(ty, Type::Int);
        let (_, value) = execute_program(&arena, program, fr_semantics::DEFAULT_FUEL).unwrap();
        assert_eq!(value, fr_syntax::Value::Int(2));
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let decl = FnDecl {
            name: "identity".into(),
            lifetime_params: vec![],
            params: vec![("x".into(), TypeAnnotation::Int)],
            ret: TypeAnnotation::Int,
            body: t(TermKind::Access {
                kind: AccessKind::Copy,
                lval: LVal::var("x"),
            }),
            span: Span::DUMMY,
        };
        let outer = arena.fresh_within(root);
        let body = t(TermKind::Block {
            lifetime: outer,
            body: vec![t(TermKind::Ext(ExtTerm::Call {
                name: "identity".into(),
                lifetime_args: 0,
                args: vec![],
            }))],
        });
        let program = Program {
            fns: vec![decl],
            body,
            span: Span::DUMMY,
        };
        let err = check_program(&arena, &program).unwrap_err();
        assert_eq!(err.kind, fr_syntax::ErrorKind::Check(fr_syntax::CheckErrorKind::TypeMismatch));
    }

    #[test]
    fn calling_an_undeclared_function_is_rejected() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let body = t(TermKind::Block {
            lifetime: outer,
            body: vec![t(TermKind::Ext(ExtTerm::Call {
                name: "missing".into(),
                lifetime_args: 0,
                args: vec![],
            }))],
        });
        let program = Program {
            fns: vec![],
            body,
            span: Span::DUMMY,
        };
        let err = check_program(&arena, &program).unwrap_err();
        assert_eq!(
            err.kind,
            fr_syntax::ErrorKind::Check(fr_syntax::CheckErrorKind::UndeclaredVariable)
        );
    }
}
