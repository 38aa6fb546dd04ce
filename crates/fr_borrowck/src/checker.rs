//! The core judgement `R ⊢ t : T ⊣ R'`: a deterministic,
//! syntax-directed derivation over [`Term`]. [`Checker::check`] is the single
//! entry point every rule (including extensions) recurses through.

use fr_syntax::{
    AccessKind, CheckErrorKind, FrError, Lifetime, LifetimeArena, LVal, Result, Span, Term, TermKind,
};
use fr_types::{resolve, Environment, Type};

use crate::borrow::{escapes, is_borrowed, is_mutably_borrowed, locals_at};
use crate::extension::Extension;
use crate::retype::retype_lval;

/// Owns the lifetime tree the program was parsed against and the registered
/// extension handlers. Mutable only because extensions (function calls) mint
/// fresh lifetimes for each invocation, mirroring `fr_semantics::Thread`.
pub struct Checker {
    arena: LifetimeArena,
    extensions: Vec<Box<dyn Extension>>,
}

impl Checker {
    pub fn new(arena: &LifetimeArena) -> Self {
        Checker::with_extensions(arena, Vec::new())
    }

    pub fn with_extensions(arena: &LifetimeArena, extensions: Vec<Box<dyn Extension>>) -> Self {
        Checker {
            arena: arena.clone(),
            extensions,
        }
    }

    pub fn root(&self) -> Lifetime {
        self.arena.root()
    }

    pub fn outlives(&self, a: Lifetime, b: Lifetime) -> bool {
        self.arena.outlives(a, b)
    }

    /// Mint a fresh lifetime nested inside `parent`. Used by the function-call
    /// extension to instantiate a callee's lifetime parameters.
    pub fn fresh_child(&mut self, parent: Lifetime) -> Lifetime {
        self.arena.fresh_within(parent)
    }

    /// Derive `R ⊢ t : T ⊣ R'`, returning `(T, R')`.
    pub fn check(&mut self, env: &Environment, lifetime: Lifetime, term: &Term) -> Result<(Type, Environment)> {
        let span = term.span;
        match &term.kind {
            TermKind::IntLit(_) => Ok((Type::Int, env.clone())),
            TermKind::Let { name, init } => self.check_let(env, lifetime, name, init),
            TermKind::Assign { target, value } => self.check_assign(env, lifetime, target, value, span),
            TermKind::Access { kind, lval } => self.check_access(env, *kind, lval, span),
            TermKind::Borrow { mutable, lval } => self.check_borrow(env, *mutable, lval, span),
            TermKind::Box(inner) => {
                let (ty, env1) = self.check(env, lifetime, inner)?;
                Ok((Type::Box(Box::new(ty)), env1))
            }
            TermKind::Block { lifetime: inner, body } => self.check_block(env, *inner, body, span),
            TermKind::Ext(ext) => {
                let extensions = std::mem::take(&mut self.extensions);
                let mut outcome = None;
                for handler in &extensions {
                    if let Some(res) = handler.try_check(self, env, lifetime, ext, span) {
                        outcome = Some(res);
                        break;
                    }
                }
                self.extensions = extensions;
                outcome.unwrap_or_else(|| {
                    Err(FrError::check(
                        span,
                        CheckErrorKind::TypeMismatch,
                        "no extension handler registered for this term",
                    ))
                })
            }
        }
    }

    fn check_let(&mut self, env: &Environment, lifetime: Lifetime, name: &str, init: &Term) -> Result<(Type, Environment)> {
        let (ty, env1) = self.check(env, lifetime, init)?;
        if env1.declared_at(name, lifetime) {
            return Err(FrError::check(
                init.span,
                CheckErrorKind::Redeclaration,
                format!("`{name}` is already declared in this block"),
            ));
        }
        let env2 = env1.declare(name, ty, lifetime);
        Ok((Type::Unit, env2))
    }

    fn check_assign(
        &mut self,
        env: &Environment,
        lifetime: Lifetime,
        target: &LVal,
        value: &Term,
        span: Span,
    ) -> Result<(Type, Environment)> {
        let (rhs_ty, env1) = self.check(env, lifetime, value)?;
        if is_borrowed(&env1, target) {
            return Err(FrError::check(
                span,
                CheckErrorKind::AssignmentToBorrowed,
                format!("cannot assign to `{target}`: it is currently borrowed"),
            ));
        }
        let env2 = if target.path.is_empty() {
            // Strong update: the whole variable is replaced, so its previous
            // type (possibly `Undefined`, after a move) need not be
            // compatible with the incoming one.
            if env1.lookup(&target.var).is_none() {
                return Err(undeclared(&target.var, span));
            }
            env1.update(&target.var, rhs_ty.clone())
        } else {
            // Weak update: the storage may be aliased (through a reference)
            // or shared with sibling fields, so the new value must already
            // fit the existing shape.
            let lhs_ty = resolve::resolve(&env1, target, span)?;
            if !lhs_ty.compatible(&rhs_ty) {
                return Err(FrError::check(
                    span,
                    CheckErrorKind::TypeMismatch,
                    format!("cannot assign a value of type {rhs_ty} where {lhs_ty} is expected"),
                ));
            }
            retype_lval(&env1, target, rhs_ty.clone(), span)?
        };
        Ok((Type::Unit, env2))
    }

    fn check_access(&mut self, env: &Environment, kind: AccessKind, lval: &LVal, span: Span) -> Result<(Type, Environment)> {
        let ty = resolve::resolve(env, lval, span)?;
        if ty.is_undefined() {
            return Err(FrError::check(
                span,
                CheckErrorKind::UseOfMoved,
                format!("`{lval}` has already been moved"),
            ));
        }
        match kind {
            AccessKind::Copy => {
                if !ty.is_copy() {
                    return Err(FrError::check(
                        span,
                        CheckErrorKind::TypeMismatch,
                        format!("`{lval}` of type {ty} cannot be copied"),
                    ));
                }
                Ok((ty, env.clone()))
            }
            AccessKind::Move => {
                if ty.is_copy() {
                    return Ok((ty, env.clone()));
                }
                if is_borrowed(env, lval) {
                    return Err(FrError::check(
                        span,
                        CheckErrorKind::AssignmentToBorrowed,
                        format!("cannot move out of `{lval}`: it is currently borrowed"),
                    ));
                }
                let env2 = retype_lval(env, lval, Type::Undefined, span)?;
                Ok((ty, env2))
            }
            AccessKind::Unspecified => {
                let resolved_kind = if ty.is_copy() { AccessKind::Copy } else { AccessKind::Move };
                self.check_access(env, resolved_kind, lval, span)
            }
        }
    }

    fn check_borrow(&mut self, env: &Environment, mutable: bool, lval: &LVal, span: Span) -> Result<(Type, Environment)> {
        // Resolving confirms `lval` is typable (undeclared-variable,
        // bad-dereference and invalid-index all surface here).
        resolve::resolve(env, lval, span)?;
        if mutable {
            if is_borrowed(env, lval) {
                return Err(FrError::check(
                    span,
                    CheckErrorKind::BorrowConflict,
                    format!("cannot borrow `{lval}` as mutable: already borrowed"),
                ));
            }
            Ok((Type::mut_ref([lval.clone()]), env.clone()))
        } else {
            if is_mutably_borrowed(env, lval) {
                return Err(FrError::check(
                    span,
                    CheckErrorKind::BorrowConflict,
                    format!("cannot borrow `{lval}` as shared: already mutably borrowed"),
                ));
            }
            Ok((Type::shared_ref([lval.clone()]), env.clone()))
        }
    }

    fn check_block(&mut self, env: &Environment, lifetime: Lifetime, body: &[Term], span: Span) -> Result<(Type, Environment)> {
        log::debug!("checking block at {lifetime} ({} statements)", body.len());
        let mut cur_env = env.clone();
        let mut result_ty = Type::Unit;
        for stmt in body {
            let (ty, next_env) = self.check(&cur_env, lifetime, stmt)?;
            cur_env = next_env;
            result_ty = ty;
        }
        let locals = locals_at(&cur_env, lifetime);
        if escapes(&result_ty, &locals) {
            return Err(FrError::check(
                span,
                CheckErrorKind::LifetimeEscape,
                "block's result type names an l-val local to the block",
            ));
        }
        let stripped = cur_env.remove_all_in(lifetime);
        for (name, ty, _) in stripped.iter() {
            if escapes(ty, &locals) {
                return Err(FrError::check(
                    span,
                    CheckErrorKind::LifetimeEscape,
                    format!("`{name}`'s type names an l-val local to the exiting block"),
                ));
            }
        }
        log::trace!("block at {lifetime} checked as {result_ty}");
        Ok((result_ty, stripped))
    }
}

fn undeclared(name: &str, span: Span) -> FrError {
    FrError::check(
        span,
        CheckErrorKind::UndeclaredVariable,
        format!("undeclared variable `{name}`"),
    )
}

/// Type-check `term` from an empty environment under the arena's root
/// lifetime, with no extensions registered.
pub fn check(arena: &LifetimeArena, term: &Term) -> Result<Type> {
    check_with_extensions(arena, term, Vec::new())
}

/// As [`check`], but dispatching `TermKind::Ext` nodes to `extensions`.
pub fn check_with_extensions(arena: &LifetimeArena, term: &Term, extensions: Vec<Box<dyn Extension>>) -> Result<Type> {
    let mut checker = Checker::with_extensions(arena, extensions);
    let root = checker.root();
    let (ty, _env) = checker.check(&Environment::empty(), root, term)?;
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_syntax::Span;

    fn t(kind: TermKind) -> Term {
        Term::new(Span::DUMMY, kind)
    }

    fn block(lifetime: Lifetime, body: Vec<Term>) -> Term {
        t(TermKind::Block { lifetime, body })
    }

    #[test]
    fn seed_1_literal_block_checks_as_int() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = block(
            inner,
            vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(123))),
                }),
                t(TermKind::Access {
                    kind: AccessKind::Move,
                    lval: LVal::var("x"),
                }),
            ],
        );
        assert_eq!(check(&arena, &program).unwrap(), Type::Int);
    }

    #[test]
    fn seed_2_reference_reassigned_to_a_narrower_scope_escapes() {
        // { let mut x = 1; let mut y = &x; { let mut z = 1; y = &z; } }
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let inner = arena.fresh_within(outer);
        let program = block(
            outer,
            vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(1))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::Borrow {
                        mutable: false,
                        lval: LVal::var("x"),
                    })),
                }),
                block(
                    inner,
                    vec![
                        t(TermKind::Let {
                            name: "z".into(),
                            init: Box::new(t(TermKind::IntLit(1))),
                        }),
                        t(TermKind::Assign {
                            target: LVal::var("y"),
                            value: Box::new(t(TermKind::Borrow {
                                mutable: false,
                                lval: LVal::var("z"),
                            })),
                        }),
                    ],
                ),
            ],
        );
        let err = check(&arena, &program).unwrap_err();
        assert_eq!(err.kind, fr_syntax::ErrorKind::Check(CheckErrorKind::LifetimeEscape));
    }

    #[test]
    fn seed_4_box_moved_then_reassigned_then_dereferenced() {
        // { let mut x = box 0; { let mut y = x; x = box 1; } *x }
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let inner = arena.fresh_within(outer);
        let program = block(
            outer,
            vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::Box(Box::new(t(TermKind::IntLit(0)))))),
                }),
                block(
                    inner,
                    vec![
                        t(TermKind::Let {
                            name: "y".into(),
                            init: Box::new(t(TermKind::Access {
                                kind: AccessKind::Move,
                                lval: LVal::var("x"),
                            })),
                        }),
                        t(TermKind::Assign {
                            target: LVal::var("x"),
                            value: Box::new(t(TermKind::Box(Box::new(t(TermKind::IntLit(1)))))),
                        }),
                    ],
                ),
                t(TermKind::Access {
                    kind: AccessKind::Move,
                    lval: LVal::var("x").deref(),
                }),
            ],
        );
        assert_eq!(check(&arena, &program).unwrap(), Type::Int);
    }

    #[test]
    fn seed_5_reborrow_through_a_mutable_reference() {
        // { let mut x = 1; let mut y = &mut x; let mut z = &mut *y; *z = 123; *y }
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = block(
            inner,
            vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(1))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::Borrow {
                        mutable: true,
                        lval: LVal::var("x"),
                    })),
                }),
                t(TermKind::Let {
                    name: "z".into(),
                    init: Box::new(t(TermKind::Borrow {
                        mutable: true,
                        lval: LVal::var("y").deref(),
                    })),
                }),
                t(TermKind::Assign {
                    target: LVal::var("z").deref(),
                    value: Box::new(t(TermKind::IntLit(123))),
                }),
                t(TermKind::Access {
                    kind: AccessKind::Copy,
                    lval: LVal::var("y").deref(),
                }),
            ],
        );
        assert_eq!(check(&arena, &program).unwrap(), Type::Int);
    }

    #[test]
    fn use_of_moved_variable_is_rejected() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = block(
            inner,
            vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::Box(Box::new(t(TermKind::IntLit(0)))))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::Access {
                        kind: AccessKind::Move,
                        lval: LVal::var("x"),
                    })),
                }),
                t(TermKind::Access {
                    kind: AccessKind::Move,
                    lval: LVal::var("x"),
                }),
            ],
        );
        let err = check(&arena, &program).unwrap_err();
        assert_eq!(err.kind, fr_syntax::ErrorKind::Check(CheckErrorKind::UseOfMoved));
    }

    #[test]
    fn golden_environment_after_a_let_and_a_shared_borrow() {
        use expect_test::expect;

        let arena = LifetimeArena::new();
        let root = arena.root();
        let mut checker = Checker::new(&arena);

        let let_x = t(TermKind::Let {
            name: "x".into(),
            init: Box::new(t(TermKind::IntLit(1))),
        });
        let let_y = t(TermKind::Let {
            name: "y".into(),
            init: Box::new(t(TermKind::Borrow {
                mutable: false,
                lval: LVal::var("x"),
            })),
        });

        let (_, env1) = checker.check(&Environment::empty(), root, &let_x).unwrap();
        let (_, env2) = checker.check(&env1, root, &let_y).unwrap();

        expect!["{x: int @ 'static, y: &{x} @ 'static}"].assert_eq(&env2.to_string());
    }

    #[test]
    fn redeclaration_within_the_same_block_is_rejected() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = block(
            inner,
            vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(1))),
                }),
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(2))),
                }),
            ],
        );
        let err = check(&arena, &program).unwrap_err();
        assert_eq!(err.kind, fr_syntax::ErrorKind::Check(CheckErrorKind::Redeclaration));
    }

    #[test]
    fn shadowing_across_nested_blocks_is_allowed() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let outer = arena.fresh_within(root);
        let inner = arena.fresh_within(outer);
        let program = block(
            outer,
            vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(1))),
                }),
                block(
                    inner,
                    vec![t(TermKind::Let {
                        name: "x".into(),
                        init: Box::new(t(TermKind::Box(Box::new(t(TermKind::IntLit(2)))))),
                    })],
                ),
            ],
        );
        assert_eq!(check(&arena, &program).unwrap(), Type::Unit);
    }

    #[test]
    fn borrowing_one_tuple_field_does_not_conflict_with_a_sibling_field() {
        // Half of seed 6 (`let mut y = &mut x.0; x.1`): the Tuple constructor
        // itself lives in `fr_ext`, but the disjointness this relies on is a
        // property of `is_borrowed`/`LVal::conflicts_with` tested directly.
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let env = Environment::empty()
            .declare("x", Type::Tuple(vec![Type::Int, Type::Int]), root)
            .declare("y", Type::mut_ref([LVal::var("x").field(0)]), root);
        assert!(!is_borrowed(&env, &LVal::var("x").field(1)));
        assert!(is_borrowed(&env, &LVal::var("x").field(0)));
    }
}
