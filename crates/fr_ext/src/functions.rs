//! The function-declaration extension: top-level function declarations
//! with explicit lifetime parameters and a return type, called
//! through `name::<'a,...>(arg1, ..., argn)`.
//!
//! A function's body is type-checked exactly once, against a placeholder
//! environment that stands in for "whatever the caller eventually passes":
//! each reference-typed parameter gets a synthetic l-val (`$argN`) as its
//! sole referent, declared in the placeholder environment with the
//! parameter's annotated pointee type. Call sites never re-check the body;
//! they only verify each argument's derived type has the right shape
//! (mutability) and then thread the *real* referent sets of any reference
//! arguments through to the return type, keyed by which declared lifetime
//! parameter ties a parameter to the result (the same role a lifetime
//! parameter plays in `fn reborrow<'a>(x: &'a mut int) -> &'a mut int`).
//! This is a deliberate simplification of full outlives-bound checking,
//! which the core grammar has no syntax to express in the first place (see
//! `DESIGN.md`).

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use fr_borrowck::Checker;
use fr_semantics::Thread;
use fr_syntax::{CheckErrorKind, ExtTerm, FrError, LVal, Lifetime, Result, Span, Term};
use fr_types::{Environment, Mutability, Type};

/// A function parameter or return type as written in source. Unlike
/// [`Type`], this can name a lifetime parameter (by index into the
/// declaration's `lifetime_params`) instead of a concrete l-val set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeAnnotation {
    Int,
    Unit,
    Box(Box<TypeAnnotation>),
    Ref {
        mutable: bool,
        lifetime: usize,
        pointee: Box<TypeAnnotation>,
    },
    Tuple(Vec<TypeAnnotation>),
}

#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub lifetime_params: Vec<String>,
    pub params: Vec<(String, TypeAnnotation)>,
    pub ret: TypeAnnotation,
    pub body: Term,
    pub span: Span,
}

/// The l-val set bound to a declared lifetime parameter at some binding
/// site: the synthetic placeholder while validating a declaration's own
/// body, or the caller's real referents at a call site.
type LifetimeBinding = HashMap<usize, BTreeSet<LVal>>;

/// Instantiate an annotation that is guaranteed not to contain `Ref` at any
/// depth (a reference's pointee type, or a non-reference parameter/return
/// type). A nested `Ref` (`&'a &'b int`) is outside this extension's scope;
/// encountering one is a checker error, not a panic.
fn instantiate_no_ref(ann: &TypeAnnotation, span: Span) -> Result<Type> {
    match ann {
        TypeAnnotation::Int => Ok(Type::Int),
        TypeAnnotation::Unit => Ok(Type::Unit),
        TypeAnnotation::Box(inner) => Ok(Type::Box(Box::new(instantiate_no_ref(inner, span)?))),
        TypeAnnotation::Tuple(elems) => Ok(Type::Tuple(
            elems.iter().map(|e| instantiate_no_ref(e, span)).collect::<Result<Vec<_>>>()?,
        )),
        TypeAnnotation::Ref { .. } => Err(FrError::check(
            span,
            CheckErrorKind::TypeMismatch,
            "nested reference types in function signatures are not supported",
        )),
    }
}

/// Build the declared type for a top-level parameter/return annotation,
/// using `binding` to resolve a `Ref`'s lifetime parameter to an l-val set.
fn instantiate(ann: &TypeAnnotation, binding: &LifetimeBinding, span: Span) -> Result<Type> {
    match ann {
        TypeAnnotation::Ref { mutable, lifetime, .. } => {
            let refs = binding.get(lifetime).cloned().unwrap_or_default();
            Ok(Type::Ref {
                mutability: if *mutable { Mutability::Mut } else { Mutability::Shared },
                refs,
            })
        }
        other => instantiate_no_ref(other, span),
    }
}

fn placeholder_lval(index: usize) -> LVal {
    LVal::var(format!("$arg{index}"))
}

/// The lifetime-parameter -> l-val-set binding induced by a parameter list,
/// using `refs_for` to turn a reference-typed parameter's index into its
/// referent set.
fn lifetime_binding(params: &[(String, TypeAnnotation)], refs_for: impl Fn(usize) -> BTreeSet<LVal>) -> LifetimeBinding {
    let mut binding: LifetimeBinding = HashMap::new();
    for (i, (_, ann)) in params.iter().enumerate() {
        if let TypeAnnotation::Ref { lifetime, .. } = ann {
            binding.entry(*lifetime).or_default().extend(refs_for(i));
        }
    }
    binding
}

/// Validate `decl`'s body once, against a placeholder environment standing
/// in for whatever a caller eventually passes.
fn validate_decl(checker: &mut Checker, decl: &FnDecl) -> Result<()> {
    let binding = lifetime_binding(&decl.params, |i| [placeholder_lval(i)].into_iter().collect());
    let root = checker.root();
    let mut env = Environment::empty();
    for (i, (name, ann)) in decl.params.iter().enumerate() {
        if let TypeAnnotation::Ref { pointee, .. } = ann {
            let pointee_ty = instantiate_no_ref(pointee, decl.span)?;
            env = env.declare(placeholder_lval(i).var, pointee_ty, root);
        }
        let param_ty = instantiate(ann, &binding, decl.span)?;
        env = env.declare(name.clone(), param_ty, root);
    }
    let (body_ty, _) = checker.check(&env, root, &decl.body)?;
    let expected_ret = instantiate(&decl.ret, &binding, decl.span)?;
    if !body_ty.compatible(&expected_ret) {
        return Err(FrError::check(
            decl.span,
            CheckErrorKind::TypeMismatch,
            format!(
                "function `{}` is declared to return {expected_ret} but its body has type {body_ty}",
                decl.name
            ),
        ));
    }
    Ok(())
}

/// The checker-side half of the extension: validates every declaration's
/// body up front, then type-checks call sites against the validated
/// signatures.
pub struct FunctionsExt {
    decls: HashMap<String, FnDecl>,
}

impl FunctionsExt {
    pub fn new(checker: &mut Checker, fns: Vec<FnDecl>) -> Result<Self> {
        let mut decls = HashMap::new();
        for decl in fns {
            log::debug!("checking declaration of `{}`", decl.name);
            validate_decl(checker, &decl)?;
            decls.insert(decl.name.clone(), decl);
        }
        Ok(FunctionsExt { decls })
    }
}

impl fr_borrowck::Extension for FunctionsExt {
    fn try_check(
        &self,
        checker: &mut Checker,
        env: &Environment,
        lifetime: Lifetime,
        ext: &ExtTerm,
        span: Span,
    ) -> Option<Result<(Type, Environment)>> {
        let ExtTerm::Call { name, lifetime_args, args } = ext else {
            return None;
        };
        Some(self.check_call(checker, env, lifetime, name, *lifetime_args, args, span))
    }
}

impl FunctionsExt {
    fn check_call(
        &self,
        checker: &mut Checker,
        env: &Environment,
        lifetime: Lifetime,
        name: &str,
        lifetime_args: usize,
        args: &[Term],
        span: Span,
    ) -> Result<(Type, Environment)> {
        let decl = self
            .decls
            .get(name)
            .ok_or_else(|| FrError::check(span, CheckErrorKind::UndeclaredVariable, format!("undeclared function `{name}`")))?;
        if lifetime_args != 0 && lifetime_args != decl.lifetime_params.len() {
            return Err(FrError::check(
                span,
                CheckErrorKind::TypeMismatch,
                format!("`{name}` takes {} lifetime argument(s), {lifetime_args} given", decl.lifetime_params.len()),
            ));
        }
        if args.len() != decl.params.len() {
            return Err(FrError::check(
                span,
                CheckErrorKind::TypeMismatch,
                format!("`{name}` takes {} argument(s), {} given", decl.params.len(), args.len()),
            ));
        }
        log::debug!("checking call to `{name}`");

        let mut cur_env = env.clone();
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            let (ty, next_env) = checker.check(&cur_env, lifetime, arg)?;
            cur_env = next_env;
            arg_tys.push(ty);
        }

        let mut binding: LifetimeBinding = HashMap::new();
        for (i, ((_, ann), arg_ty)) in decl.params.iter().zip(&arg_tys).enumerate() {
            match (ann, arg_ty) {
                (TypeAnnotation::Ref { mutable, lifetime, .. }, Type::Ref { mutability, refs }) => {
                    let wants_mut = *mutable;
                    let is_mut = *mutability == Mutability::Mut;
                    if wants_mut != is_mut {
                        return Err(FrError::check(
                            span,
                            CheckErrorKind::TypeMismatch,
                            format!("argument {i} to `{name}` has the wrong reference mutability"),
                        ));
                    }
                    binding.entry(*lifetime).or_default().extend(refs.iter().cloned());
                }
                (TypeAnnotation::Ref { .. }, other) => {
                    return Err(FrError::check(
                        span,
                        CheckErrorKind::TypeMismatch,
                        format!("argument {i} to `{name}` expected a reference, found {other}"),
                    ));
                }
                (other_ann, arg_ty) => {
                    let expected = instantiate_no_ref(other_ann, span)?;
                    if !arg_ty.compatible(&expected) {
                        return Err(FrError::check(
                            span,
                            CheckErrorKind::TypeMismatch,
                            format!("argument {i} to `{name}` has type {arg_ty}, expected {expected}"),
                        ));
                    }
                }
            }
        }

        let ret_ty = instantiate(&decl.ret, &binding, span)?;
        Ok((ret_ty, cur_env))
    }
}

/// The semantics-side half: executes a call by allocating each argument
/// value into a fresh scope, binding it to the parameter name, evaluating
/// the body in that scope, then tearing the scope down exactly as `Block`
/// does.
pub struct FunctionsReduce {
    decls: Rc<HashMap<String, FnDecl>>,
}

impl FunctionsReduce {
    pub fn new(fns: &[FnDecl]) -> Self {
        let decls = fns.iter().map(|d| (d.name.clone(), d.clone())).collect();
        FunctionsReduce { decls: Rc::new(decls) }
    }
}

impl fr_semantics::ReduceExt for FunctionsReduce {
    fn try_step(&self, thread: &mut Thread, ext: &ExtTerm, span: Span) -> Option<Result<fr_syntax::Value>> {
        let ExtTerm::Call { name, args, .. } = ext else {
            return None;
        };
        Some(self.step_call(thread, name, args, span))
    }
}

impl FunctionsReduce {
    fn step_call(&self, thread: &mut Thread, name: &str, args: &[Term], span: Span) -> Result<fr_syntax::Value> {
        let decl = self
            .decls
            .get(name)
            .ok_or_else(|| FrError::semantics(span, fr_syntax::SemErrorKind::Stuck, format!("call to undeclared function `{name}`")))?
            .clone();

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(thread.eval_nested(arg.clone())?);
        }

        log::trace!("calling `{name}`");
        let call_scope = thread.fresh_child(thread.scope());
        let saved_frame = thread.state.frame.clone();
        thread.enter_scope(call_scope);
        thread.state.frame = fr_store::Frame::new();
        for ((param_name, _), value) in decl.params.iter().zip(arg_values) {
            let addr = thread.state.store.allocate(call_scope, value);
            thread.state.frame.bind(param_name.clone(), addr);
        }

        let result = thread.eval_nested(decl.body.clone());

        thread.state.frame = saved_frame;
        thread.exit_scope();
        thread.state.store.drop_lifetime(call_scope, span)?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_borrowck::Checker;
    use fr_syntax::{AccessKind, LifetimeArena, TermKind};

    fn t(kind: TermKind) -> Term {
        Term::new(Span::DUMMY, kind)
    }

    fn identity_decl() -> FnDecl {
        FnDecl {
            name: "identity".into(),
            lifetime_params: vec![],
            params: vec![("n".into(), TypeAnnotation::Int)],
            ret: TypeAnnotation::Int,
            body: t(TermKind::Access {
                kind: AccessKind::Copy,
                lval: LVal::var("n"),
            }),
            span: Span::DUMMY,
        }
    }

    #[test]
    fn declaration_whose_body_does_not_match_its_return_type_is_rejected() {
        let mut decl = identity_decl();
        decl.ret = TypeAnnotation::Unit;
        let arena = LifetimeArena::new();
        let mut checker = Checker::new(&arena);
        let err = FunctionsExt::new(&mut checker, vec![decl]).unwrap_err();
        assert_eq!(err.kind, fr_syntax::ErrorKind::Check(CheckErrorKind::TypeMismatch));
    }

    #[test]
    fn a_well_typed_declaration_validates() {
        let arena = LifetimeArena::new();
        let mut checker = Checker::new(&arena);
        assert!(FunctionsExt::new(&mut checker, vec![identity_decl()]).is_ok());
    }
}
