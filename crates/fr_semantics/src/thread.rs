//! The reducer: a single explicit-stack machine. `Thread::step` performs one
//! reduction; [`execute`] drives a fresh thread to completion. Both share
//! this machine, so the determinism property (big-step agrees with
//! small-step) holds by construction rather than by keeping two reducers in
//! sync by hand.

use fr_store::{Frame as StoreFrame, MachineState};
use fr_syntax::{
    AccessKind, ExtTerm, FrError, LVal, Lifetime, LifetimeArena, SemErrorKind, Span, Term, TermKind, Value,
};

/// Steps allowed before [`execute`] gives up and reports the program as
/// stuck. Well-typed programs in this language terminate in steps
/// proportional to term size; the budget only bites on the fuzz driver's
/// direct (unchecked) feeds to the semantics.
pub const DEFAULT_FUEL: u64 = 1_000_000;

/// Handles reduction of one [`ExtTerm`] variant. `fr_ext` implements this
/// once per extension (if/else, tuples, function calls) and registers the
/// implementations with [`Thread::with_extensions`] in order; the first
/// handler that recognises the term wins, mirroring the checker's
/// [`fr_borrowck::Extension`](../fr_borrowck) chaining.
pub trait ReduceExt {
    /// Attempt to reduce `ext` to a value. Return `None` if this handler
    /// does not own this variant, so the next registered handler can try.
    fn try_step(&self, thread: &mut Thread, ext: &ExtTerm, span: Span) -> Option<Result<Value, FrError>>;
}

/// Pending work to resume once the term currently under evaluation (the
/// "focus") has reduced to a value.
enum Pending {
    Let {
        name: String,
    },
    AssignValue {
        target: LVal,
        span: Span,
    },
    Box,
    BlockSeq {
        lifetime: Lifetime,
        remaining: std::vec::IntoIter<Term>,
        saved_frame: StoreFrame,
        span: Span,
    },
}

enum Focus {
    Term(Term),
    Value(Value),
}

/// One in-progress reduction: a machine state, a stack of frames describing
/// what to do once the current focus reduces to a value, and the stack of
/// enclosing block lifetimes (`let`/`box` allocate into the innermost one).
pub struct Thread {
    pub state: MachineState,
    arena: LifetimeArena,
    scopes: Vec<Lifetime>,
    frames: Vec<Pending>,
    focus: Option<Focus>,
    done: Option<Value>,
    reducers: Vec<Box<dyn ReduceExt>>,
}

impl Thread {
    pub fn new(arena: &LifetimeArena, term: Term) -> Self {
        Thread::with_extensions(arena, term, Vec::new())
    }

    pub fn with_extensions(arena: &LifetimeArena, term: Term, reducers: Vec<Box<dyn ReduceExt>>) -> Self {
        let arena = arena.clone();
        let root = arena.root();
        Thread {
            state: MachineState::new(),
            arena,
            scopes: vec![root],
            frames: Vec::new(),
            focus: Some(Focus::Term(term)),
            done: None,
            reducers,
        }
    }

    /// The root (global) lifetime, used by `box` allocations.
    pub fn root(&self) -> Lifetime {
        self.arena.root()
    }

    /// The lifetime of the block currently executing; `let`/`box` results
    /// get bound into the store at this scope.
    pub fn scope(&self) -> Lifetime {
        *self.scopes.last().unwrap_or(&self.arena.root())
    }

    /// Mint a fresh lifetime nested inside `parent`. Used by the function-
    /// call extension, which needs a scope per invocation that the checker
    /// (working ahead of time, over a differently-seeded arena) cannot have
    /// pre-assigned.
    pub fn fresh_child(&mut self, parent: Lifetime) -> Lifetime {
        self.arena.fresh_within(parent)
    }

    /// Push `lifetime` as the thread's active scope, so that subsequent
    /// `Let`/`Box` reductions (including ones run through [`Self::eval_nested`])
    /// allocate into it. Used by the function-call extension to give each
    /// invocation its own scope without a dedicated `Term::Block` wrapper.
    pub fn enter_scope(&mut self, lifetime: Lifetime) {
        self.scopes.push(lifetime);
    }

    /// Pop the innermost active scope pushed by [`Self::enter_scope`]. Does
    /// not drop any cells; the caller is responsible for calling
    /// `store.drop_lifetime` itself (mirroring `Block`'s own reduction).
    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    /// Reduce `term` to a value against this thread's current store and
    /// scope, without disturbing the enclosing reduction's frame stack.
    /// Extensions use this to evaluate their sub-terms (an `if`'s
    /// condition, a tuple's elements, a call's arguments and body).
    pub fn eval_nested(&mut self, term: Term) -> Result<Value, FrError> {
        let span = term.span;
        let state = std::mem::take(&mut self.state);
        let reducers = std::mem::take(&mut self.reducers);
        let mut inner = Thread {
            state,
            arena: self.arena.clone(),
            scopes: self.scopes.clone(),
            frames: Vec::new(),
            focus: Some(Focus::Term(term)),
            done: None,
            reducers,
        };
        let mut budget = DEFAULT_FUEL;
        let outcome = loop {
            match inner.step() {
                Ok(true) => {
                    if budget == 0 {
                        break Err(FrError::semantics(span, SemErrorKind::Stuck, "fuel exhausted"));
                    }
                    budget -= 1;
                }
                Ok(false) => {
                    break inner
                        .done
                        .take()
                        .ok_or_else(|| FrError::semantics(span, SemErrorKind::Stuck, "nested reduction produced no value"));
                }
                Err(e) => break Err(e),
            }
        };
        self.state = inner.state;
        self.reducers = inner.reducers;
        outcome
    }

    pub fn is_done(&self) -> bool {
        self.done.is_some()
    }

    /// Consume the thread, returning its final `(state, value)` pair once
    /// reduction has completed.
    pub fn finish(self) -> Option<(MachineState, Value)> {
        self.done.map(|v| (self.state, v))
    }

    /// Perform one reduction. Returns `false` once the thread has reached a
    /// final value (idempotent afterwards).
    pub fn step(&mut self) -> Result<bool, FrError> {
        if self.done.is_some() {
            return Ok(false);
        }
        match self.focus.take().expect("focus is populated while not done") {
            Focus::Term(term) => self.step_term(term),
            Focus::Value(value) => self.step_value(value),
        }
    }

    fn step_term(&mut self, term: Term) -> Result<bool, FrError> {
        let span = term.span;
        match term.kind {
            TermKind::IntLit(n) => {
                self.focus = Some(Focus::Value(Value::Int(n)));
            }
            TermKind::Let { name, init } => {
                self.frames.push(Pending::Let { name });
                self.focus = Some(Focus::Term(*init));
            }
            TermKind::Assign { target, value } => {
                self.frames.push(Pending::AssignValue { target, span });
                self.focus = Some(Focus::Term(*value));
            }
            TermKind::Access { kind, lval } => {
                let value = if kind == AccessKind::Move {
                    self.state.move_lval(&lval, span)?
                } else {
                    self.state.read_lval(&lval, span)?
                };
                self.focus = Some(Focus::Value(value));
            }
            TermKind::Borrow { lval, .. } => {
                // The checker tracks *which* l-values a reference covers;
                // the runtime value only needs the cell it points at.
                let addr = self.state.resolve_addr(&lval, span)?;
                self.focus = Some(Focus::Value(Value::borrow(addr)));
            }
            TermKind::Box(inner) => {
                self.frames.push(Pending::Box);
                self.focus = Some(Focus::Term(*inner));
            }
            TermKind::Block { lifetime, body } => {
                log::trace!("entering block at {lifetime}");
                let saved_frame = self.state.frame.clone();
                self.scopes.push(lifetime);
                let mut remaining = body.into_iter();
                match remaining.next() {
                    Some(first) => {
                        self.frames.push(Pending::BlockSeq {
                            lifetime,
                            remaining,
                            saved_frame,
                            span,
                        });
                        self.focus = Some(Focus::Term(first));
                    }
                    None => {
                        self.scopes.pop();
                        self.state.store.drop_lifetime(lifetime, span)?;
                        self.focus = Some(Focus::Value(Value::Unit));
                    }
                }
            }
            TermKind::Ext(ext) => {
                let reducers = std::mem::take(&mut self.reducers);
                let mut outcome = None;
                for r in &reducers {
                    if let Some(res) = r.try_step(self, &ext, span) {
                        outcome = Some(res);
                        break;
                    }
                }
                self.reducers = reducers;
                let value = match outcome {
                    Some(res) => res?,
                    None => {
                        return Err(FrError::semantics(
                            span,
                            SemErrorKind::Stuck,
                            "no extension handler registered for this term",
                        ))
                    }
                };
                self.focus = Some(Focus::Value(value));
            }
        }
        Ok(true)
    }

    fn step_value(&mut self, value: Value) -> Result<bool, FrError> {
        let Some(frame) = self.frames.pop() else {
            self.done = Some(value);
            return Ok(false);
        };
        match frame {
            Pending::Let { name } => {
                let addr = self.state.store.allocate(self.scope(), value);
                self.state.frame.bind(name, addr);
                self.focus = Some(Focus::Value(Value::Unit));
            }
            Pending::AssignValue { target, span } => {
                let addr = self.state.resolve_addr(&target, span)?;
                let old = self.state.store.write(addr, value, span)?;
                self.state.store.finalize(&old);
                self.focus = Some(Focus::Value(Value::Unit));
            }
            Pending::Box => {
                let addr = self.state.store.allocate(self.root(), value);
                self.focus = Some(Focus::Value(Value::owned(addr)));
            }
            Pending::BlockSeq {
                lifetime,
                mut remaining,
                saved_frame,
                span,
            } => match remaining.next() {
                Some(next) => {
                    self.frames.push(Pending::BlockSeq {
                        lifetime,
                        remaining,
                        saved_frame,
                        span,
                    });
                    self.focus = Some(Focus::Term(next));
                }
                None => {
                    self.state.frame = saved_frame;
                    self.scopes.pop();
                    self.state.store.drop_lifetime(lifetime, span)?;
                    log::trace!("dropped block at {lifetime}");
                    self.focus = Some(Focus::Value(value));
                }
            },
        }
        Ok(true)
    }
}

/// Reduce `term` to a value using [`DEFAULT_FUEL`] and no extensions.
pub fn execute(arena: &LifetimeArena, term: Term) -> Result<(MachineState, Value), FrError> {
    execute_with_fuel(arena, term, DEFAULT_FUEL)
}

/// Reduce `term` to a value, failing with a `stuck` error if more than
/// `fuel` small steps are taken.
pub fn execute_with_fuel(arena: &LifetimeArena, term: Term, fuel: u64) -> Result<(MachineState, Value), FrError> {
    drive(Thread::new(arena, term), fuel)
}

/// Reduce `term` to a value, dispatching `TermKind::Ext` nodes to
/// `reducers` (see [`ReduceExt`]).
pub fn execute_with_extensions(
    arena: &LifetimeArena,
    term: Term,
    reducers: Vec<Box<dyn ReduceExt>>,
    fuel: u64,
) -> Result<(MachineState, Value), FrError> {
    drive(Thread::with_extensions(arena, term, reducers), fuel)
}

fn drive(mut thread: Thread, fuel: u64) -> Result<(MachineState, Value), FrError> {
    let span = thread
        .focus
        .as_ref()
        .map(|f| match f {
            Focus::Term(t) => t.span,
            Focus::Value(_) => Span::DUMMY,
        })
        .unwrap_or(Span::DUMMY);
    let mut budget = fuel;
    while thread.step()? {
        if budget == 0 {
            return Err(FrError::semantics(span, SemErrorKind::Stuck, "fuel exhausted"));
        }
        budget -= 1;
    }
    thread
        .finish()
        .ok_or_else(|| FrError::semantics(span, SemErrorKind::Stuck, "reduction produced no value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(kind: TermKind) -> Term {
        Term::new(Span::DUMMY, kind)
    }

    #[test]
    fn literal_evaluates_to_itself() {
        let arena = LifetimeArena::new();
        let (_, v) = execute(&arena, t(TermKind::IntLit(42))).unwrap();
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn let_then_copy_access_reads_the_binding() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = t(TermKind::Block {
            lifetime: inner,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(7))),
                }),
                t(TermKind::Access {
                    kind: AccessKind::Copy,
                    lval: LVal::var("x"),
                }),
            ],
        });
        let (_, v) = execute(&arena, program).unwrap();
        assert_eq!(v, Value::Int(7));
    }

    #[test]
    fn block_drops_its_local_binding_on_exit() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = t(TermKind::Block {
            lifetime: inner,
            body: vec![t(TermKind::Let {
                name: "x".into(),
                init: Box::new(t(TermKind::IntLit(1))),
            })],
        });
        let (state, _) = execute(&arena, program).unwrap();
        assert!(state.frame.lookup("x").is_none());
    }

    #[test]
    fn moving_a_variable_empties_its_cell() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        // { let mut x = box 1; let mut y = x; y }
        let program = t(TermKind::Block {
            lifetime: inner,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::Box(Box::new(t(TermKind::IntLit(1)))))),
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
                    lval: LVal::var("y"),
                }),
            ],
        });
        let (state, v) = execute(&arena, program).unwrap();
        assert!(v.as_location().is_some());
        assert!(state.frame.lookup("x").is_none());
        assert!(state.frame.lookup("y").is_none());
    }

    #[test]
    fn borrow_then_deref_reads_through_the_pointer() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        // { let mut x = 5; let mut p = &x; *p }
        let program = t(TermKind::Block {
            lifetime: inner,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::IntLit(5))),
                }),
                t(TermKind::Let {
                    name: "p".into(),
                    init: Box::new(t(TermKind::Borrow {
                        mutable: false,
                        lval: LVal::var("x"),
                    })),
                }),
                t(TermKind::Access {
                    kind: AccessKind::Copy,
                    lval: LVal::var("p").deref(),
                }),
            ],
        });
        let (_, v) = execute(&arena, program).unwrap();
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn fuel_exhaustion_is_reported_as_stuck() {
        let arena = LifetimeArena::new();
        let err = execute_with_fuel(&arena, t(TermKind::IntLit(1)), 0).unwrap_err();
        assert!(err.is_semantic_error());
    }
}
