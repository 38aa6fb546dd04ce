//! The bounded program-space enumerator `P(i, v, d, w)`: closed core-grammar blocks (no extensions)
//! using at most `i` integer literals, `v` variable names, `d` levels of
//! block nesting, and `w` statements per block.
//!
//! Variables are always introduced in canonical order — the n-th `let`
//! binds the n-th name of a fixed sequence — so every term this module produces is canonical by
//! construction; [`is_canonical`] is exposed separately so the property can
//! still be checked against arbitrary (e.g. parsed) terms.

use fr_syntax::{AccessKind, LVal, Lifetime, LifetimeArena, Span, Term, TermKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Select up to `count` candidates out of `candidates`, in a reproducible
/// pseudo-random order seeded by `seed`. Used by `fr fuzz`'s `--count` flag
/// to sample a manageable slice out of a program space too large to scan in
/// full, while keeping runs reproducible across invocations with the same
/// seed.
pub fn sample(mut candidates: Vec<Candidate>, count: usize, seed: u64) -> Vec<Candidate> {
    let mut rng = StdRng::seed_from_u64(seed);
    candidates.shuffle(&mut rng);
    candidates.truncate(count);
    candidates
}

/// Bounds of one program space instance.
#[derive(Debug, Clone, Copy)]
pub struct SpaceParams {
    pub ints: usize,
    pub vars: usize,
    pub depth: usize,
    pub width: usize,
}

/// One member of an enumerated program space: a term plus the lifetime
/// arena its nested blocks mint lifetimes into.
pub struct Candidate {
    pub arena: LifetimeArena,
    pub term: Term,
}

/// The fixed canonical name sequence: `a`, `b`, `c`, ..., `z`, `a0`, `a1`, ...
fn canonical_names(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            if i < 26 {
                ((b'a' + i as u8) as char).to_string()
            } else {
                format!("a{}", i - 26)
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Budget {
    vars_used: usize,
    ints_used: usize,
}

/// Enumerate every candidate in `P(params.ints, params.vars, params.depth,
/// params.width)`. Each candidate owns an independent [`LifetimeArena`]
/// snapshot, so candidates can be checked/executed without interfering with
/// one another.
pub fn enumerate(params: &SpaceParams) -> Vec<Candidate> {
    let names = canonical_names(params.vars);
    let mut arena = LifetimeArena::new();
    let root = arena.root();
    let start = Budget { vars_used: 0, ints_used: 0 };
    let blocks = gen_block(&mut arena, root, &names, params, start, params.depth);
    blocks
        .into_iter()
        .map(|(term, _budget)| Candidate { arena: arena.clone(), term })
        .collect()
}

fn gen_block(
    arena: &mut LifetimeArena,
    parent: Lifetime,
    names: &[String],
    params: &SpaceParams,
    budget: Budget,
    depth_left: usize,
) -> Vec<(Term, Budget)> {
    let lifetime = arena.fresh_within(parent);
    gen_stmts(arena, lifetime, names, params, budget, depth_left, params.width.max(1))
        .into_iter()
        .map(|(body, b)| (Term::new(Span::DUMMY, TermKind::Block { lifetime, body }), b))
        .collect()
}

/// All statement sequences of length `1..=width_left` reachable from
/// `budget`, each paired with the budget remaining after the whole
/// sequence.
fn gen_stmts(
    arena: &mut LifetimeArena,
    lifetime: Lifetime,
    names: &[String],
    params: &SpaceParams,
    budget: Budget,
    depth_left: usize,
    width_left: usize,
) -> Vec<(Vec<Term>, Budget)> {
    let mut out = Vec::new();
    for (t, b) in gen_term(arena, lifetime, names, params, budget, depth_left) {
        out.push((vec![t], b));
    }
    if width_left > 1 {
        for (first, b1) in gen_term(arena, lifetime, names, params, budget, depth_left) {
            for (rest, b2) in gen_stmts(arena, lifetime, names, params, b1, depth_left, width_left - 1) {
                let mut stmts = Vec::with_capacity(rest.len() + 1);
                stmts.push(first.clone());
                stmts.extend(rest);
                out.push((stmts, b2));
            }
        }
    }
    out
}

/// "Simple" terms: the subset of term shapes allowed as a `let`/assignment
/// right-hand side. Excluding `Let`/`Assign`/`Block` here (rather than
/// allowing the full `gen_term` recursively) keeps the space finite without
/// a separate global term-count budget: the only unbounded recursion is
/// through block nesting, already bounded by `depth_left`.
fn gen_simple_term(names: &[String], params: &SpaceParams, budget: Budget) -> Vec<(Term, Budget)> {
    let mut out = Vec::new();

    if budget.ints_used < params.ints {
        let next = Budget { ints_used: budget.ints_used + 1, ..budget };
        out.push((Term::new(Span::DUMMY, TermKind::IntLit(budget.ints_used as i64)), next));
        out.push((
            Term::new(Span::DUMMY, TermKind::Box(Box::new(Term::new(Span::DUMMY, TermKind::IntLit(budget.ints_used as i64))))),
            next,
        ));
    }

    for name in &names[..budget.vars_used] {
        let lval = LVal::var(name.clone());
        out.push((Term::new(Span::DUMMY, TermKind::Access { kind: AccessKind::Move, lval: lval.clone() }), budget));
        out.push((Term::new(Span::DUMMY, TermKind::Access { kind: AccessKind::Copy, lval: lval.clone() }), budget));
        out.push((Term::new(Span::DUMMY, TermKind::Borrow { mutable: false, lval: lval.clone() }), budget));
        out.push((Term::new(Span::DUMMY, TermKind::Borrow { mutable: true, lval: lval.clone() }), budget));
        out.push((Term::new(Span::DUMMY, TermKind::Box(Box::new(Term::new(Span::DUMMY, TermKind::Access { kind: AccessKind::Move, lval })))), budget));
    }

    out
}

fn gen_term(
    arena: &mut LifetimeArena,
    lifetime: Lifetime,
    names: &[String],
    params: &SpaceParams,
    budget: Budget,
    depth_left: usize,
) -> Vec<(Term, Budget)> {
    let mut out = gen_simple_term(names, params, budget);

    if budget.vars_used < params.vars {
        let name = names[budget.vars_used].clone();
        for (init, b) in gen_simple_term(names, params, budget) {
            let next = Budget { vars_used: b.vars_used + 1, ..b };
            out.push((
                Term::new(Span::DUMMY, TermKind::Let { name: name.clone(), init: Box::new(init) }),
                next,
            ));
        }
    }

    for name in &names[..budget.vars_used] {
        for (value, b) in gen_simple_term(names, params, budget) {
            let target = LVal::var(name.clone());
            out.push((Term::new(Span::DUMMY, TermKind::Assign { target: target.clone(), value: Box::new(value.clone()) }), b));
            out.push((
                Term::new(Span::DUMMY, TermKind::Assign { target: target.deref(), value: Box::new(value) }),
                b,
            ));
        }
    }

    if depth_left > 0 {
        for (nested, b) in gen_block(arena, lifetime, names, params, budget, depth_left - 1) {
            out.push((nested, b));
        }
    }

    out
}

/// Collect the names bound by every `let` in `term`, in left-to-right
/// textual order (pre-order over statements, then recursing into each
/// statement's own sub-terms).
pub fn collect_let_names(term: &Term, out: &mut Vec<String>) {
    match &term.kind {
        TermKind::Let { name, init } => {
            out.push(name.clone());
            collect_let_names(init, out);
        }
        TermKind::Assign { value, .. } => collect_let_names(value, out),
        TermKind::Box(inner) => collect_let_names(inner, out),
        TermKind::Block { body, .. } => {
            for stmt in body {
                collect_let_names(stmt, out);
            }
        }
        TermKind::Ext(ext) => match ext {
            fr_syntax::ExtTerm::If { then_branch, else_branch, .. } => {
                collect_let_names(then_branch, out);
                collect_let_names(else_branch, out);
            }
            fr_syntax::ExtTerm::Tuple(elems) => {
                for e in elems {
                    collect_let_names(e, out);
                }
            }
            fr_syntax::ExtTerm::Call { args, .. } => {
                for a in args {
                    collect_let_names(a, out);
                }
            }
        },
        TermKind::IntLit(_) | TermKind::Access { .. } | TermKind::Borrow { .. } => {}
    }
}

/// True iff the n-th `let` (in the order [`collect_let_names`] walks)
/// declares the n-th name of the fixed canonical sequence.
pub fn is_canonical(term: &Term) -> bool {
    let mut names = Vec::new();
    collect_let_names(term, &mut names);
    let expected = canonical_names(names.len());
    names == expected
}
