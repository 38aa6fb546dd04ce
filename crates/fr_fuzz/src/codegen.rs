//! Render a core-language [`Term`] as real, compilable Rust source:
//! `let mut` bindings, `Box::new(...)` allocation, standard
//! `&`/`&mut`/`*` syntax, and an explicit trailing "use" of every
//! still-live local at the end of each block.
//!
//! The trailing uses matter: `rustc` defaults to non-lexical lifetimes,
//! which can accept programs this calculus's strictly lexical borrow
//! checker rejects. Forcing a read of every local that the block's own
//! statements never move out of extends each binding's apparent liveness to
//! the end of its lexical scope, so the differential driver compares both
//! checkers under a matching liveness model. This is a best-effort
//! translation, not a bit-exact one: function declarations are out of scope
//! for codegen, since this extension's call-site typing is already a
//! deliberate simplification of outlives-bound checking (see `DESIGN.md`).

use std::collections::HashSet;
use std::fmt::Write as _;

use fr_syntax::{AccessKind, CompareOp, ExtTerm, LVal, PathElem, Term, TermKind};

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("codegen does not support function declarations/calls")]
    UnsupportedFunctionCall,
}

/// Render `term` (which must be a `Block`) as a standalone `fn main() { .. }`
/// source file.
pub fn to_rust_source(term: &Term) -> Result<String, CodegenError> {
    let mut out = String::new();
    out.push_str("#![allow(unused_mut, unused_variables, unused_assignments, dead_code)]\n\n");
    out.push_str("fn main() {\n");
    write_block_contents(&mut out, term, 1)?;
    out.push_str("}\n");
    Ok(out)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn write_block_contents(out: &mut String, block: &Term, depth: usize) -> Result<(), CodegenError> {
    let TermKind::Block { body, .. } = &block.kind else {
        panic!("write_block_contents called on a non-Block term");
    };
    let mut locals = Vec::new();
    for (i, stmt) in body.iter().enumerate() {
        write_stmt(out, stmt, depth)?;
        out.push_str(";\n");
        if let TermKind::Let { name, .. } = &stmt.kind {
            locals.push(name.clone());
        }
        let _ = i;
    }
    let moved = moved_vars(body);
    for name in locals {
        if !moved.contains(&name) {
            indent(out, depth);
            let _ = writeln!(out, "let _ = &{name};");
        }
    }
    Ok(())
}

/// Every variable named by a bare (whole-variable) `Move` access anywhere
/// in `body`, conservatively: codegen only needs to avoid re-borrowing a
/// value `rustc` would consider already moved, so over-reporting a moved
/// variable (and skipping its trailing use) is safe; under-reporting is
/// not, so this recurses into every nested term including sibling blocks.
fn moved_vars(body: &[Term]) -> HashSet<String> {
    let mut out = HashSet::new();
    for stmt in body {
        collect_moves(stmt, &mut out);
    }
    out
}

fn collect_moves(term: &Term, out: &mut HashSet<String>) {
    match &term.kind {
        TermKind::IntLit(_) => {}
        TermKind::Let { init, .. } => collect_moves(init, out),
        TermKind::Assign { value, .. } => collect_moves(value, out),
        TermKind::Access { kind: AccessKind::Move, lval } if lval.path.is_empty() => {
            out.insert(lval.var.clone());
        }
        TermKind::Access { .. } => {}
        TermKind::Borrow { .. } => {}
        TermKind::Box(inner) => collect_moves(inner, out),
        TermKind::Block { body, .. } => {
            for stmt in body {
                collect_moves(stmt, out);
            }
        }
        TermKind::Ext(ExtTerm::If { then_branch, else_branch, .. }) => {
            collect_moves(then_branch, out);
            collect_moves(else_branch, out);
        }
        TermKind::Ext(ExtTerm::Tuple(elems)) => {
            for e in elems {
                collect_moves(e, out);
            }
        }
        TermKind::Ext(ExtTerm::Call { args, .. }) => {
            for a in args {
                collect_moves(a, out);
            }
        }
    }
}

fn write_stmt(out: &mut String, term: &Term, depth: usize) -> Result<(), CodegenError> {
    indent(out, depth);
    match &term.kind {
        TermKind::Let { name, init } => {
            let _ = write!(out, "let mut {name} = ");
            write_expr(out, init, depth)?;
        }
        TermKind::Assign { target, value } => {
            write_lval(out, target);
            out.push_str(" = ");
            write_expr(out, value, depth)?;
        }
        _ => write_expr(out, term, depth)?,
    }
    Ok(())
}

fn write_expr(out: &mut String, term: &Term, depth: usize) -> Result<(), CodegenError> {
    match &term.kind {
        TermKind::IntLit(n) => {
            let _ = write!(out, "{n}");
        }
        TermKind::Let { .. } | TermKind::Assign { .. } => {
            // Only reachable via nested `Block`s; `write_stmt` handles the
            // top-level case per statement.
            write_stmt(out, term, depth)?;
        }
        TermKind::Access { lval, .. } => write_lval(out, lval),
        TermKind::Borrow { mutable, lval } => {
            out.push('&');
            if *mutable {
                out.push_str("mut ");
            }
            write_lval(out, lval);
        }
        TermKind::Box(inner) => {
            out.push_str("Box::new(");
            write_expr(out, inner, depth)?;
            out.push(')');
        }
        TermKind::Block { .. } => {
            out.push_str("{\n");
            write_block_contents(out, term, depth + 1)?;
            indent(out, depth);
            out.push('}');
        }
        TermKind::Ext(ExtTerm::If { lhs, op, rhs, then_branch, else_branch }) => {
            out.push_str("if ");
            write_lval(out, lhs);
            match op {
                CompareOp::Eq => out.push_str(" == "),
                CompareOp::Ne => out.push_str(" != "),
            }
            write_lval(out, rhs);
            out.push(' ');
            write_expr(out, then_branch, depth)?;
            out.push_str(" else ");
            write_expr(out, else_branch, depth)?;
        }
        TermKind::Ext(ExtTerm::Tuple(elems)) => {
            out.push('(');
            for (i, e) in elems.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, e, depth)?;
            }
            if elems.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        TermKind::Ext(ExtTerm::Call { .. }) => return Err(CodegenError::UnsupportedFunctionCall),
    }
    Ok(())
}

fn write_lval(out: &mut String, lval: &LVal) {
    let derefs = lval.path.elems().iter().filter(|e| matches!(e, PathElem::Deref)).count();
    for _ in 0..derefs {
        out.push('*');
    }
    out.push_str(&lval.var);
    for elem in lval.path.elems() {
        if let PathElem::Field(i) = elem {
            let _ = write!(out, ".{i}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_syntax::{LifetimeArena, Span};

    fn t(kind: TermKind) -> Term {
        Term::new(Span::DUMMY, kind)
    }

    #[test]
    fn renders_seed_1() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = t(TermKind::Block {
            lifetime: inner,
            body: vec![
                t(TermKind::Let { name: "x".into(), init: Box::new(t(TermKind::IntLit(123))) }),
                t(TermKind::Access { kind: AccessKind::Move, lval: LVal::var("x") }),
            ],
        });
        let src = to_rust_source(&program).unwrap();
        assert!(src.contains("let mut x = 123;"));
        assert!(src.contains("fn main()"));
    }

    #[test]
    fn moved_locals_get_no_trailing_use() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let program = t(TermKind::Block {
            lifetime: inner,
            body: vec![
                t(TermKind::Let {
                    name: "x".into(),
                    init: Box::new(t(TermKind::Box(Box::new(t(TermKind::IntLit(0)))))),
                }),
                t(TermKind::Let {
                    name: "y".into(),
                    init: Box::new(t(TermKind::Access { kind: AccessKind::Move, lval: LVal::var("x") })),
                }),
            ],
        });
        let src = to_rust_source(&program).unwrap();
        assert!(!src.contains("let _ = &x;"));
        assert!(src.contains("let _ = &y;"));
    }

    #[test]
    fn function_calls_are_unsupported() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let program = t(TermKind::Block {
            lifetime: root,
            body: vec![t(TermKind::Ext(ExtTerm::Call { name: "f".into(), lifetime_args: 0, args: vec![] }))],
        });
        assert!(matches!(to_rust_source(&program), Err(CodegenError::UnsupportedFunctionCall)));
    }
}
