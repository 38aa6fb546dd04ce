//! Top-level convenience crate: parse, borrow-check and execute a whole
//! FeatherweightRust program in one call, wired up with the standard
//! extension set (if/else, tuples, functions). Library consumers that want
//! finer control — a custom extension set, or access to the checker's
//! intermediate environment — use `fr_parser`/`fr_borrowck`/`fr_semantics`
//! directly; this crate exists for the common case (`fr_cli`, tests).

pub use fr_borrowck::Checker;
pub use fr_ext::{FnDecl, Program, TypeAnnotation};
pub use fr_parser::{parse, parse_program, ParseError};
pub use fr_semantics::{Thread, DEFAULT_FUEL};
pub use fr_store::MachineState;
pub use fr_syntax::{CheckErrorKind, ErrorKind, FrError, LifetimeArena, Phase, SemErrorKind, Term, Value};
pub use fr_types::Type;

/// Either a parse-time failure or a checker/semantics failure
/// (`fr_syntax::FrError`), each crate boundary's error enum wrapping the
/// one below it with `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] fr_parser::ParseError),
    #[error(transparent)]
    Fr(#[from] fr_syntax::FrError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse, borrow-check and execute `src` as a whole program (zero or more
/// function declarations followed by a main block), under the standard
/// extension set.
pub fn run(src: &str, fuel: u64) -> Result<(MachineState, Value)> {
    let (arena, program) = fr_parser::parse_program(src)?;
    fr_ext::check_program(&arena, &program)?;
    Ok(fr_ext::execute_program(&arena, program, fuel)?)
}

/// Parse and borrow-check `src` without executing it, returning the type
/// its main block reduces to.
pub fn check(src: &str) -> Result<Type> {
    let (arena, program) = fr_parser::parse_program(src)?;
    Ok(fr_ext::check_program(&arena, &program)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_1_runs_to_a_value() {
        let (_, value) = run("{ let mut x = 123; x }", DEFAULT_FUEL).unwrap();
        assert_eq!(value, Value::Int(123));
    }

    #[test]
    fn seed_2_is_rejected_for_lifetime_escape() {
        let err = check("{ let mut x = 1; let mut y = &x; { let mut z = 1; y = &z; } }").unwrap_err();
        assert!(matches!(err, Error::Fr(e) if e.phase() == Phase::Check));
    }

    #[test]
    fn seed_3_self_referential_assignment_through_nested_mut_refs_is_rejected() {
        let err = check("{ let mut x = 0; let mut y = &mut x; let mut z = &mut y; *z = z; }").unwrap_err();
        assert!(matches!(
            err,
            Error::Fr(e) if e.phase() == Phase::Check && e.kind == ErrorKind::Check(CheckErrorKind::BadDereference)
        ));
    }

    #[test]
    fn seed_5_reborrow_runs_to_a_value() {
        let (_, value) = run("{ let mut x = 1; let mut y = &mut x; let mut z = &mut *y; *z = 123; *y }", DEFAULT_FUEL).unwrap();
        assert_eq!(value, Value::Int(123));
    }

    #[test]
    fn a_parse_error_is_distinguishable_from_a_check_error() {
        let err = check("{ let mut = 1; }").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
