//! The soundness-falsification harness: for a
//! candidate `B`, run the checker and the semantics independently and
//! classify whether they agree.
//!
//! `checker(B) succeeds ⇒ semantics(B) reduces to a value without a semantic
//! error` is the property under test. A [`Verdict::FalsePositive`] falsifies
//! it directly — a soundness bug in either the checker (accepted something
//! it shouldn't have) or the semantics (failed to reduce something sound).
//! A [`Verdict::FalseNegative`] does not falsify soundness (the checker is
//! merely incomplete, rejecting a program the semantics can run), but the
//! harness still reports it since an overly strict checker is itself a bug
//! to track down.

use fr_borrowck::check;
use fr_semantics::execute;
use fr_syntax::FrError;

use crate::enumerate::Candidate;

#[derive(Debug)]
pub enum Verdict {
    /// Checker accepted, semantics ran to a value: the expected outcome for
    /// a well-typed program.
    BothAccept,
    /// Checker rejected; the semantics was never run (there is nothing to
    /// compare it against without executing an ill-typed program, which is
    /// only meaningful when probing `FalseNegative`s deliberately).
    BothReject { check_error: FrError },
    /// Checker accepted, but the semantics raised an error. A soundness
    /// bug: the checker's verdict and the semantics' behaviour disagree in
    /// the unsafe direction.
    FalsePositive { sem_error: FrError },
    /// Checker rejected, but running the semantics directly on the same
    /// term anyway reduces it to a value without error. Not unsound (the
    /// checker is conservative by construction), but flagged as the
    /// "false negative" outcome.
    FalseNegative { check_error: FrError },
}

impl Verdict {
    pub fn is_soundness_violation(&self) -> bool {
        matches!(self, Verdict::FalsePositive { .. })
    }
}

/// Run both analyses on `candidate` and classify the result. Always runs
/// the semantics even when the checker rejects, so that `FalseNegative` can
/// be distinguished from a program that is also stuck for reasons unrelated
/// to typing (`BothReject` only records the checker's verdict; a caller
/// that wants the semantics' verdict too can call
/// [`fr_semantics::execute`] directly against `candidate.term.clone()`).
pub fn check_soundness(candidate: &Candidate) -> Verdict {
    match check(&candidate.arena, &candidate.term) {
        Ok(_ty) => match execute(&candidate.arena, candidate.term.clone()) {
            Ok(_) => Verdict::BothAccept,
            Err(sem_error) => Verdict::FalsePositive { sem_error },
        },
        Err(check_error) => match execute(&candidate.arena, candidate.term.clone()) {
            Ok(_) => Verdict::FalseNegative { check_error },
            Err(_) => Verdict::BothReject { check_error },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::{enumerate, SpaceParams};

    #[test]
    fn tiny_space_never_falsifies_soundness() {
        let params = SpaceParams { ints: 2, vars: 2, depth: 1, width: 2 };
        for candidate in enumerate(&params) {
            let verdict = check_soundness(&candidate);
            assert!(
                !verdict.is_soundness_violation(),
                "soundness violation on {}: {verdict:?}",
                candidate.term
            );
        }
    }

    #[test]
    fn seed_1_is_both_accept() {
        let mut arena = fr_syntax::LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let term = fr_syntax::Term::new(
            fr_syntax::Span::DUMMY,
            fr_syntax::TermKind::Block {
                lifetime: inner,
                body: vec![
                    fr_syntax::Term::new(
                        fr_syntax::Span::DUMMY,
                        fr_syntax::TermKind::Let {
                            name: "x".into(),
                            init: Box::new(fr_syntax::Term::new(fr_syntax::Span::DUMMY, fr_syntax::TermKind::IntLit(123))),
                        },
                    ),
                    fr_syntax::Term::new(
                        fr_syntax::Span::DUMMY,
                        fr_syntax::TermKind::Access {
                            kind: fr_syntax::AccessKind::Move,
                            lval: fr_syntax::LVal::var("x"),
                        },
                    ),
                ],
            },
        );
        let candidate = Candidate { arena, term };
        assert!(matches!(check_soundness(&candidate), Verdict::BothAccept));
    }
}
