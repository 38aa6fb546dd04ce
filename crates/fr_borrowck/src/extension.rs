//! The typing extension point.
//!
//! `fr_ext` implements one [`Extension`] per extension (if/else, tuples,
//! function calls) and registers them with [`crate::Checker::with_extensions`]
//! in order; the first handler that recognises an [`ExtTerm`] wins.

use fr_syntax::{ExtTerm, FrError, Lifetime, Span};
use fr_types::{Environment, Type};

use crate::checker::Checker;

pub trait Extension {
    /// Attempt to type `ext`. Return `None` if this handler does not own
    /// this variant, so the next registered handler can try.
    fn try_check(
        &self,
        checker: &mut Checker,
        env: &Environment,
        lifetime: Lifetime,
        ext: &ExtTerm,
        span: Span,
    ) -> Option<Result<(Type, Environment), FrError>>;
}
