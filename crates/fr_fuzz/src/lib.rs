//! Drivers: bounded program-space enumeration, the soundness-falsification
//! harness that runs the checker and the semantics side by side, a worker
//! pool for scanning large spaces, and differential testing against an
//! external `rustc`.

pub mod codegen;
pub mod diff;
pub mod enumerate;
pub mod pool;
pub mod soundness;

pub use codegen::to_rust_source;
pub use diff::{run_diff, DiffOutcome};
pub use enumerate::{enumerate, is_canonical, sample, Candidate, SpaceParams};
pub use pool::{scan, PoolReport};
pub use soundness::{check_soundness, Verdict};
