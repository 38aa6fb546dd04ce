//! The operational semantics: a single explicit-stack reducer exposing both
//! a small-step (`Thread::step`) and a big-step (`execute`) interface over
//! the store and machine state from `fr_store`.

pub mod thread;

pub use thread::{execute, execute_with_extensions, execute_with_fuel, ReduceExt, Thread, DEFAULT_FUEL};
