//! The heap and machine state shared by the operational semantics.

pub mod machine;
pub mod store;

pub use machine::{Frame, MachineState};
pub use store::Store;
