//! Script data model

pub mod case;
pub mod step;

pub use case::ScriptCase;
pub use step::{Step, StepKind, StepType, WaitTarget};
