//! Control-flow interpreter
//!
//! Resolves a script's flat step list into a block plan and executes it
//! strictly sequentially: plain steps dispatch once, `If` dispatches its guard
//! and runs one branch, `While` re-dispatches its guard before every
//! iteration until it yields false.

pub mod plan;
pub mod run;

#[cfg(test)]
mod tests;

pub use plan::{build_plan, outline, PlanNode, MAX_BLOCK_DEPTH};
pub use run::{Run, RunHandle, RunOutcome, RunSettings, RESULT_BUFFER};
