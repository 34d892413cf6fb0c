//! Actions
//!
//! An action performs one kind of step. The interpreter looks actions up in
//! an [`ActionRegistry`] by step type and hands them the template-expanded
//! step together with the run's [`ExecutionContext`].

pub mod browser;
pub mod builtin;
mod registry;
mod result;

use std::sync::Arc;

use async_trait::async_trait;

pub use browser::{BrowserDriver, BrowserSession, PageSession};
pub use registry::ActionRegistry;
pub use result::ActionResult;

use crate::context::ExecutionContext;
use crate::error::ActionError;
use crate::script::{Step, StepType};

/// Performs one kind of step
#[async_trait]
pub trait Action: Send + Sync {
    /// Step type this action is registered under
    fn step_type(&self) -> StepType;

    /// Finer-grained check within the step type. First supporting action wins.
    fn supports(&self, step: &Step) -> bool {
        step.step_type() == self.step_type()
    }

    /// Perform the step.
    ///
    /// `step` is already expanded. Returning a result with `success == false`
    /// fails the run just like returning an error.
    async fn run(&self, step: &Step, ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError>;
}

/// Registry with only the actions that need no browser: guards, parameters, waits
pub fn control_registry() -> ActionRegistry {
    ActionRegistry::new()
        .with(builtin::WaitAction)
        .with(builtin::PutParamAction)
        .with(builtin::IfAction)
        .with(builtin::WhileAction)
}

/// Full registry over a browser driver
pub fn default_registry(driver: Arc<dyn BrowserDriver>) -> ActionRegistry {
    ActionRegistry::new()
        .with(browser::OpenBrowserAction::new(driver))
        .with(builtin::WaitAction)
        .with(browser::OpenPageAction)
        .with(builtin::PutParamAction)
        .with(builtin::IfAction)
        .with(builtin::WhileAction)
        .with(browser::InputTextAction)
        .with(browser::CloseBrowserAction)
}
