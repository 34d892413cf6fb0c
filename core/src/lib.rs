pub mod action;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod interceptor;
pub mod interpreter;
pub mod params;
pub mod script;
pub mod telemetry;
pub mod template;

// Re-export main types
pub use action::{
    control_registry, default_registry, Action, ActionRegistry, ActionResult, BrowserDriver,
    BrowserSession, PageSession,
};
pub use config::Config;
pub use context::ExecutionContext;
pub use error::{ActionError, RunError, TemplateError};
pub use interceptor::{Interceptor, Next, TracingInterceptor};
pub use interpreter::{Run, RunHandle, RunOutcome, RunSettings};
pub use params::ParameterStore;
pub use script::{ScriptCase, Step, StepKind, StepType, WaitTarget};
pub use template::{MissingParamPolicy, TemplateExpander};
