//! Interceptor chain
//!
//! Interceptors wrap every action dispatch. The first interceptor in the list
//! is the outermost layer; the innermost layer expands `${...}` templates on a
//! copy of the step and runs the action. An interceptor may inspect or
//! replace the step, skip `next` to short-circuit, or post-process the result.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::action::{ActionRegistry, ActionResult};
use crate::context::ExecutionContext;
use crate::error::ActionError;
use crate::script::Step;
use crate::template::TemplateExpander;

#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Handle one dispatch. Call `next.run(step, ctx)` to continue inward.
    async fn intercept(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        next: Next<'_>,
    ) -> Result<ActionResult, ActionError>;
}

/// The rest of the chain below the current interceptor
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    registry: &'a ActionRegistry,
}

impl<'a> Next<'a> {
    pub(crate) fn new(interceptors: &'a [Arc<dyn Interceptor>], registry: &'a ActionRegistry) -> Self {
        Self {
            interceptors,
            registry,
        }
    }

    /// Continue with the next layer, or the action itself once the chain is exhausted.
    ///
    /// The action is looked up for the step that reaches the end of the chain,
    /// so an interceptor may hand down a step of a different kind.
    pub async fn run(
        self,
        step: &Step,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionResult, ActionError> {
        match self.interceptors.split_first() {
            Some((head, rest)) => {
                let next = Next::new(rest, self.registry);
                head.intercept(step, ctx, next).await
            }
            None => {
                let expanded =
                    TemplateExpander::new(ctx.params(), ctx.missing_params()).expand_step(step)?;
                let action = self.registry.resolve(&expanded).ok_or_else(|| {
                    ActionError::InvalidStep(format!(
                        "no action supports step '{}' ({})",
                        expanded.name,
                        expanded.step_type()
                    ))
                })?;
                action.run(&expanded, ctx).await
            }
        }
    }
}

/* ===================== Built-in interceptors ===================== */

/// Logs every dispatch with its outcome and elapsed time
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInterceptor;

#[async_trait]
impl Interceptor for TracingInterceptor {
    async fn intercept(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        next: Next<'_>,
    ) -> Result<ActionResult, ActionError> {
        let started = Instant::now();
        debug!(step = %step.name, step_type = %step.step_type(), "dispatching step");

        let outcome = next.run(step, ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) if result.success => {
                info!(step = %step.name, elapsed_ms, "step completed")
            }
            Ok(result) => warn!(
                step = %step.name,
                elapsed_ms,
                error = result.error.as_deref().unwrap_or(""),
                "step reported failure"
            ),
            Err(err) => warn!(step = %step.name, elapsed_ms, error = %err, "step failed"),
        }
        outcome
    }
}
