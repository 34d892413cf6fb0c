//! Actions that need no browser to exist: guards, parameters, waits

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{Action, ActionResult};
use crate::context::ExecutionContext;
use crate::error::ActionError;
use crate::expr::{evaluate, evaluate_condition};
use crate::script::{Step, StepKind, StepType, WaitTarget};

/* ===================== Guards ===================== */

/// Evaluate the guard of an `If` or `While` step into `data: bool`
fn run_guard(step: &Step) -> Result<ActionResult, ActionError> {
    let expression = step
        .expression()
        .ok_or_else(|| ActionError::InvalidStep(step.name.clone()))?;

    let started = Utc::now();
    let holds = evaluate_condition(expression)?;
    debug!(expression = %expression, holds, "guard evaluated");
    Ok(ActionResult::success(
        started,
        step.clone(),
        Some(JsonValue::Bool(holds)),
    ))
}

pub struct IfAction;

#[async_trait]
impl Action for IfAction {
    fn step_type(&self) -> StepType {
        StepType::If
    }

    async fn run(&self, step: &Step, _ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        run_guard(step)
    }
}

pub struct WhileAction;

#[async_trait]
impl Action for WhileAction {
    fn step_type(&self) -> StepType {
        StepType::While
    }

    async fn run(&self, step: &Step, _ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        run_guard(step)
    }
}

/* ===================== PutParam ===================== */

/// `PutParam`: store a literal, a computed value, or a page element's content
///
/// Precedence: a selector reads from the page; otherwise `value` is stored,
/// evaluated first when `isExpression` is set. The stored value is also
/// returned as `data`.
pub struct PutParamAction;

#[async_trait]
impl Action for PutParamAction {
    fn step_type(&self) -> StepType {
        StepType::PutParam
    }

    async fn run(&self, step: &Step, ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        let StepKind::PutParam {
            key,
            selector,
            value,
            read_from_text,
            is_expression,
        } = &step.kind
        else {
            return Err(ActionError::InvalidStep(step.name.clone()));
        };

        let started = Utc::now();
        let stored = match (selector, value) {
            (Some(selector), _) => {
                let page = ctx.page()?;
                let text = if *read_from_text {
                    page.read_text(selector).await?
                } else {
                    page.read_value(selector).await?
                };
                JsonValue::String(text)
            }
            (None, Some(value)) if *is_expression => evaluate(value)?.to_json(),
            (None, Some(value)) => JsonValue::String(value.clone()),
            (None, None) => {
                return Err(ActionError::InvalidStep(format!(
                    "PutParam '{}' has neither a selector nor a value",
                    step.name
                )))
            }
        };

        debug!(key = %key, value = %stored, "parameter stored");
        ctx.params_mut().set(key.clone(), stored.clone());
        Ok(ActionResult::success(started, step.clone(), Some(stored)))
    }
}

/* ===================== Wait ===================== */

/// `Wait`: sleep for a duration, or wait for an element on the current page
///
/// A string of digits counts as a duration. A string starting with `//` is an
/// XPath, anything else a CSS selector. Element waits with no page open, and
/// a missing target, complete immediately.
pub struct WaitAction;

enum WaitPlan<'a> {
    Sleep(Duration),
    Selector(&'a str),
    XPath(&'a str),
    Nothing,
}

fn plan_wait(target: Option<&WaitTarget>) -> WaitPlan<'_> {
    match target {
        None => WaitPlan::Nothing,
        Some(WaitTarget::Duration(ms)) => WaitPlan::Sleep(Duration::from_millis(*ms)),
        Some(WaitTarget::Selector(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                WaitPlan::Nothing
            } else if let Ok(ms) = trimmed.parse::<u64>() {
                WaitPlan::Sleep(Duration::from_millis(ms))
            } else if trimmed.starts_with("//") {
                WaitPlan::XPath(trimmed)
            } else {
                WaitPlan::Selector(trimmed)
            }
        }
    }
}

#[async_trait]
impl Action for WaitAction {
    fn step_type(&self) -> StepType {
        StepType::Wait
    }

    async fn run(&self, step: &Step, ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        let StepKind::Wait {
            selector_or_duration_ms,
        } = &step.kind
        else {
            return Err(ActionError::InvalidStep(step.name.clone()));
        };

        let started = Utc::now();
        match plan_wait(selector_or_duration_ms.as_ref()) {
            WaitPlan::Sleep(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = ctx.cancellation().cancelled() => {
                        debug!("wait interrupted by cancellation");
                    }
                }
            }
            WaitPlan::Selector(selector) if ctx.has_page() => {
                ctx.page()?.wait_for_selector(selector).await?;
            }
            WaitPlan::XPath(xpath) if ctx.has_page() => {
                ctx.page()?.wait_for_xpath(xpath).await?;
            }
            WaitPlan::Selector(_) | WaitPlan::XPath(_) => {
                debug!("no page open, element wait completes immediately");
            }
            WaitPlan::Nothing => {}
        }
        Ok(ActionResult::success(started, step.clone(), None))
    }
}
