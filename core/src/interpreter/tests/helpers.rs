//! Test helpers for interpreter tests
//!
//! Fake browser backend, recording interceptors and small test actions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::action::{
    control_registry, default_registry, Action, ActionRegistry, ActionResult, BrowserDriver,
    BrowserSession, PageSession,
};
use crate::context::ExecutionContext;
use crate::error::ActionError;
use crate::interceptor::{Interceptor, Next};
use crate::interpreter::{Run, RunOutcome};
use crate::script::{ScriptCase, Step, StepType};

/* ===================== Running ===================== */

/// Run steps with the browser-less registry
pub async fn run_steps(steps: Vec<Step>) -> RunOutcome {
    Run::new(case(steps), Arc::new(control_registry())).run().await
}

pub fn case(steps: Vec<Step>) -> ScriptCase {
    ScriptCase::new("test case").with_steps(steps)
}

/// Names of the steps behind each result, in order
pub fn result_names(results: &[ActionResult]) -> Vec<String> {
    results.iter().map(|r| r.step.name.clone()).collect()
}

/// Shared log used by recording helpers
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

/* ===================== Interceptors ===================== */

/// Logs `<label>-before` / `<label>-after` around the rest of the chain
pub struct RecordingInterceptor {
    pub label: &'static str,
    pub log: Log,
}

#[async_trait]
impl Interceptor for RecordingInterceptor {
    async fn intercept(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        next: Next<'_>,
    ) -> Result<ActionResult, ActionError> {
        push(&self.log, format!("{}-before", self.label));
        let result = next.run(step, ctx).await;
        push(&self.log, format!("{}-after", self.label));
        result
    }
}

/// Answers every step itself without calling the rest of the chain
pub struct ShortCircuitInterceptor;

#[async_trait]
impl Interceptor for ShortCircuitInterceptor {
    async fn intercept(
        &self,
        step: &Step,
        _ctx: &mut ExecutionContext,
        _next: Next<'_>,
    ) -> Result<ActionResult, ActionError> {
        Ok(ActionResult::success(
            Utc::now(),
            step.clone(),
            Some(JsonValue::String("intercepted".to_string())),
        ))
    }
}

/* ===================== Actions ===================== */

/// `Wait` action that logs `T` (and the step name) instead of waiting
pub struct MarkAction {
    pub log: Log,
}

#[async_trait]
impl Action for MarkAction {
    fn step_type(&self) -> StepType {
        StepType::Wait
    }

    async fn run(&self, step: &Step, _ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        push(&self.log, "T");
        Ok(ActionResult::success(Utc::now(), step.clone(), None))
    }
}

/// `InputText` action that always fails with a backend error
pub struct BrokenInputAction;

#[async_trait]
impl Action for BrokenInputAction {
    fn step_type(&self) -> StepType {
        StepType::InputText
    }

    async fn run(&self, _step: &Step, _ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        Err(ActionError::Backend("element not found".to_string()))
    }
}

/// `InputText` action that reports failure through its result
pub struct RefusingInputAction;

#[async_trait]
impl Action for RefusingInputAction {
    fn step_type(&self) -> StepType {
        StepType::InputText
    }

    async fn run(&self, step: &Step, _ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        Ok(ActionResult::failure(Utc::now(), step.clone(), "field is read-only"))
    }
}

/// Control registry plus the given extra action
pub fn control_registry_with(action: impl Action + 'static) -> Arc<ActionRegistry> {
    Arc::new(control_registry().with(action))
}

/* ===================== Fake browser ===================== */

#[derive(Default)]
struct FakeState {
    events: Vec<String>,
    /// selector -> (visible text, form value)
    elements: HashMap<String, (String, String)>,
}

/// In-memory browser backend that records every call
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, selector: &str, text: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .elements
            .insert(selector.to_string(), (text.to_string(), value.to_string()));
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn registry(&self) -> Arc<ActionRegistry> {
        Arc::new(default_registry(Arc::new(self.clone())))
    }

    fn record(&self, event: String) {
        self.state.lock().unwrap().events.push(event);
    }

    fn element(&self, selector: &str) -> Result<(String, String), ActionError> {
        self.state
            .lock()
            .unwrap()
            .elements
            .get(selector)
            .cloned()
            .ok_or_else(|| ActionError::Backend(format!("element not found: {}", selector)))
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(&self, options: Option<&JsonValue>) -> Result<Box<dyn BrowserSession>, ActionError> {
        match options {
            Some(options) => self.record(format!("launch {}", options)),
            None => self.record("launch".to_string()),
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl BrowserSession for FakeDriver {
    async fn new_page(&self) -> Result<Box<dyn PageSession>, ActionError> {
        self.record("new_page".to_string());
        Ok(Box::new(self.clone()))
    }

    async fn close(&self) -> Result<(), ActionError> {
        self.record("close".to_string());
        Ok(())
    }
}

#[async_trait]
impl PageSession for FakeDriver {
    async fn goto(&self, url: &str, _options: Option<&JsonValue>) -> Result<(), ActionError> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ActionError> {
        self.element(selector)?;
        self.record(format!("type {} {}", selector, text));
        Ok(())
    }

    async fn set_value(&self, selector: &str, text: &str) -> Result<(), ActionError> {
        self.element(selector)?;
        self.record(format!("set {} {}", selector, text));
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<String, ActionError> {
        Ok(self.element(selector)?.0)
    }

    async fn read_value(&self, selector: &str) -> Result<String, ActionError> {
        Ok(self.element(selector)?.1)
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), ActionError> {
        self.element(selector)?;
        self.record(format!("wait {}", selector));
        Ok(())
    }

    async fn wait_for_xpath(&self, xpath: &str) -> Result<(), ActionError> {
        self.record(format!("xpath {}", xpath));
        Ok(())
    }
}
