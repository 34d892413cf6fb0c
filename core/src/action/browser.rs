//! Browser backend seam and the actions that drive it
//!
//! The interpreter never talks to a concrete automation library. A
//! [`BrowserDriver`] launches sessions; sessions open pages; pages do the
//! element-level work. Any driver (CDP, WebDriver, a test fake) plugs in here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{Action, ActionResult};
use crate::context::ExecutionContext;
use crate::error::ActionError;
use crate::script::{Step, StepKind, StepType};

/* ===================== Backend traits ===================== */

/// Launches browser sessions
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch a browser. `options` is the step's opaque options value.
    async fn launch(&self, options: Option<&JsonValue>) -> Result<Box<dyn BrowserSession>, ActionError>;
}

/// One running browser
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageSession>, ActionError>;

    async fn close(&self) -> Result<(), ActionError>;
}

/// One open page (tab)
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn goto(&self, url: &str, options: Option<&JsonValue>) -> Result<(), ActionError>;

    /// Type into the element, keeping its current contents
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ActionError>;

    /// Replace the element's value
    async fn set_value(&self, selector: &str, text: &str) -> Result<(), ActionError>;

    /// Visible text of the element
    async fn read_text(&self, selector: &str) -> Result<String, ActionError>;

    /// Form value of the element
    async fn read_value(&self, selector: &str) -> Result<String, ActionError>;

    async fn wait_for_selector(&self, selector: &str) -> Result<(), ActionError>;

    async fn wait_for_xpath(&self, xpath: &str) -> Result<(), ActionError>;
}

/* ===================== Actions ===================== */

/// `OpenBrowser`: launch through the driver and keep the session in the context
pub struct OpenBrowserAction {
    driver: Arc<dyn BrowserDriver>,
}

impl OpenBrowserAction {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Action for OpenBrowserAction {
    fn step_type(&self) -> StepType {
        StepType::OpenBrowser
    }

    async fn run(&self, step: &Step, ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        let started = Utc::now();
        let browser = self.driver.launch(step.options.as_ref()).await?;
        if let Some(previous) = ctx.set_browser(browser) {
            debug!("replacing an already open browser");
            ctx.take_page();
            previous.close().await?;
        }
        Ok(ActionResult::success(started, step.clone(), None))
    }
}

/// `CloseBrowser`: close the session and drop the page with it
pub struct CloseBrowserAction;

#[async_trait]
impl Action for CloseBrowserAction {
    fn step_type(&self) -> StepType {
        StepType::CloseBrowser
    }

    async fn run(&self, step: &Step, ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        let started = Utc::now();
        let browser = ctx
            .take_browser()
            .ok_or(ActionError::MissingResource("browser"))?;
        ctx.take_page();
        browser.close().await?;
        Ok(ActionResult::success(started, step.clone(), None))
    }
}

/// `OpenPage`: open a page on the current browser and navigate it
pub struct OpenPageAction;

#[async_trait]
impl Action for OpenPageAction {
    fn step_type(&self) -> StepType {
        StepType::OpenPage
    }

    async fn run(&self, step: &Step, ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        let StepKind::OpenPage { url } = &step.kind else {
            return Err(ActionError::InvalidStep(step.name.clone()));
        };

        let started = Utc::now();
        let page = ctx.browser()?.new_page().await?;
        page.goto(url, step.options.as_ref()).await?;
        ctx.set_page(page);
        Ok(ActionResult::success(started, step.clone(), None))
    }
}

/// `InputText`: type into (append) or overwrite an element on the current page
pub struct InputTextAction;

#[async_trait]
impl Action for InputTextAction {
    fn step_type(&self) -> StepType {
        StepType::InputText
    }

    async fn run(&self, step: &Step, ctx: &mut ExecutionContext) -> Result<ActionResult, ActionError> {
        let StepKind::InputText {
            selector,
            text,
            append,
        } = &step.kind
        else {
            return Err(ActionError::InvalidStep(step.name.clone()));
        };

        let started = Utc::now();
        let page = ctx.page()?;
        if *append {
            page.type_text(selector, text).await?;
        } else {
            page.set_value(selector, text).await?;
        }
        Ok(ActionResult::success(started, step.clone(), None))
    }
}
