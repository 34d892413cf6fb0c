//! Per-run execution context
//!
//! Owned by exactly one run. Holds the parameter store and whatever
//! backend resources earlier steps opened (browser, page).

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::action::browser::{BrowserSession, PageSession};
use crate::error::ActionError;
use crate::params::ParameterStore;
use crate::template::MissingParamPolicy;

pub struct ExecutionContext {
    run_id: Uuid,
    params: ParameterStore,
    missing_params: MissingParamPolicy,
    cancel: CancellationToken,
    browser: Option<Box<dyn BrowserSession>>,
    page: Option<Box<dyn PageSession>>,
}

impl ExecutionContext {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            params: ParameterStore::new(),
            missing_params: MissingParamPolicy::default(),
            cancel: CancellationToken::new(),
            browser: None,
            page: None,
        }
    }

    pub fn with_missing_params(mut self, policy: MissingParamPolicy) -> Self {
        self.missing_params = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn missing_params(&self) -> MissingParamPolicy {
        self.missing_params
    }

    /// Token cancelled when the run is asked to stop. Long-running actions may watch it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /* ===================== Parameters ===================== */

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    pub fn into_params(self) -> ParameterStore {
        self.params
    }

    /* ===================== Backend resources ===================== */

    pub fn browser(&self) -> Result<&dyn BrowserSession, ActionError> {
        self.browser
            .as_deref()
            .ok_or(ActionError::MissingResource("browser"))
    }

    /// Install a browser session, returning the one it replaces
    pub fn set_browser(
        &mut self,
        browser: Box<dyn BrowserSession>,
    ) -> Option<Box<dyn BrowserSession>> {
        self.browser.replace(browser)
    }

    pub fn take_browser(&mut self) -> Option<Box<dyn BrowserSession>> {
        self.browser.take()
    }

    pub fn page(&self) -> Result<&dyn PageSession, ActionError> {
        self.page.as_deref().ok_or(ActionError::MissingResource("page"))
    }

    pub fn has_page(&self) -> bool {
        self.page.is_some()
    }

    pub fn set_page(&mut self, page: Box<dyn PageSession>) -> Option<Box<dyn PageSession>> {
        self.page.replace(page)
    }

    pub fn take_page(&mut self) -> Option<Box<dyn PageSession>> {
        self.page.take()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("params", &self.params)
            .field("missing_params", &self.missing_params)
            .field("browser", &self.browser.is_some())
            .field("page", &self.page.is_some())
            .finish()
    }
}
