//! Script runs
//!
//! A [`Run`] resolves its script into a plan, then walks the plan one node at
//! a time. Every dispatch goes through the interceptor chain down to the
//! matched action and completes before the next one starts. [`Run::run`]
//! collects results in execution order; spawned runs stream them through a
//! bounded channel instead and keep only a count.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::plan::{build_plan, PlanNode};
use crate::action::{ActionRegistry, ActionResult};
use crate::config::Config;
use crate::context::ExecutionContext;
use crate::error::RunError;
use crate::interceptor::{Interceptor, Next};
use crate::params::ParameterStore;
use crate::script::{ScriptCase, Step};
use crate::template::MissingParamPolicy;

/* ===================== Settings & outcome ===================== */

/// Results a spawned run may queue before it waits for the consumer
pub const RESULT_BUFFER: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    /// Delay between `While` guard checks. Zero only yields to the scheduler.
    pub loop_poll_interval: Duration,
    pub run_timeout: Option<Duration>,
    pub missing_params: MissingParamPolicy,
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            loop_poll_interval: Duration::from_millis(config.interpreter.loop_poll_interval_ms),
            run_timeout: config.interpreter.run_timeout_secs.map(Duration::from_secs),
            missing_params: config.template.missing_params,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    /// Results in execution order, up to and including a failure record.
    /// Empty for spawned runs, whose results went to the [`RunHandle`].
    pub results: Vec<ActionResult>,
    /// Number of results the run produced, streamed or collected
    pub emitted: usize,
    /// Parameter store as the run left it
    pub params: ParameterStore,
    /// The fatal error that ended the run, if any
    pub error: Option<RunError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<ActionResult>, RunError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// Explicit per-iteration decision of a `While` guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopSignal {
    Continue,
    Stop,
}

/* ===================== Run ===================== */

/// One script bound to the collaborators it runs with
///
/// The registry and interceptors are shared read-only. Each call to
/// [`Run::run`] creates a fresh [`ExecutionContext`], so the same `Run` can
/// execute several times without state leaking between executions.
pub struct Run {
    case: ScriptCase,
    registry: Arc<ActionRegistry>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    settings: RunSettings,
    cancel: CancellationToken,
}

impl Run {
    pub fn new(case: ScriptCase, registry: Arc<ActionRegistry>) -> Self {
        Self {
            case,
            registry,
            interceptors: Vec::new(),
            settings: RunSettings::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Interceptors in order, first one outermost
    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Append one interceptor as the new innermost layer
    pub fn intercept(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use an external token. Once it is cancelled, every later run of this `Run` stops at once.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn case(&self) -> &ScriptCase {
        &self.case
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the script to completion (or first fatal error)
    pub async fn run(&self) -> RunOutcome {
        self.execute(None).await
    }

    /// Execute on a tokio task, streaming results through the returned handle.
    ///
    /// The run pauses once [`RESULT_BUFFER`] results are waiting to be read.
    pub fn spawn(self) -> RunHandle {
        let (tx, rx) = mpsc::channel(RESULT_BUFFER);
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move { self.execute(Some(tx)).await });
        RunHandle {
            results: rx,
            cancel,
            task,
        }
    }

    async fn execute(&self, sink: Option<mpsc::Sender<ActionResult>>) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, case = %self.case.name);

        async move {
            let mut ctx = ExecutionContext::new(run_id)
                .with_missing_params(self.settings.missing_params)
                .with_cancellation(self.cancel.clone());
            let mut out = Emitter::new(sink);

            info!(steps = self.case.len(), "run started");
            let error = match build_plan(&self.case.steps) {
                Ok(plan) => self.execute_plan(&plan, &mut ctx, &mut out).await.err(),
                Err(err) => Some(err),
            };

            match &error {
                None => info!(results = out.emitted, "run finished"),
                Some(err) => warn!(results = out.emitted, error = %err, "run failed"),
            }

            RunOutcome {
                run_id,
                results: out.results,
                emitted: out.emitted,
                params: ctx.into_params(),
                error,
            }
        }
        .instrument(span)
        .await
    }

    /// Walk the plan under the run's cancellation token and timeout
    async fn execute_plan(
        &self,
        plan: &[PlanNode<'_>],
        ctx: &mut ExecutionContext,
        out: &mut Emitter,
    ) -> Result<(), RunError> {
        let executor = Executor {
            registry: &self.registry,
            interceptors: &self.interceptors,
            settings: &self.settings,
        };
        let cancel = self.cancel.clone();

        let guarded = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(RunError::Cancelled),
                result = executor.exec_block(plan, ctx, out) => result,
            }
        };

        match self.settings.run_timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .unwrap_or(Err(RunError::TimedOut(limit))),
            None => guarded.await,
        }
    }
}

/* ===================== Handle ===================== */

/// A run executing on its own task
pub struct RunHandle {
    results: mpsc::Receiver<ActionResult>,
    cancel: CancellationToken,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Next result as it completes; `None` once the run has ended and all results were read
    pub async fn next_result(&mut self) -> Option<ActionResult> {
        self.results.recv().await
    }

    /// Ask the run to stop. It ends with [`RunError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end
    pub async fn join(self) -> Result<RunOutcome, tokio::task::JoinError> {
        self.task.await
    }
}

/* ===================== Executor ===================== */

type BlockFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + 'a>>;

/// Hands results to the stream consumer, or collects them when there is none
struct Emitter {
    results: Vec<ActionResult>,
    sink: Option<mpsc::Sender<ActionResult>>,
    emitted: usize,
}

impl Emitter {
    fn new(sink: Option<mpsc::Sender<ActionResult>>) -> Self {
        Self {
            results: Vec::new(),
            sink,
            emitted: 0,
        }
    }

    async fn emit(&mut self, result: ActionResult) {
        self.emitted += 1;
        match &self.sink {
            Some(sink) => {
                // A consumer that stopped listening does not stop the run
                let _ = sink.send(result).await;
            }
            None => self.results.push(result),
        }
    }
}

struct Executor<'r> {
    registry: &'r ActionRegistry,
    interceptors: &'r [Arc<dyn Interceptor>],
    settings: &'r RunSettings,
}

impl<'r> Executor<'r> {
    fn exec_block<'a>(
        &'a self,
        nodes: &'a [PlanNode<'a>],
        ctx: &'a mut ExecutionContext,
        out: &'a mut Emitter,
    ) -> BlockFuture<'a> {
        Box::pin(async move {
            for node in nodes {
                if ctx.cancellation().is_cancelled() {
                    return Err(RunError::Cancelled);
                }
                self.exec_node(node, ctx, out).await?;
            }
            Ok(())
        })
    }

    async fn exec_node(
        &self,
        node: &PlanNode<'_>,
        ctx: &mut ExecutionContext,
        out: &mut Emitter,
    ) -> Result<(), RunError> {
        match node {
            PlanNode::Sequential(step) => {
                let result = self.dispatch(step, ctx, out).await?;
                out.emit(result).await;
            }
            PlanNode::Conditional {
                guard,
                then_branch,
                else_branch,
            } => {
                let result = self.dispatch(guard, ctx, out).await?;
                let holds = result.condition();
                out.emit(result).await;

                debug!(guard = %guard.name, holds, "conditional resolved");
                let branch = if holds { then_branch } else { else_branch };
                self.exec_block(branch, ctx, out).await?;
            }
            PlanNode::Loop { guard, body } => {
                let mut iterations: u64 = 0;
                while self.check_guard(guard, ctx, out).await? == LoopSignal::Continue {
                    self.exec_block(body, ctx, out).await?;
                    iterations += 1;
                    self.pause_between_iterations(ctx).await?;
                }
                debug!(guard = %guard.name, iterations, "loop finished");
            }
        }
        Ok(())
    }

    /// Dispatch a `While` guard. Its result is bookkeeping and is not emitted.
    async fn check_guard(
        &self,
        guard: &Step,
        ctx: &mut ExecutionContext,
        out: &mut Emitter,
    ) -> Result<LoopSignal, RunError> {
        let result = self.dispatch(guard, ctx, out).await?;
        Ok(if result.condition() {
            LoopSignal::Continue
        } else {
            LoopSignal::Stop
        })
    }

    async fn pause_between_iterations(&self, ctx: &ExecutionContext) -> Result<(), RunError> {
        let interval = self.settings.loop_poll_interval;
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = ctx.cancellation().cancelled() => {}
            }
        }

        if ctx.cancellation().is_cancelled() {
            return Err(RunError::Cancelled);
        }
        Ok(())
    }

    /// Run one step through the interceptor chain to its action.
    ///
    /// A failing dispatch emits a `success == false` record before returning
    /// the run-ending error. A step no action supports emits nothing.
    async fn dispatch(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        out: &mut Emitter,
    ) -> Result<ActionResult, RunError> {
        if self.registry.resolve(step).is_none() {
            return Err(RunError::UnsupportedStep {
                name: step.name.clone(),
                step_type: step.step_type(),
            });
        }

        let started = Utc::now();
        let next = Next::new(self.interceptors, self.registry);
        match next.run(step, ctx).await {
            Ok(result) if result.success => Ok(result),
            Ok(result) => {
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "action reported failure".to_string());
                out.emit(result).await;
                Err(RunError::ActionExecution {
                    name: step.name.clone(),
                    message,
                })
            }
            Err(err) => {
                out.emit(ActionResult::failure(started, step.clone(), err.to_string()))
                    .await;
                Err(err.into_run_error(&step.name))
            }
        }
    }
}
