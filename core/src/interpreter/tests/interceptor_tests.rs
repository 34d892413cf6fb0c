//! Tests for the interceptor chain

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::helpers::{
    case, entries, new_log, result_names, MarkAction, RecordingInterceptor,
    ShortCircuitInterceptor,
};
use crate::action::builtin::PutParamAction;
use crate::action::{control_registry, ActionRegistry, ActionResult};
use crate::context::ExecutionContext;
use crate::error::ActionError;
use crate::interceptor::{Interceptor, Next, TracingInterceptor};
use crate::interpreter::Run;
use crate::script::{Step, StepKind};

#[tokio::test]
async fn test_first_interceptor_is_outermost() {
    let log = new_log();
    let registry = Arc::new(ActionRegistry::new().with(MarkAction { log: log.clone() }));
    let run = Run::new(case(vec![Step::wait_ms("mark", 0)]), registry)
        .intercept(RecordingInterceptor {
            label: "A",
            log: log.clone(),
        })
        .intercept(RecordingInterceptor {
            label: "B",
            log: log.clone(),
        });

    let outcome = run.run().await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        entries(&log),
        vec!["A-before", "B-before", "T", "B-after", "A-after"]
    );
}

#[tokio::test]
async fn test_chain_wraps_every_dispatch() {
    let log = new_log();
    let registry = Arc::new(ActionRegistry::new().with(MarkAction { log: log.clone() }));
    let run = Run::new(
        case(vec![Step::wait_ms("one", 0), Step::wait_ms("two", 0)]),
        registry,
    )
    .intercept(RecordingInterceptor {
        label: "A",
        log: log.clone(),
    });

    run.run().await;

    assert_eq!(
        entries(&log),
        vec!["A-before", "T", "A-after", "A-before", "T", "A-after"]
    );
}

#[tokio::test]
async fn test_interceptor_can_skip_the_action() {
    let log = new_log();
    let registry = Arc::new(ActionRegistry::new().with(MarkAction { log: log.clone() }));
    let run = Run::new(case(vec![Step::wait_ms("mark", 0)]), registry)
        .intercept(ShortCircuitInterceptor);

    let outcome = run.run().await;

    assert!(outcome.is_success());
    assert!(entries(&log).is_empty());
    assert_eq!(outcome.results[0].data, Some(json!("intercepted")));
}

/// Counts dispatches, guards included
struct CountingInterceptor(Arc<AtomicUsize>);

#[async_trait]
impl Interceptor for CountingInterceptor {
    async fn intercept(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        next: Next<'_>,
    ) -> Result<ActionResult, ActionError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        next.run(step, ctx).await
    }
}

#[tokio::test]
async fn test_loop_guard_checks_go_through_the_chain() {
    let count = Arc::new(AtomicUsize::new(0));
    let run = Run::new(
        case(vec![
            Step::put_param("init", "n", "0"),
            Step::while_("loop", "${n} < 2"),
            Step::put_expression("bump", "n", "${n} + 1"),
            Step::end_while("end"),
        ]),
        Arc::new(control_registry()),
    )
    .intercept(CountingInterceptor(count.clone()));

    let outcome = run.run().await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    // init + 3 guard checks + 2 bumps
    assert_eq!(count.load(Ordering::SeqCst), 6);
    assert_eq!(result_names(&outcome.results), vec!["init", "bump", "bump"]);
}

/// Rewrites `PutParam` values before they reach the action
struct ExclaimValues;

#[async_trait]
impl Interceptor for ExclaimValues {
    async fn intercept(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        next: Next<'_>,
    ) -> Result<ActionResult, ActionError> {
        let mut step = step.clone();
        if let StepKind::PutParam {
            value: Some(value), ..
        } = &mut step.kind
        {
            value.push('!');
        }
        next.run(&step, ctx).await
    }
}

#[tokio::test]
async fn test_interceptor_sees_unexpanded_step_and_may_replace_it() {
    let run = Run::new(
        case(vec![
            Step::put_param("name", "name", "ada"),
            Step::put_param("greet", "greeting", "hi ${name}"),
        ]),
        Arc::new(control_registry()),
    )
    .intercept(ExclaimValues);

    let outcome = run.run().await;

    // Templates expand below the interceptor: it sees `hi ${name}`, not `hi ada!`
    assert_eq!(outcome.params.get("name"), Some(&json!("ada!")));
    assert_eq!(outcome.params.get("greeting"), Some(&json!("hi ada!!")));
    assert_eq!(
        outcome.results[1].step,
        Step::put_param("greet", "greeting", "hi ada!!")
    );
}

#[tokio::test]
async fn test_tracing_interceptor_passes_results_through() {
    let run = Run::new(
        case(vec![
            Step::put_param("set", "x", "1"),
            Step::if_("check", "${x} == 1"),
            Step::end_if("end"),
        ]),
        Arc::new(control_registry()),
    )
    .with_interceptors(vec![Arc::new(TracingInterceptor) as Arc<dyn Interceptor>]);

    let outcome = run.run().await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(result_names(&outcome.results), vec!["set", "check"]);
    assert_eq!(outcome.results[1].data, Some(json!(true)));
}

/// Turns every `Wait` into a `PutParam` recording the wait's name
struct WaitToParam;

#[async_trait]
impl Interceptor for WaitToParam {
    async fn intercept(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        next: Next<'_>,
    ) -> Result<ActionResult, ActionError> {
        match step.kind {
            StepKind::Wait { .. } => {
                let rewritten = Step::put_param(step.name.clone(), "waited", step.name.clone());
                next.run(&rewritten, ctx).await
            }
            _ => next.run(step, ctx).await,
        }
    }
}

#[tokio::test]
async fn test_replaced_step_of_another_kind_reaches_its_own_action() {
    let log = new_log();
    let registry = Arc::new(
        ActionRegistry::new()
            .with(MarkAction { log: log.clone() })
            .with(PutParamAction),
    );
    let run = Run::new(case(vec![Step::wait_ms("nap", 0)]), registry).intercept(WaitToParam);

    let outcome = run.run().await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    // The wait action never ran; the put-param action did
    assert!(entries(&log).is_empty());
    assert_eq!(outcome.params.get("waited"), Some(&json!("nap")));
    assert_eq!(
        outcome.results[0].step,
        Step::put_param("nap", "waited", "nap")
    );
}
