//! Tests for run-ending failures

use std::sync::Arc;

use super::helpers::{
    case, control_registry_with, result_names, run_steps, BrokenInputAction, RefusingInputAction,
};
use crate::action::control_registry;
use crate::error::RunError;
use crate::expr::EvalError;
use crate::interpreter::{Run, RunSettings};
use crate::script::{Step, StepType};
use crate::template::MissingParamPolicy;

#[tokio::test]
async fn test_unsupported_step_halts_run() {
    let outcome = run_steps(vec![
        Step::put_param("before", "a", "1"),
        Step::open_browser("browser"),
        Step::put_param("after", "b", "1"),
    ])
    .await;

    assert!(matches!(
        &outcome.error,
        Some(RunError::UnsupportedStep { name, step_type: StepType::OpenBrowser }) if name == "browser"
    ));
    // No record for the unsupported step and nothing after it
    assert_eq!(result_names(&outcome.results), vec!["before"]);
    assert!(!outcome.params.contains("b"));
}

#[tokio::test]
async fn test_action_error_emits_failure_record() {
    let run = Run::new(
        case(vec![
            Step::put_param("before", "a", "1"),
            Step::input_text("type", "#missing", "text", true),
            Step::put_param("after", "b", "1"),
        ]),
        control_registry_with(BrokenInputAction),
    );
    let outcome = run.run().await;

    assert_eq!(result_names(&outcome.results), vec!["before", "type"]);
    let failure = &outcome.results[1];
    assert!(!failure.success);
    assert_eq!(failure.error.as_deref(), Some("element not found"));
    assert!(matches!(
        &outcome.error,
        Some(RunError::ActionExecution { name, message }) if name == "type" && message == "element not found"
    ));
    assert!(!outcome.params.contains("b"));
}

#[tokio::test]
async fn test_failed_result_ends_run() {
    let run = Run::new(
        case(vec![
            Step::input_text("type", "#ro", "text", false),
            Step::put_param("after", "b", "1"),
        ]),
        control_registry_with(RefusingInputAction),
    );
    let outcome = run.run().await;

    assert_eq!(result_names(&outcome.results), vec!["type"]);
    assert!(!outcome.results[0].success);
    assert!(matches!(
        &outcome.error,
        Some(RunError::ActionExecution { message, .. }) if message == "field is read-only"
    ));
}

#[tokio::test]
async fn test_failure_inside_loop_interrupts_it() {
    let run = Run::new(
        case(vec![
            Step::put_param("init", "count", "0"),
            Step::while_("loop", "${count} < 5"),
            Step::put_expression("bump", "count", "${count} + 1"),
            Step::input_text("type", "#missing", "x", true),
            Step::end_while("end"),
            Step::put_param("after", "done", "yes"),
        ]),
        control_registry_with(BrokenInputAction),
    );
    let outcome = run.run().await;

    assert_eq!(result_names(&outcome.results), vec!["init", "bump", "type"]);
    assert_eq!(outcome.params.get("count"), Some(&serde_json::json!(1)));
    assert!(!outcome.params.contains("done"));
}

#[tokio::test]
async fn test_bad_guard_expression_is_evaluation_error() {
    let outcome = run_steps(vec![
        Step::if_("check", "1 <"),
        Step::put_param("then", "x", "1"),
        Step::end_if("end"),
    ])
    .await;

    assert!(matches!(
        &outcome.error,
        Some(RunError::ExpressionEvaluation { name, source: EvalError::Parse { .. } }) if name == "check"
    ));
    assert_eq!(outcome.results.len(), 1);
    assert!(!outcome.results[0].success);
}

#[tokio::test]
async fn test_identifier_in_expression_is_rejected() {
    let outcome = run_steps(vec![Step::put_expression("compute", "x", "count + 1")]).await;

    assert!(matches!(
        &outcome.error,
        Some(RunError::ExpressionEvaluation { source: EvalError::UnknownIdentifier(id), .. }) if id == "count"
    ));
    assert!(!outcome.params.contains("x"));
}

#[tokio::test]
async fn test_unbalanced_block_dispatches_nothing() {
    let outcome = run_steps(vec![
        Step::put_param("before", "a", "1"),
        Step::end_while("stray"),
    ])
    .await;

    assert!(matches!(
        outcome.error,
        Some(RunError::UnbalancedBlock { index: 1, marker: StepType::EndWhile })
    ));
    assert!(outcome.results.is_empty());
    assert!(outcome.params.is_empty());
}

#[tokio::test]
async fn test_missing_parameter_policies() {
    let steps = vec![Step::put_param("greet", "greeting", "hello ${nobody}")];

    let lenient = run_steps(steps.clone()).await;
    assert!(lenient.is_success());
    assert_eq!(
        lenient.params.get("greeting"),
        Some(&serde_json::json!("hello "))
    );

    let strict = Run::new(case(steps), Arc::new(control_registry()))
        .with_settings(RunSettings {
            missing_params: MissingParamPolicy::Strict,
            ..RunSettings::default()
        })
        .run()
        .await;
    assert!(matches!(
        &strict.error,
        Some(RunError::ActionExecution { message, .. }) if message.contains("nobody")
    ));
    assert_eq!(strict.results.len(), 1);
    assert!(!strict.results[0].success);
}

#[tokio::test]
async fn test_into_result() {
    let ok = run_steps(vec![Step::put_param("a", "a", "1")]).await;
    assert_eq!(ok.into_result().unwrap().len(), 1);

    let failed = run_steps(vec![Step::close_browser("close")]).await;
    assert!(matches!(
        failed.into_result(),
        Err(RunError::UnsupportedStep { .. })
    ));
}
