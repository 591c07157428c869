// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use pagewright::errors::PagesError;
use pagewright::pipeline::Pipeline;
use pagewright::run_once;
use pagewright_test_utils::{FakeExecutor, executed_names, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn position(order: &[String], task: &str) -> usize {
    order
        .iter()
        .position(|t| t == task)
        .unwrap_or_else(|| panic!("{task} never ran: {order:?}"))
}

#[tokio::test]
async fn build_runs_clean_before_anything_else() -> TestResult {
    init_tracing();
    let executed = Arc::new(Mutex::new(Vec::new()));

    let report = with_timeout(run_once(&Pipeline::build(), |tx| {
        FakeExecutor::new(tx, Arc::clone(&executed))
    }))
    .await?;

    let order = executed_names(&executed);
    assert_eq!(order.first().map(String::as_str), Some("clean"));
    assert_eq!(order.len(), 8, "every build task runs exactly once: {order:?}");
    assert_eq!(report.succeeded.len(), 8);
    Ok(())
}

#[tokio::test]
async fn useref_waits_for_the_whole_compile() -> TestResult {
    init_tracing();
    let executed = Arc::new(Mutex::new(Vec::new()));

    with_timeout(run_once(&Pipeline::build(), |tx| {
        FakeExecutor::new(tx, Arc::clone(&executed))
    }))
    .await?;

    let order = executed_names(&executed);
    let useref = position(&order, "useref");
    for task in ["style", "script", "page"] {
        assert!(position(&order, task) < useref, "{task} after useref: {order:?}");
    }
    Ok(())
}

#[tokio::test]
async fn one_run_id_per_pipeline() -> TestResult {
    init_tracing();
    let executed = Arc::new(Mutex::new(Vec::new()));

    with_timeout(run_once(&Pipeline::compile(), |tx| {
        FakeExecutor::new(tx, Arc::clone(&executed))
    }))
    .await?;

    let tasks = executed.lock().unwrap().clone();
    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().all(|t| t.run_id == tasks[0].run_id));
    Ok(())
}

#[tokio::test]
async fn failed_task_fails_the_run_and_blocks_dependents() -> TestResult {
    init_tracing();
    let executed = Arc::new(Mutex::new(Vec::new()));

    let result = with_timeout(run_once(&Pipeline::build(), |tx| {
        FakeExecutor::new(tx, Arc::clone(&executed)).failing("script", "unexpected token")
    }))
    .await;

    let Err(PagesError::TaskFailed(failed)) = result else {
        panic!("expected TaskFailed, got {result:?}");
    };
    assert!(failed.contains(&"script".to_string()));
    assert!(failed.contains(&"useref".to_string()));

    let order = executed_names(&executed);
    assert!(!order.contains(&"useref".to_string()), "useref must not start: {order:?}");
    for independent in ["image", "font", "extra"] {
        assert!(order.contains(&independent.to_string()));
    }
    Ok(())
}

#[tokio::test]
async fn develop_starts_the_server_after_compile() -> TestResult {
    init_tracing();
    let executed = Arc::new(Mutex::new(Vec::new()));

    with_timeout(run_once(&Pipeline::develop(), |tx| {
        FakeExecutor::new(tx, Arc::clone(&executed))
    }))
    .await?;

    let order = executed_names(&executed);
    assert_eq!(order.last().map(String::as_str), Some("server"));
    assert_eq!(order.len(), 4);
    Ok(())
}
