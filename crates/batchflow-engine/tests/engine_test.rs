//! Trigger and status query behavior against real stores.

use std::sync::Arc;
use std::time::Duration;

use batchflow_config::{OrchestratorConfig, RunRequest};
use batchflow_engine::{Engine, EngineError};
use batchflow_orchestrator::Orchestrator;
use batchflow_store::{MemoryStore, RunStatus, SqliteStore, Store};
use batchflow_worker::{BoxError, Invoker, worker_fn};
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

fn times_ten() -> Invoker {
  Invoker::new(Arc::new(worker_fn(|item: Value| async move {
    match item.as_i64() {
      Some(3) => Err::<Value, BoxError>("three is not allowed".into()),
      Some(n) => Ok(json!(n * 10)),
      None => Ok(item),
    }
  })))
}

fn engine_with(invoker: Invoker, config: OrchestratorConfig, store: Arc<dyn Store>) -> Engine {
  Engine::new(Orchestrator::new(invoker, config), store)
}

fn memory_engine() -> Engine {
  engine_with(times_ten(), OrchestratorConfig::default(), Arc::new(MemoryStore::new()))
}

/// A worker that blocks until a permit is released.
fn gated() -> (Invoker, Arc<Semaphore>) {
  let gate = Arc::new(Semaphore::new(0));
  let worker_gate = gate.clone();
  let invoker = Invoker::new(Arc::new(worker_fn(move |item: Value| {
    let gate = worker_gate.clone();
    async move {
      let _permit = gate.acquire().await.map_err(|e| Box::new(e) as BoxError)?;
      Ok::<_, BoxError>(item)
    }
  })));
  (invoker, gate)
}

#[tokio::test]
async fn test_run_success_is_described() {
  let engine = memory_engine();

  let handle = engine
    .start(RunRequest::new("parallel", vec![json!(1), json!(2)], Some(2)))
    .await
    .unwrap();
  let run_id = handle.run_id().to_string();
  assert!(run_id.starts_with("execution-"));

  let outcome = handle.wait().await.unwrap();
  assert!(outcome.is_processed());

  let description = engine.describe(&run_id).await.unwrap();
  assert_eq!(description.run_id, run_id);
  assert_eq!(description.status, RunStatus::Succeeded);
  assert_eq!(description.input["processType"], "parallel");
  assert!(description.stop_date.is_some());
  assert_eq!(description.error, None);

  let output = description.output.expect("succeeded run has output");
  assert_eq!(output["results"], json!([10, 20]));
  assert_eq!(output["count"], 2);
  assert_eq!(output["status"], "processed");

  let types: Vec<&str> = description.events.iter().map(|e| e.event_type.as_str()).collect();
  assert_eq!(types.first(), Some(&"run_started"));
  assert_eq!(types.last(), Some(&"run_succeeded"));
  assert_eq!(types.iter().filter(|t| **t == "invocation_succeeded").count(), 2);

  let sequences: Vec<i64> = description.events.iter().map(|e| e.sequence).collect();
  assert_eq!(sequences, (0..sequences.len() as i64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
  let engine = memory_engine();

  let result = engine.describe("execution-does-not-exist").await;
  assert!(
    matches!(result, Err(EngineError::NotFound { ref run_id }) if run_id == "execution-does-not-exist")
  );

  assert!(matches!(
    engine.describe("").await,
    Err(EngineError::InvalidRequest { .. })
  ));
}

#[tokio::test]
async fn test_failed_run_is_distinct_from_not_found() {
  let engine = memory_engine();

  let handle = engine
    .start(RunRequest::new("loop", vec![json!(1), json!(3), json!(5)], None))
    .await
    .unwrap();
  let run_id = handle.run_id().to_string();
  let outcome = handle.wait().await.unwrap();
  assert!(outcome.is_failed());

  let description = engine.describe(&run_id).await.unwrap();
  assert_eq!(description.status, RunStatus::Failed);
  assert_eq!(description.error.as_deref(), Some("WorkerError"));
  assert_eq!(description.cause.as_deref(), Some("three is not allowed"));
  assert_eq!(description.output, None);

  let failed_items: Vec<&Value> = description
    .events
    .iter()
    .filter(|e| e.event_type == "invocation_failed")
    .map(|e| &e.details["index"])
    .collect();
  assert_eq!(failed_items, vec![&json!(1)]);
  assert!(
    !description
      .events
      .iter()
      .any(|e| e.event_type == "invocation_started" && e.details["index"] == json!(2))
  );
}

#[tokio::test]
async fn test_malformed_request_is_recorded_as_failed() {
  let engine = memory_engine();

  let outcome = engine
    .run(RunRequest::from_value(json!({"processType": "sometimes", "items": [1]})))
    .await
    .unwrap();

  let error = outcome.error.expect("malformed request fails");
  assert_eq!(error.error, "ConfigurationError");

  let runs = engine.list_runs().await.unwrap();
  assert_eq!(runs.len(), 1);
  assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_timeout_is_recorded_as_timed_out() {
  let (invoker, _gate) = gated();
  let config = OrchestratorConfig {
    run_timeout_ms: Some(30),
    ..OrchestratorConfig::default()
  };
  let engine = engine_with(invoker, config, Arc::new(MemoryStore::new()));

  let handle = engine
    .start(RunRequest::new("parallel", vec![json!(1), json!(2)], Some(2)))
    .await
    .unwrap();
  let run_id = handle.run_id().to_string();
  handle.wait().await.unwrap();

  let description = engine.describe(&run_id).await.unwrap();
  assert_eq!(description.status, RunStatus::TimedOut);
  assert_eq!(description.error.as_deref(), Some("Timeout"));
}

#[tokio::test]
async fn test_in_flight_run_is_running() {
  let (invoker, gate) = gated();
  let engine = engine_with(invoker, OrchestratorConfig::default(), Arc::new(MemoryStore::new()));

  let handle = engine
    .start(RunRequest::new("whole", vec![json!("a")], None))
    .await
    .unwrap();
  let run_id = handle.run_id().to_string();

  let running = engine.describe(&run_id).await.unwrap();
  assert_eq!(running.status, RunStatus::Running);
  assert!(!running.is_finished());
  assert_eq!(running.stop_date, None);

  gate.add_permits(1);
  handle.wait().await.unwrap();

  let finished = engine.describe(&run_id).await.unwrap();
  assert_eq!(finished.status, RunStatus::Succeeded);
  assert_eq!(finished.output.unwrap()["results"], json!(["a"]));
}

#[tokio::test]
async fn test_cancelled_run_is_aborted() {
  let (invoker, _gate) = gated();
  let engine = engine_with(invoker, OrchestratorConfig::default(), Arc::new(MemoryStore::new()));
  let cancel = CancellationToken::new();

  let handle = engine
    .start_with_cancel(RunRequest::new("loop", vec![json!(1)], None), cancel.clone())
    .await
    .unwrap();
  let run_id = handle.run_id().to_string();

  tokio::time::sleep(Duration::from_millis(10)).await;
  cancel.cancel();

  let outcome = handle.wait().await.unwrap();
  assert_eq!(outcome.error.unwrap().error, "ExecutionAborted");

  let description = engine.describe(&run_id).await.unwrap();
  assert_eq!(description.status, RunStatus::Failed);
  assert_eq!(description.events.last().unwrap().event_type, "run_failed");
}

#[tokio::test]
async fn test_sqlite_backed_engine() {
  let store = Arc::new(SqliteStore::in_memory().await.unwrap());
  let engine = engine_with(times_ten(), OrchestratorConfig::default(), store);

  let handle = engine
    .start(RunRequest::new("loop", vec![json!(4), json!(5)], None))
    .await
    .unwrap();
  let run_id = handle.run_id().to_string();
  handle.wait().await.unwrap();

  let description = engine.describe(&run_id).await.unwrap();
  assert_eq!(description.status, RunStatus::Succeeded);
  assert_eq!(description.output.unwrap()["results"], json!([40, 50]));
  assert!(matches!(
    engine.describe("execution-unknown").await,
    Err(EngineError::NotFound { .. })
  ));
}
