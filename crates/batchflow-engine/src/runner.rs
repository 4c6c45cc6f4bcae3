//! Run trigger loop fed by a channel.
//!
//! The `Runner` owns an mpsc channel of trigger requests and starts a run on
//! the `Engine` for each one it receives.

use std::sync::Arc;

use batchflow_config::RunRequest;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::{Engine, RunHandle};
use crate::error::EngineError;

/// Starts a run per received request.
///
/// # Usage
///
/// ```ignore
/// let runner = Runner::new(engine);
///
/// // Hand out senders to whatever produces triggers
/// let sender = runner.sender();
///
/// // Run until cancelled or every sender is dropped
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await?;
/// ```
pub struct Runner {
  sender: mpsc::Sender<RunRequest>,
  receiver: mpsc::Receiver<RunRequest>,
  engine: Arc<Engine>,
}

impl Runner {
  pub fn new(engine: Arc<Engine>) -> Self {
    Self::with_buffer_size(engine, 100)
  }

  pub fn with_buffer_size(engine: Arc<Engine>, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      engine,
    }
  }

  /// A sender handle for submitting trigger requests.
  pub fn sender(&self) -> mpsc::Sender<RunRequest> {
    self.sender.clone()
  }

  /// Queue a trigger request.
  pub async fn submit(&self, request: RunRequest) -> Result<(), EngineError> {
    self
      .sender
      .send(request)
      .await
      .map_err(|_| EngineError::ChannelClosed)
  }

  /// Run the trigger loop.
  ///
  /// Returns once the token is cancelled or every handed-out sender has been
  /// dropped, after all runs it started have been recorded. Cancellation
  /// aborts runs still in flight.
  pub async fn start(self, cancel: CancellationToken) -> Result<(), EngineError> {
    let Runner {
      sender,
      mut receiver,
      engine,
    } = self;
    drop(sender);

    info!("runner_started");
    let mut in_flight = JoinSet::new();

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(in_flight = in_flight.len(), "runner_cancelled");
          break;
        }
        request = receiver.recv() => {
          match request {
            Some(request) => match engine.start_with_cancel(request, cancel.child_token()).await {
              Ok(handle) => {
                info!(run_id = %handle.run_id(), "run_triggered");
                in_flight.spawn(report(handle));
              }
              Err(e) => error!(error = %e, "run_trigger_failed"),
            },
            None => {
              info!("runner_channel_closed");
              break;
            }
          }
        }
        Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
      }
    }

    while in_flight.join_next().await.is_some() {}
    info!("runner_stopped");
    Ok(())
  }
}

async fn report(handle: RunHandle) {
  let run_id = handle.run_id().to_string();
  match handle.wait().await {
    Ok(outcome) if outcome.is_processed() => {
      info!(run_id = %run_id, count = outcome.count, "run_processed");
    }
    Ok(outcome) => {
      let (label, cause) = outcome
        .error
        .map(|detail| (detail.error, detail.cause))
        .unwrap_or_default();
      error!(run_id = %run_id, error = %label, cause = %cause, "run_failed");
    }
    Err(e) => error!(run_id = %run_id, error = %e, "run_record_failed"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use batchflow_config::OrchestratorConfig;
  use batchflow_orchestrator::Orchestrator;
  use batchflow_store::MemoryStore;
  use batchflow_worker::{BoxError, Invoker, worker_fn};
  use serde_json::{Value, json};
  use std::time::Duration;

  fn create_test_engine() -> Arc<Engine> {
    let invoker = Invoker::new(Arc::new(worker_fn(|item: Value| async move {
      Ok::<_, BoxError>(item)
    })));
    let orchestrator = Orchestrator::new(invoker, OrchestratorConfig::default());
    Arc::new(Engine::new(orchestrator, Arc::new(MemoryStore::new())))
  }

  #[tokio::test]
  async fn test_sender_cloning() {
    let runner = Runner::new(create_test_engine());

    let sender1 = runner.sender();
    let sender2 = runner.sender();

    assert!(!sender1.is_closed());
    assert!(!sender2.is_closed());
  }

  #[tokio::test]
  async fn test_submit_sends_to_channel() {
    let mut runner = Runner::new(create_test_engine());

    runner
      .submit(RunRequest::new("loop", vec![json!(1)], None))
      .await
      .unwrap();

    let received = runner.receiver.recv().await.unwrap();
    assert_eq!(received.process_type(), Some("loop"));
  }

  #[tokio::test]
  async fn test_cancellation() {
    let runner = Runner::new(create_test_engine());
    let _sender = runner.sender();

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    let handle = tokio::spawn(async move { runner.start(cancel_clone).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let result = handle.await.unwrap();
    assert!(result.is_ok());
  }

  #[tokio::test]
  async fn test_stops_when_senders_dropped() {
    let engine = create_test_engine();
    let runner = Runner::new(engine.clone());
    let sender = runner.sender();

    let handle = tokio::spawn(runner.start(CancellationToken::new()));

    sender
      .send(RunRequest::new("parallel", vec![json!(1), json!(2)], Some(2)))
      .await
      .unwrap();
    sender
      .send(RunRequest::new("bogus", vec![], None))
      .await
      .unwrap();
    drop(sender);

    handle.await.unwrap().unwrap();

    let runs = engine.list_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|run| run.status.is_terminal()));
  }
}
