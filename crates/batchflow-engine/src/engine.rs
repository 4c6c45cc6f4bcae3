//! Trigger and status interfaces over the orchestrator and the run registry.

use std::sync::Arc;

use batchflow_config::RunRequest;
use batchflow_orchestrator::{
  ChannelNotifier, ExecutionError, ExecutionEvent, ExecutionNotifier, Orchestrator, RunOutcome,
  RunStatus as OutcomeStatus, State, fail, new_run_id,
};
use batchflow_store::{HistoryEvent, Json, RunCompletion, RunRecord, RunStatus, Store};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::description::RunDescription;
use crate::error::EngineError;

/// Starts runs, records them in the store, and answers status queries.
pub struct Engine {
  orchestrator: Arc<Orchestrator>,
  store: Arc<dyn Store>,
}

/// A run started in the background.
pub struct RunHandle {
  run_id: String,
  task: JoinHandle<Result<RunOutcome, EngineError>>,
}

impl RunHandle {
  /// The correlation id assigned at trigger time.
  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Wait for the run to reach a terminal state and be recorded.
  pub async fn wait(self) -> Result<RunOutcome, EngineError> {
    self.task.await.map_err(|e| EngineError::Join {
      message: e.to_string(),
    })?
  }
}

impl Engine {
  pub fn new(orchestrator: Orchestrator, store: Arc<dyn Store>) -> Self {
    Self {
      orchestrator: Arc::new(orchestrator),
      store,
    }
  }

  /// Trigger a run and return as soon as it is registered.
  pub async fn start(&self, request: RunRequest) -> Result<RunHandle, EngineError> {
    self.start_with_cancel(request, CancellationToken::new()).await
  }

  /// Trigger a run that is aborted when `cancel` fires.
  ///
  /// An aborted run is recorded as failed with the `ExecutionAborted` label.
  #[instrument(name = "run_trigger", skip(self, request, cancel))]
  pub async fn start_with_cancel(
    &self,
    request: RunRequest,
    cancel: CancellationToken,
  ) -> Result<RunHandle, EngineError> {
    let run_id = new_run_id();
    self
      .store
      .create_run(&RunRecord::running(&run_id, request.as_value().clone(), Utc::now()))
      .await?;
    info!(run_id = %run_id, "run_registered");

    let (sender, receiver) = mpsc::unbounded_channel();
    let recorder = tokio::spawn(record_history(self.store.clone(), run_id.clone(), receiver));
    let notifier: Arc<dyn ExecutionNotifier> = Arc::new(ChannelNotifier::new(sender));

    let orchestrator = self.orchestrator.clone();
    let store = self.store.clone();
    let id = run_id.clone();

    let task = tokio::spawn(async move {
      let input = request.as_value().clone();
      let outcome = tokio::select! {
        outcome = orchestrator.execute_with(&id, request, notifier.clone()) => outcome,
        _ = cancel.cancelled() => abort(&id, input, &notifier),
      };
      drop(notifier);

      match recorder.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(run_id = %id, error = %e, "history_record_failed"),
        Err(e) => error!(run_id = %id, error = %e, "history_recorder_panicked"),
      }

      store.complete_run(&id, &completion_for(&outcome)?).await?;
      info!(run_id = %id, status = ?outcome.status, count = outcome.count, "run_recorded");
      Ok::<_, EngineError>(outcome)
    });

    Ok(RunHandle { run_id, task })
  }

  /// Trigger a run and wait for its outcome.
  pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, EngineError> {
    self.start(request).await?.wait().await
  }

  /// Describe a run by correlation id.
  ///
  /// An id that was never issued is [`EngineError::NotFound`], which is
  /// distinct from a run that exists and failed.
  pub async fn describe(&self, run_id: &str) -> Result<RunDescription, EngineError> {
    if run_id.trim().is_empty() {
      return Err(EngineError::InvalidRequest {
        message: "run id is required".to_string(),
      });
    }

    let record = self.store.get_run(run_id).await?;
    let events = self.store.list_events(run_id).await?;
    Ok(RunDescription::new(record, events))
  }

  /// All registered runs, most recent first.
  pub async fn list_runs(&self) -> Result<Vec<RunRecord>, EngineError> {
    Ok(self.store.list_runs().await?)
  }
}

fn abort(run_id: &str, input: Value, notifier: &Arc<dyn ExecutionNotifier>) -> RunOutcome {
  let e = ExecutionError::Aborted {
    message: "run cancelled".to_string(),
  };
  warn!(run_id = %run_id, "run_aborted");

  notifier.notify(ExecutionEvent::StateEntered {
    run_id: run_id.to_string(),
    state: State::Failed,
  });
  notifier.notify(ExecutionEvent::RunFailed {
    run_id: run_id.to_string(),
    error: e.label().to_string(),
    cause: e.cause(),
  });

  fail(input, &e)
}

/// Registry status and terminal fields for an outcome.
fn completion_for(outcome: &RunOutcome) -> Result<RunCompletion, serde_json::Error> {
  let completion = match (&outcome.status, &outcome.error) {
    (OutcomeStatus::Processed, _) => RunCompletion {
      status: RunStatus::Succeeded,
      output: Some(serde_json::to_value(outcome)?),
      stopped_at: outcome.processed_at,
      error: None,
      cause: None,
    },
    (OutcomeStatus::Failed, error) => RunCompletion {
      status: match error {
        Some(detail) if detail.is_timeout() => RunStatus::TimedOut,
        _ => RunStatus::Failed,
      },
      output: None,
      stopped_at: outcome.processed_at,
      error: error.as_ref().map(|detail| detail.error.clone()),
      cause: error.as_ref().map(|detail| detail.cause.clone()),
    },
  };
  Ok(completion)
}

/// Persist events in arrival order until every sender is gone.
async fn record_history(
  store: Arc<dyn Store>,
  run_id: String,
  mut receiver: mpsc::UnboundedReceiver<ExecutionEvent>,
) -> Result<(), batchflow_store::Error> {
  let mut sequence = 0;
  while let Some(event) = receiver.recv().await {
    let details = serde_json::to_value(&event).unwrap_or_else(|e| {
      warn!(run_id = %run_id, error = %e, "event_serialize_failed");
      Value::Null
    });

    store
      .append_event(&HistoryEvent {
        run_id: run_id.clone(),
        sequence,
        timestamp: Utc::now(),
        event_type: event.event_type().to_string(),
        details: Json(details),
      })
      .await?;
    sequence += 1;
  }
  Ok(())
}
