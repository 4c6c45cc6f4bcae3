use thiserror::Error;

/// Errors surfaced by the trigger and status interfaces.
///
/// A run that executed and failed is not an error here; its failure lives in
/// the run's outcome and description.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("run not found: {run_id}")]
  NotFound { run_id: String },

  #[error("invalid request: {message}")]
  InvalidRequest { message: String },

  #[error("store error: {0}")]
  Store(#[source] batchflow_store::Error),

  #[error("failed to serialize run outcome: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("run task did not complete: {message}")]
  Join { message: String },

  #[error("runner channel closed")]
  ChannelClosed,
}

impl From<batchflow_store::Error> for EngineError {
  fn from(error: batchflow_store::Error) -> Self {
    match error {
      batchflow_store::Error::NotFound(run_id) => EngineError::NotFound { run_id },
      other => EngineError::Store(other),
    }
  }
}
