//! Orchestration errors.

use batchflow_worker::WorkerError;
use thiserror::Error;

/// A trigger that cannot be routed to any executor.
///
/// Always detected before the first worker invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
  /// The trigger carries no `processType`.
  #[error("processType is required")]
  MissingProcessType,

  /// `processType` is present but not one of `whole`, `parallel`, `loop`.
  #[error("unrecognized processType: {value}")]
  UnknownProcessType { value: String },

  /// `items` is absent or not an array.
  #[error("items must be an array")]
  InvalidItems,

  /// Parallel mode without `maxConcurrency`.
  #[error("maxConcurrency is required for parallel processing")]
  MissingMaxConcurrency,

  /// `maxConcurrency` is not a positive integer.
  #[error("maxConcurrency must be a positive integer, got {value}")]
  InvalidMaxConcurrency { value: String },
}

/// Errors that route a run to the failure sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
  /// The trigger was rejected at dispatch.
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),

  /// A worker invocation failed. `index` is `None` for whole-batch invocations.
  #[error("{}", worker_message(.index, .source))]
  Worker {
    index: Option<usize>,
    #[source]
    source: WorkerError,
  },

  /// The run exceeded its wall-clock ceiling.
  #[error("run timed out after {timeout_ms}ms")]
  TimedOut { timeout_ms: u64 },

  /// An in-flight invocation was lost before reporting an outcome.
  #[error("execution aborted: {message}")]
  Aborted { message: String },
}

/// Failure label for a run that exceeded its wall-clock ceiling.
pub const TIMEOUT_LABEL: &str = "Timeout";

fn worker_message(index: &Option<usize>, source: &WorkerError) -> String {
  match index {
    Some(index) => format!("item {} failed: {}", index, source),
    None => format!("batch failed: {}", source),
  }
}

impl ExecutionError {
  /// Fixed label recorded by the failure sink.
  pub fn label(&self) -> &'static str {
    match self {
      ExecutionError::Configuration(_) => "ConfigurationError",
      ExecutionError::Worker { .. } => "WorkerError",
      ExecutionError::TimedOut { .. } => TIMEOUT_LABEL,
      ExecutionError::Aborted { .. } => "ExecutionAborted",
    }
  }

  /// The cause recorded by the failure sink.
  pub fn cause(&self) -> String {
    match self {
      ExecutionError::Worker { source, .. } => source.cause(),
      other => other.to_string(),
    }
  }
}
