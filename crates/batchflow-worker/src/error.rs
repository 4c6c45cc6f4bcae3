//! Worker errors.

/// Error type a worker may return. Anything goes; the invoker only keeps its message.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A worker invocation that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
  /// The worker returned an error.
  #[error("worker failed: {cause}")]
  Failed { cause: String },

  /// The worker panicked while processing the payload.
  #[error("worker panicked: {message}")]
  Panicked { message: String },

  /// The invocation exceeded the configured per-invocation timeout.
  #[error("worker timed out after {timeout_ms}ms")]
  TimedOut { timeout_ms: u64 },
}

impl WorkerError {
  /// Create a failure from any error message.
  pub fn failed(cause: impl Into<String>) -> Self {
    Self::Failed {
      cause: cause.into(),
    }
  }

  /// The underlying cause as reported to the failure sink.
  pub fn cause(&self) -> String {
    match self {
      WorkerError::Failed { cause } => cause.clone(),
      WorkerError::Panicked { message } => message.clone(),
      WorkerError::TimedOut { .. } => self.to_string(),
    }
  }
}
