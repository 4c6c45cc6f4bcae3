//! Worker invoker.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::error::WorkerError;
use crate::worker::Worker;

/// Outcome of one invocation: the worker's output or a typed error.
pub type ItemOutcome = Result<Value, WorkerError>;

/// What a single invocation is processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationTarget {
  /// The entire batch as one payload.
  Batch,
  /// The item at this input position.
  Item(usize),
}

impl fmt::Display for InvocationTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InvocationTarget::Batch => f.write_str("batch"),
      InvocationTarget::Item(index) => write!(f, "item[{}]", index),
    }
  }
}

/// Calls the worker and normalizes whatever happens into an [`ItemOutcome`].
///
/// Errors returned by the worker, panics raised inside it, and invocations that
/// outlive the optional timeout all become a [`WorkerError`]. Cheap to clone;
/// clones share the worker.
#[derive(Clone)]
pub struct Invoker {
  worker: Arc<dyn Worker>,
  timeout: Option<Duration>,
}

impl Invoker {
  /// Create an invoker with no per-invocation timeout.
  pub fn new(worker: Arc<dyn Worker>) -> Self {
    Self {
      worker,
      timeout: None,
    }
  }

  /// Bound every invocation by `timeout`.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  /// Invoke the worker once.
  #[instrument(
    name = "worker_invoke",
    skip(self, payload),
    fields(
      run_id = %run_id,
      target = %target,
    )
  )]
  pub async fn invoke(&self, run_id: &str, target: InvocationTarget, payload: Value) -> ItemOutcome {
    info!("invocation started");
    debug!(payload = %payload, "invocation payload");

    let outcome = self.invoke_inner(payload).await;

    match &outcome {
      Ok(output) => {
        info!("invocation completed");
        debug!(output = %output, "invocation output");
      }
      Err(e) => {
        error!(error = %e, "invocation failed");
      }
    }

    outcome
  }

  async fn invoke_inner(&self, payload: Value) -> ItemOutcome {
    let call = AssertUnwindSafe(self.worker.invoke(payload)).catch_unwind();

    let caught = match self.timeout {
      Some(timeout) => match tokio::time::timeout(timeout, call).await {
        Ok(caught) => caught,
        Err(_) => {
          return Err(WorkerError::TimedOut {
            timeout_ms: timeout.as_millis() as u64,
          });
        }
      },
      None => call.await,
    };

    match caught {
      Ok(Ok(output)) => Ok(output),
      Ok(Err(e)) => Err(WorkerError::failed(e.to_string())),
      Err(panic) => Err(WorkerError::Panicked {
        message: panic_message(panic.as_ref()),
      }),
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
