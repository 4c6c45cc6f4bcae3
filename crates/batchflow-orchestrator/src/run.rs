//! Runs and their validated processing mode.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde_json::Value;

use crate::state::State;

/// Generate a run correlation id.
pub fn new_run_id() -> String {
  format!("execution-{}", uuid::Uuid::new_v4())
}

/// A routing decision that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// One invocation with the whole batch.
  WholeBatch,
  /// Per-item invocations, at most `max_concurrency` in flight.
  Parallel { max_concurrency: NonZeroUsize },
  /// Per-item invocations, strictly in order, stopping at the first failure.
  Loop,
}

impl Mode {
  /// The executor state this mode runs in.
  pub fn state(&self) -> State {
    match self {
      Mode::WholeBatch => State::WholeBatch,
      Mode::Parallel { .. } => State::Parallel,
      Mode::Loop => State::Loop,
    }
  }
}

/// One invocation of the orchestrator.
///
/// Immutable once created. `items` is shared read-only with the executor's
/// in-flight invocations.
#[derive(Debug, Clone)]
pub struct Run {
  pub run_id: String,
  pub mode: Mode,
  pub items: Arc<[Value]>,
  /// The trigger exactly as received.
  pub original_input: Value,
}

impl Run {
  pub fn new(run_id: impl Into<String>, mode: Mode, items: Vec<Value>, original_input: Value) -> Self {
    Self {
      run_id: run_id.into(),
      mode,
      items: items.into(),
      original_input,
    }
  }
}
