//! Execution events and notifiers for observability.
//!
//! Events are emitted during a run so consumers can observe progress, persist
//! execution history, stream to a UI, etc.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::State;

/// Events emitted during a run.
///
/// `index` is the item position for per-item invocations and `None` for the
/// single whole-batch invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
  /// The trigger was accepted.
  RunStarted {
    run_id: String,
    input: serde_json::Value,
  },

  /// The state machine entered a state.
  StateEntered { run_id: String, state: State },

  /// A worker invocation was dispatched.
  InvocationStarted {
    run_id: String,
    index: Option<usize>,
  },

  /// A worker invocation returned a result.
  InvocationSucceeded {
    run_id: String,
    index: Option<usize>,
    output: serde_json::Value,
  },

  /// A worker invocation failed.
  InvocationFailed {
    run_id: String,
    index: Option<usize>,
    error: String,
  },

  /// The run reached `Aggregate`.
  RunSucceeded { run_id: String, count: usize },

  /// The run reached `Failed`.
  RunFailed {
    run_id: String,
    error: String,
    cause: String,
  },
}

impl ExecutionEvent {
  pub fn run_id(&self) -> &str {
    match self {
      ExecutionEvent::RunStarted { run_id, .. }
      | ExecutionEvent::StateEntered { run_id, .. }
      | ExecutionEvent::InvocationStarted { run_id, .. }
      | ExecutionEvent::InvocationSucceeded { run_id, .. }
      | ExecutionEvent::InvocationFailed { run_id, .. }
      | ExecutionEvent::RunSucceeded { run_id, .. }
      | ExecutionEvent::RunFailed { run_id, .. } => run_id,
    }
  }

  /// Stable snake_case name, matching the serialized `type` tag.
  pub fn event_type(&self) -> &'static str {
    match self {
      ExecutionEvent::RunStarted { .. } => "run_started",
      ExecutionEvent::StateEntered { .. } => "state_entered",
      ExecutionEvent::InvocationStarted { .. } => "invocation_started",
      ExecutionEvent::InvocationSucceeded { .. } => "invocation_succeeded",
      ExecutionEvent::InvocationFailed { .. } => "invocation_failed",
      ExecutionEvent::RunSucceeded { .. } => "run_succeeded",
      ExecutionEvent::RunFailed { .. } => "run_failed",
    }
  }
}

/// Trait for receiving execution events.
///
/// The orchestrator calls `notify` for each event; implementations decide
/// what to do with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  /// Called when an execution event occurs.
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Use this when events are consumed asynchronously, e.g. persisted as run
/// history by the engine.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a run; volume is a handful of
  // events per item.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
