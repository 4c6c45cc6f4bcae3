//! Orchestrator states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// States of the two-level run state machine.
///
/// ```text
///            ┌──────────► WholeBatch ─┐
///            │                        ├──► Aggregate
/// Start ─────┼──────────► Parallel ───┤
///            │                        ├──► Failed
///            ├──────────► Loop ───────┘
///            │
///            └──────────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
  Start,
  WholeBatch,
  Parallel,
  Loop,
  Aggregate,
  Failed,
}

impl State {
  pub fn is_terminal(&self) -> bool {
    matches!(self, State::Aggregate | State::Failed)
  }

  /// Whether the state machine permits moving from `self` to `next`.
  pub fn can_transition_to(&self, next: State) -> bool {
    match self {
      State::Start => matches!(
        next,
        State::WholeBatch | State::Parallel | State::Loop | State::Failed
      ),
      State::WholeBatch | State::Parallel | State::Loop => {
        matches!(next, State::Aggregate | State::Failed)
      }
      State::Aggregate | State::Failed => false,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      State::Start => "start",
      State::WholeBatch => "whole_batch",
      State::Parallel => "parallel",
      State::Loop => "loop",
      State::Aggregate => "aggregate",
      State::Failed => "failed",
    }
  }
}

impl fmt::Display for State {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
