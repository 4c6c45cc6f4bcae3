use std::fmt;

use serde::{Deserialize, Serialize};

/// Fan-out strategy declared by a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
  /// Invoke the worker once with the entire batch.
  Whole,
  /// Invoke the worker per item, bounded by `maxConcurrency`.
  Parallel,
  /// Invoke the worker per item, strictly one at a time.
  Loop,
}

impl ProcessType {
  pub const ALL: [ProcessType; 3] = [ProcessType::Whole, ProcessType::Parallel, ProcessType::Loop];

  /// Match a declared process type by exact string equality.
  ///
  /// No trimming or case folding is applied: `"Loop"` and `" loop"` are not
  /// recognized.
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "whole" => Some(ProcessType::Whole),
      "parallel" => Some(ProcessType::Parallel),
      "loop" => Some(ProcessType::Loop),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ProcessType::Whole => "whole",
      ProcessType::Parallel => "parallel",
      ProcessType::Loop => "loop",
    }
  }
}

impl fmt::Display for ProcessType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
