//! Run outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TIMEOUT_LABEL;

/// What an executor produced on success.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorOutput {
  /// The single output of a whole-batch invocation.
  Batch(Value),
  /// Per-item outputs, in input order.
  Items(Vec<Value>),
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Processed,
  Failed,
}

/// Error recorded by the failure sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
  /// Fixed label for the kind of failure.
  pub error: String,
  /// Opaque cause.
  pub cause: String,
}

impl FailureDetail {
  pub fn is_timeout(&self) -> bool {
    self.error == TIMEOUT_LABEL
  }
}

/// The final reported state of a run.
///
/// Either every invocation succeeded and `results` is present, or the run
/// failed and `error` is present. There is no partial result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
  pub original_input: Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub results: Option<Value>,
  pub count: usize,
  pub processed_at: DateTime<Utc>,
  pub status: RunStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<FailureDetail>,
}

impl RunOutcome {
  pub fn is_processed(&self) -> bool {
    self.status == RunStatus::Processed
  }

  pub fn is_failed(&self) -> bool {
    self.status == RunStatus::Failed
  }
}
