//! Failure sink.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::ExecutionError;
use crate::outcome::{FailureDetail, RunOutcome, RunStatus};

/// Terminal failure for a run, stamped now. Never fails.
pub fn fail(original_input: Value, error: &ExecutionError) -> RunOutcome {
  fail_at(original_input, error, Utc::now())
}

/// Terminal failure for a run. Discards any partial results.
pub fn fail_at(original_input: Value, error: &ExecutionError, processed_at: DateTime<Utc>) -> RunOutcome {
  RunOutcome {
    original_input,
    results: None,
    count: 0,
    processed_at,
    status: RunStatus::Failed,
    error: Some(FailureDetail {
      error: error.label().to_string(),
      cause: error.cause(),
    }),
  }
}
