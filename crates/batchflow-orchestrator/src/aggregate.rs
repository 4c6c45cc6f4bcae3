//! Result aggregation.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::outcome::{ExecutorOutput, RunOutcome, RunStatus};
use crate::run::Run;

/// Merge a successful executor output with run metadata, stamped now.
pub fn aggregate(run: &Run, output: ExecutorOutput) -> RunOutcome {
  aggregate_at(run, output, Utc::now())
}

/// Merge a successful executor output with run metadata.
///
/// Pure: the result depends only on the arguments. For whole-batch output,
/// `count` is the length of the worker's output when it is an array and 1
/// otherwise.
pub fn aggregate_at(run: &Run, output: ExecutorOutput, processed_at: DateTime<Utc>) -> RunOutcome {
  let (results, count) = match output {
    ExecutorOutput::Items(items) => {
      let count = items.len();
      (Value::Array(items), count)
    }
    ExecutorOutput::Batch(value) => {
      let count = value.as_array().map_or(1, Vec::len);
      (value, count)
    }
  };

  RunOutcome {
    original_input: run.original_input.clone(),
    results: Some(results),
    count,
    processed_at,
    status: RunStatus::Processed,
    error: None,
  }
}
