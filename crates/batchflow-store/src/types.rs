use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Status of a run as recorded in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RunStatus {
  Running,
  Succeeded,
  Failed,
  TimedOut,
}

impl RunStatus {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, RunStatus::Running)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      RunStatus::Running => "running",
      RunStatus::Succeeded => "succeeded",
      RunStatus::Failed => "failed",
      RunStatus::TimedOut => "timed_out",
    }
  }
}

impl std::fmt::Display for RunStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A run as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RunRecord {
  pub run_id: String,
  pub status: RunStatus,
  pub input: Json<serde_json::Value>,
  pub output: Option<Json<serde_json::Value>>,
  pub started_at: DateTime<Utc>,
  pub stopped_at: Option<DateTime<Utc>>,
  pub error: Option<String>,
  pub cause: Option<String>,
}

impl RunRecord {
  /// A freshly triggered run.
  pub fn running(run_id: impl Into<String>, input: serde_json::Value, started_at: DateTime<Utc>) -> Self {
    Self {
      run_id: run_id.into(),
      status: RunStatus::Running,
      input: Json(input),
      output: None,
      started_at,
      stopped_at: None,
      error: None,
      cause: None,
    }
  }

  /// Apply a terminal update in place.
  pub fn complete(&mut self, completion: &RunCompletion) {
    self.status = completion.status;
    self.output = completion.output.clone().map(Json);
    self.stopped_at = Some(completion.stopped_at);
    self.error = completion.error.clone();
    self.cause = completion.cause.clone();
  }
}

/// Terminal fields written when a run stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCompletion {
  pub status: RunStatus,
  pub output: Option<serde_json::Value>,
  pub stopped_at: DateTime<Utc>,
  pub error: Option<String>,
  pub cause: Option<String>,
}

/// One entry in a run's execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HistoryEvent {
  pub run_id: String,
  pub sequence: i64,
  pub timestamp: DateTime<Utc>,
  pub event_type: String,
  pub details: Json<serde_json::Value>,
}
