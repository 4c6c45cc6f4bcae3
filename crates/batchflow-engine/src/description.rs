use batchflow_store::{HistoryEvent, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDescription {
  pub run_id: String,
  pub status: RunStatus,
  pub input: Value,
  /// The run outcome, present once the run succeeded.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<Value>,
  pub start_date: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stop_date: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cause: Option<String>,
  pub events: Vec<DescribedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribedEvent {
  pub sequence: i64,
  pub timestamp: DateTime<Utc>,
  #[serde(rename = "type")]
  pub event_type: String,
  pub details: Value,
}

impl RunDescription {
  pub fn new(record: RunRecord, events: Vec<HistoryEvent>) -> Self {
    Self {
      run_id: record.run_id,
      status: record.status,
      input: record.input.0,
      output: record.output.map(|output| output.0),
      start_date: record.started_at,
      stop_date: record.stopped_at,
      error: record.error,
      cause: record.cause,
      events: events
        .into_iter()
        .map(|event| DescribedEvent {
          sequence: event.sequence,
          timestamp: event.timestamp,
          event_type: event.event_type,
          details: event.details.0,
        })
        .collect(),
    }
  }

  pub fn is_finished(&self) -> bool {
    self.status.is_terminal()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use batchflow_store::Json;
  use chrono::TimeZone;
  use serde_json::json;

  #[test]
  fn test_description_shape() {
    let started = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let mut record = RunRecord::running("execution-1", json!({"processType": "loop"}), started);
    record.status = RunStatus::Failed;
    record.stopped_at = Some(started);
    record.error = Some("WorkerError".to_string());
    record.cause = Some("boom".to_string());

    let events = vec![HistoryEvent {
      run_id: "execution-1".to_string(),
      sequence: 0,
      timestamp: started,
      event_type: "run_started".to_string(),
      details: Json(json!({"type": "run_started"})),
    }];

    let description = RunDescription::new(record, events);
    assert!(description.is_finished());

    let value = serde_json::to_value(&description).unwrap();
    assert_eq!(value["runId"], "execution-1");
    assert_eq!(value["status"], "failed");
    assert_eq!(value["error"], "WorkerError");
    assert_eq!(value["cause"], "boom");
    assert!(value.get("output").is_none());
    assert!(value.get("startDate").is_some());
    assert_eq!(value["events"][0]["type"], "run_started");
    assert_eq!(value["events"][0]["sequence"], 0);
  }

  #[test]
  fn test_running_run_has_no_stop_date() {
    let started = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let record = RunRecord::running("execution-2", json!({}), started);

    let description = RunDescription::new(record, vec![]);
    assert!(!description.is_finished());

    let value = serde_json::to_value(&description).unwrap();
    assert_eq!(value["status"], "running");
    assert!(value.get("stopDate").is_none());
    assert_eq!(value["events"], json!([]));
  }
}
