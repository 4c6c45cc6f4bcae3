//! Trigger request for a single run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured trigger `{processType, items, maxConcurrency?}`.
///
/// The request wraps the raw JSON so it can be echoed back verbatim as the
/// run's `originalInput`, and so that malformed shapes are reported by the
/// dispatcher rather than rejected while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunRequest(Value);

impl RunRequest {
  /// Build a well-formed request.
  pub fn new(process_type: &str, items: Vec<Value>, max_concurrency: Option<u64>) -> Self {
    let mut body = serde_json::Map::new();
    body.insert("processType".to_string(), Value::from(process_type));
    body.insert("items".to_string(), Value::Array(items));
    if let Some(max) = max_concurrency {
      body.insert("maxConcurrency".to_string(), Value::from(max));
    }
    Self(Value::Object(body))
  }

  /// Wrap an arbitrary JSON value. Never fails.
  pub fn from_value(value: Value) -> Self {
    Self(value)
  }

  /// The declared `processType`, if present and a string.
  pub fn process_type(&self) -> Option<&str> {
    self.0.get("processType").and_then(Value::as_str)
  }

  /// The `items` array, if present and an array.
  pub fn items(&self) -> Option<&[Value]> {
    self.0.get("items").and_then(Value::as_array).map(Vec::as_slice)
  }

  /// The raw `maxConcurrency` value. Interpretation is left to the dispatcher.
  pub fn max_concurrency(&self) -> Option<&Value> {
    self.0.get("maxConcurrency").filter(|v| !v.is_null())
  }

  pub fn as_value(&self) -> &Value {
    &self.0
  }

  pub fn into_value(self) -> Value {
    self.0
  }
}

impl From<Value> for RunRequest {
  fn from(value: Value) -> Self {
    Self::from_value(value)
  }
}
