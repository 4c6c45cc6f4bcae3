//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-clock ceiling for a run (five minutes).
pub const DEFAULT_RUN_TIMEOUT_MS: u64 = 300_000;

/// Tunables for the orchestrator, loaded from a JSON file by the CLI.
///
/// ```json
/// {
///   "runTimeoutMs": 300000,
///   "invocationTimeoutMs": 3000,
///   "delayBeforeMs": 0,
///   "delayAfterMs": 5000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorConfig {
  /// Wall-clock ceiling for a whole run. `None` disables the ceiling.
  pub run_timeout_ms: Option<u64>,
  /// Ceiling for a single worker invocation.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub invocation_timeout_ms: Option<u64>,
  /// Pause before the executor phase.
  pub delay_before_ms: u64,
  /// Pause after the executor phase, before the terminal state.
  pub delay_after_ms: u64,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      run_timeout_ms: Some(DEFAULT_RUN_TIMEOUT_MS),
      invocation_timeout_ms: None,
      delay_before_ms: 0,
      delay_after_ms: 0,
    }
  }
}

impl OrchestratorConfig {
  pub fn run_timeout(&self) -> Option<Duration> {
    self.run_timeout_ms.map(Duration::from_millis)
  }

  pub fn invocation_timeout(&self) -> Option<Duration> {
    self.invocation_timeout_ms.map(Duration::from_millis)
  }

  pub fn delay_before(&self) -> Duration {
    Duration::from_millis(self.delay_before_ms)
  }

  pub fn delay_after(&self) -> Duration {
    Duration::from_millis(self.delay_after_ms)
  }
}
