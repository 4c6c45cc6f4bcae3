//! Pauses around the executor phase.

use std::time::Duration;

use async_trait::async_trait;
use batchflow_config::OrchestratorConfig;

/// Where in a run a pause is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// After dispatch, before the first invocation.
  BeforeExecute,
  /// After the executor succeeded, before aggregation.
  AfterExecute,
}

/// Hook invoked around the executor phase. Carries no semantics of its own.
#[async_trait]
pub trait DelayHook: Send + Sync {
  async fn pause(&self, phase: Phase);
}

/// The default hook: never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl DelayHook for NoDelay {
  async fn pause(&self, _phase: Phase) {}
}

/// Sleeps for a fixed duration per phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay {
  pub before: Duration,
  pub after: Duration,
}

impl FixedDelay {
  pub fn from_config(config: &OrchestratorConfig) -> Self {
    Self {
      before: config.delay_before(),
      after: config.delay_after(),
    }
  }

  pub fn is_zero(&self) -> bool {
    self.before.is_zero() && self.after.is_zero()
  }
}

#[async_trait]
impl DelayHook for FixedDelay {
  async fn pause(&self, phase: Phase) {
    let duration = match phase {
      Phase::BeforeExecute => self.before,
      Phase::AfterExecute => self.after,
    };
    if !duration.is_zero() {
      tokio::time::sleep(duration).await;
    }
  }
}
