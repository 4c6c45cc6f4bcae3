//! The run state machine.

use std::sync::Arc;

use batchflow_config::{OrchestratorConfig, RunRequest};
use batchflow_worker::Invoker;
use tracing::{error, info, instrument};

use crate::aggregate::aggregate;
use crate::delay::{DelayHook, FixedDelay, NoDelay, Phase};
use crate::dispatcher::dispatch;
use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::executor::{ExecutionContext, execute_bounded, execute_loop, execute_whole};
use crate::failure::fail;
use crate::outcome::{ExecutorOutput, RunOutcome};
use crate::run::{Mode, new_run_id};
use crate::state::State;

/// Routes triggers through dispatch, one executor, and a terminal state.
///
/// Holds no per-run state; one orchestrator can drive any number of
/// concurrent runs.
pub struct Orchestrator {
  invoker: Invoker,
  config: OrchestratorConfig,
  delay: Arc<dyn DelayHook>,
}

impl Orchestrator {
  /// Create an orchestrator.
  ///
  /// The invocation timeout and the delay hook are taken from `config`.
  pub fn new(invoker: Invoker, config: OrchestratorConfig) -> Self {
    let invoker = invoker.with_timeout(config.invocation_timeout());
    let fixed = FixedDelay::from_config(&config);
    let delay: Arc<dyn DelayHook> = if fixed.is_zero() {
      Arc::new(NoDelay)
    } else {
      Arc::new(fixed)
    };

    Self {
      invoker,
      config,
      delay,
    }
  }

  /// Replace the delay hook.
  pub fn with_delay_hook(mut self, delay: Arc<dyn DelayHook>) -> Self {
    self.delay = delay;
    self
  }

  /// Execute a run with a fresh id and no event observer.
  pub async fn execute(&self, request: RunRequest) -> RunOutcome {
    self
      .execute_with(&new_run_id(), request, Arc::new(NoopNotifier))
      .await
  }

  /// Execute a run to its terminal state.
  ///
  /// Never returns an error: every failure, including a malformed trigger or
  /// an exceeded run timeout, is captured in a failed [`RunOutcome`].
  #[instrument(name = "run_execute", skip(self, request, notifier), fields(run_id = %run_id))]
  pub async fn execute_with(
    &self,
    run_id: &str,
    request: RunRequest,
    notifier: Arc<dyn ExecutionNotifier>,
  ) -> RunOutcome {
    info!(input = %request.as_value(), "run_started");
    notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.to_string(),
      input: request.as_value().clone(),
    });
    enter(&notifier, run_id, State::Start);

    let result = match self.config.run_timeout() {
      Some(timeout) => tokio::time::timeout(timeout, self.drive(run_id, &request, &notifier))
        .await
        .unwrap_or_else(|_| {
          Err(ExecutionError::TimedOut {
            timeout_ms: timeout.as_millis() as u64,
          })
        }),
      None => self.drive(run_id, &request, &notifier).await,
    };

    match result {
      Ok(outcome) => {
        info!(count = outcome.count, "run_succeeded");
        notifier.notify(ExecutionEvent::RunSucceeded {
          run_id: run_id.to_string(),
          count: outcome.count,
        });
        outcome
      }
      Err(e) => {
        error!(error = %e, label = e.label(), "run_failed");
        enter(&notifier, run_id, State::Failed);
        let outcome = fail(request.into_value(), &e);
        notifier.notify(ExecutionEvent::RunFailed {
          run_id: run_id.to_string(),
          error: e.label().to_string(),
          cause: e.cause(),
        });
        outcome
      }
    }
  }

  /// Start → executor state → Aggregate. Any error means Failed.
  async fn drive(
    &self,
    run_id: &str,
    request: &RunRequest,
    notifier: &Arc<dyn ExecutionNotifier>,
  ) -> Result<RunOutcome, ExecutionError> {
    let run = dispatch(run_id, request)?;
    info!(state = %run.mode.state(), items = run.items.len(), "dispatched");
    enter(notifier, run_id, run.mode.state());

    let ctx = ExecutionContext::new(run_id, self.invoker.clone(), notifier.clone());

    self.delay.pause(Phase::BeforeExecute).await;

    let output = match run.mode {
      Mode::WholeBatch => execute_whole(&ctx, &run.items).await?,
      Mode::Parallel { max_concurrency } => {
        ExecutorOutput::Items(execute_bounded(&ctx, run.items.clone(), max_concurrency).await?)
      }
      Mode::Loop => ExecutorOutput::Items(execute_loop(&ctx, &run.items).await?),
    };

    self.delay.pause(Phase::AfterExecute).await;

    enter(notifier, run_id, State::Aggregate);
    Ok(aggregate(&run, output))
  }
}

fn enter(notifier: &Arc<dyn ExecutionNotifier>, run_id: &str, state: State) {
  notifier.notify(ExecutionEvent::StateEntered {
    run_id: run_id.to_string(),
    state,
  });
}
