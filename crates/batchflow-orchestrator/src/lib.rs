//! Batchflow Orchestrator
//!
//! Routes a batch of items through one of three processing strategies and
//! reduces the result to a single [`RunOutcome`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! │  - execute(request) → RunOutcome (never an error)           │
//! │  - optional run timeout, delay hooks, execution events      │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        dispatch                             │
//! │  - processType "whole" | "parallel" | "loop" → Mode         │
//! │  - anything else → ConfigurationError → Failed              │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!            ┌──────────────────┼──────────────────┐
//!            ▼                  ▼                  ▼
//!      execute_whole     execute_bounded      execute_loop
//!            └──────────────────┼──────────────────┘
//!                               ▼
//!                 aggregate  ──or──  fail
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use batchflow_config::{OrchestratorConfig, RunRequest};
//! use batchflow_orchestrator::Orchestrator;
//! use batchflow_worker::{Invoker, worker_fn};
//!
//! let invoker = Invoker::new(Arc::new(worker_fn(|item| async move { Ok(item) })));
//! let orchestrator = Orchestrator::new(invoker, OrchestratorConfig::default());
//!
//! let request = RunRequest::new("parallel", vec![json!(1), json!(2)], Some(2));
//! let outcome = orchestrator.execute(request).await;
//! ```

mod aggregate;
mod delay;
mod dispatcher;
mod error;
mod events;
mod executor;
mod failure;
mod orchestrator;
mod outcome;
mod run;
mod state;

pub use aggregate::{aggregate, aggregate_at};
pub use delay::{DelayHook, FixedDelay, NoDelay, Phase};
pub use dispatcher::{dispatch, select_mode};
pub use error::{ConfigurationError, ExecutionError, TIMEOUT_LABEL};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::{ExecutionContext, execute_bounded, execute_loop, execute_whole};
pub use failure::{fail, fail_at};
pub use orchestrator::Orchestrator;
pub use outcome::{ExecutorOutput, FailureDetail, RunOutcome, RunStatus};
pub use run::{Mode, Run, new_run_id};
pub use state::State;
