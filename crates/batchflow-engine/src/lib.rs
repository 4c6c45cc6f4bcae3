//! Batchflow Engine
//!
//! The outer surfaces of batchflow: triggering runs, querying their status,
//! and a channel-driven runner.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Runner                             │
//! │  - owns mpsc channel (sender + receiver)                    │
//! │  - start(cancel) triggers a run per received request        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │  - start(request) → RunHandle (correlation id)              │
//! │  - describe(run_id) → RunDescription | NotFound             │
//! │  - records history events and terminal status               │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                             │
//!                 ▼                             ▼
//!           Orchestrator                      Store
//! ```

mod description;
mod engine;
mod error;
mod runner;

pub use description::{DescribedEvent, RunDescription};
pub use engine::{Engine, RunHandle};
pub use error::EngineError;
pub use runner::Runner;
