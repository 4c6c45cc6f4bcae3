//! Batchflow Store
//!
//! The run registry. Every triggered run is recorded here under its
//! correlation id together with its ordered execution history, so status
//! queries can tell an unknown id apart from a run that failed.
//!
//! The [`Store`] trait defines operations for:
//! - Recording runs and their terminal status
//! - Appending and listing history events
//!
//! Two implementations are provided: [`MemoryStore`] for tests and one-shot
//! runs, and [`SqliteStore`] for a registry that survives restarts.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use sqlx::types::Json;
pub use types::{HistoryEvent, RunCompletion, RunRecord, RunStatus};

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested run was not found.
  #[error("run not found: {0}")]
  NotFound(String),

  /// A run with this id is already registered.
  #[error("run already exists: {0}")]
  AlreadyExists(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// Applying the schema failed.
  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage trait for runs and their execution history.
#[async_trait]
pub trait Store: Send + Sync {
  /// Register a new run.
  async fn create_run(&self, run: &RunRecord) -> Result<(), Error>;

  /// Record the terminal status of a run.
  async fn complete_run(&self, run_id: &str, completion: &RunCompletion) -> Result<(), Error>;

  /// Get a run by id.
  async fn get_run(&self, run_id: &str) -> Result<RunRecord, Error>;

  /// List all runs, most recent first.
  async fn list_runs(&self) -> Result<Vec<RunRecord>, Error>;

  /// Append an event to a run's history.
  async fn append_event(&self, event: &HistoryEvent) -> Result<(), Error>;

  /// List a run's history in sequence order.
  async fn list_events(&self, run_id: &str) -> Result<Vec<HistoryEvent>, Error>;
}
