use std::path::Path;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{Error, HistoryEvent, RunCompletion, RunRecord, Store};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) the database file at `path` and migrate it.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
    let options = SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// A migrated, private in-memory database.
  ///
  /// Pinned to a single connection that never idles out; every new
  /// connection to `sqlite::memory:` would otherwise see an empty database.
  pub async fn in_memory() -> Result<Self, Error> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect("sqlite::memory:")
      .await?;

    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), Error> {
    sqlx::migrate!("../../migrations").run(&self.pool).await?;
    Ok(())
  }

  async fn require_run(&self, run_id: &str) -> Result<(), Error> {
    sqlx::query("SELECT 1 FROM runs WHERE run_id = ?")
      .bind(run_id)
      .fetch_optional(&self.pool)
      .await?
      .map(|_| ())
      .ok_or_else(|| Error::NotFound(run_id.to_string()))
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn create_run(&self, run: &RunRecord) -> Result<(), Error> {
    sqlx::query(
      r#"
      INSERT INTO runs (run_id, status, input, output, started_at, stopped_at, error, cause)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?)
      "#,
    )
    .bind(&run.run_id)
    .bind(run.status)
    .bind(&run.input)
    .bind(&run.output)
    .bind(run.started_at)
    .bind(run.stopped_at)
    .bind(&run.error)
    .bind(&run.cause)
    .execute(&self.pool)
    .await
    .map_err(|e| match e.as_database_error() {
      Some(db) if db.is_unique_violation() => Error::AlreadyExists(run.run_id.clone()),
      _ => Error::Database(e),
    })?;

    Ok(())
  }

  async fn complete_run(&self, run_id: &str, completion: &RunCompletion) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
      UPDATE runs
      SET status = ?, output = ?, stopped_at = ?, error = ?, cause = ?
      WHERE run_id = ?
      "#,
    )
    .bind(completion.status)
    .bind(completion.output.as_ref().map(sqlx::types::Json))
    .bind(completion.stopped_at)
    .bind(&completion.error)
    .bind(&completion.cause)
    .bind(run_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(run_id.to_string()));
    }
    Ok(())
  }

  async fn get_run(&self, run_id: &str) -> Result<RunRecord, Error> {
    sqlx::query_as(
      r#"
      SELECT run_id, status, input, output, started_at, stopped_at, error, cause
      FROM runs
      WHERE run_id = ?
      "#,
    )
    .bind(run_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(run_id.to_string()))
  }

  async fn list_runs(&self) -> Result<Vec<RunRecord>, Error> {
    let runs = sqlx::query_as(
      r#"
      SELECT run_id, status, input, output, started_at, stopped_at, error, cause
      FROM runs
      ORDER BY started_at DESC
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(runs)
  }

  async fn append_event(&self, event: &HistoryEvent) -> Result<(), Error> {
    self.require_run(&event.run_id).await?;

    sqlx::query(
      r#"
      INSERT INTO run_events (run_id, sequence, timestamp, event_type, details)
      VALUES (?, ?, ?, ?, ?)
      "#,
    )
    .bind(&event.run_id)
    .bind(event.sequence)
    .bind(event.timestamp)
    .bind(&event.event_type)
    .bind(&event.details)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn list_events(&self, run_id: &str) -> Result<Vec<HistoryEvent>, Error> {
    self.require_run(run_id).await?;

    let events = sqlx::query_as(
      r#"
      SELECT run_id, sequence, timestamp, event_type, details
      FROM run_events
      WHERE run_id = ?
      ORDER BY sequence ASC
      "#,
    )
    .bind(run_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(events)
  }
}
