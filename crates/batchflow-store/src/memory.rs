use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Error, HistoryEvent, RunCompletion, RunRecord, Store};

#[derive(Default)]
struct Registry {
  runs: HashMap<String, RunRecord>,
  events: HashMap<String, Vec<HistoryEvent>>,
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
  registry: RwLock<Registry>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn create_run(&self, run: &RunRecord) -> Result<(), Error> {
    let mut registry = self.registry.write().await;
    if registry.runs.contains_key(&run.run_id) {
      return Err(Error::AlreadyExists(run.run_id.clone()));
    }
    registry.runs.insert(run.run_id.clone(), run.clone());
    Ok(())
  }

  async fn complete_run(&self, run_id: &str, completion: &RunCompletion) -> Result<(), Error> {
    let mut registry = self.registry.write().await;
    let run = registry
      .runs
      .get_mut(run_id)
      .ok_or_else(|| Error::NotFound(run_id.to_string()))?;
    run.complete(completion);
    Ok(())
  }

  async fn get_run(&self, run_id: &str) -> Result<RunRecord, Error> {
    self
      .registry
      .read()
      .await
      .runs
      .get(run_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(run_id.to_string()))
  }

  async fn list_runs(&self) -> Result<Vec<RunRecord>, Error> {
    let registry = self.registry.read().await;
    let mut runs: Vec<RunRecord> = registry.runs.values().cloned().collect();
    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(runs)
  }

  async fn append_event(&self, event: &HistoryEvent) -> Result<(), Error> {
    let mut registry = self.registry.write().await;
    if !registry.runs.contains_key(&event.run_id) {
      return Err(Error::NotFound(event.run_id.clone()));
    }
    let events = registry.events.entry(event.run_id.clone()).or_default();
    let position = events.partition_point(|e| e.sequence < event.sequence);
    events.insert(position, event.clone());
    Ok(())
  }

  async fn list_events(&self, run_id: &str) -> Result<Vec<HistoryEvent>, Error> {
    let registry = self.registry.read().await;
    if !registry.runs.contains_key(run_id) {
      return Err(Error::NotFound(run_id.to_string()));
    }
    Ok(registry.events.get(run_id).cloned().unwrap_or_default())
  }
}
