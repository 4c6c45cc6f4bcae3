//! The three executors.
//!
//! | Executor            | Invocations           | On failure                                |
//! |---------------------|-----------------------|-------------------------------------------|
//! | [`execute_whole`]   | one, whole batch      | fail                                      |
//! | [`execute_bounded`] | one per item, ≤ k     | stop dispatching, drain in-flight, fail   |
//! | [`execute_loop`]    | one per item, in order| fail before the next item is started      |
//!
//! Per-item outputs are written to the item's input position, never appended
//! in completion order.

use std::num::NonZeroUsize;
use std::sync::Arc;

use batchflow_worker::{InvocationTarget, Invoker};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::outcome::ExecutorOutput;

/// Everything an executor needs to invoke the worker for one run.
///
/// Cloned into every spawned invocation.
#[derive(Clone)]
pub struct ExecutionContext {
  run_id: Arc<str>,
  invoker: Invoker,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl ExecutionContext {
  pub fn new(run_id: &str, invoker: Invoker, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    Self {
      run_id: Arc::from(run_id),
      invoker,
      notifier,
    }
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// Invoke the worker once and report the outcome as events.
  async fn invoke(&self, index: Option<usize>, payload: Value) -> Result<Value, ExecutionError> {
    let target = match index {
      Some(index) => InvocationTarget::Item(index),
      None => InvocationTarget::Batch,
    };

    self.notifier.notify(ExecutionEvent::InvocationStarted {
      run_id: self.run_id.to_string(),
      index,
    });

    match self.invoker.invoke(&self.run_id, target, payload).await {
      Ok(output) => {
        self.notifier.notify(ExecutionEvent::InvocationSucceeded {
          run_id: self.run_id.to_string(),
          index,
          output: output.clone(),
        });
        Ok(output)
      }
      Err(source) => {
        self.notifier.notify(ExecutionEvent::InvocationFailed {
          run_id: self.run_id.to_string(),
          index,
          error: source.to_string(),
        });
        Err(ExecutionError::Worker { index, source })
      }
    }
  }
}

/// Invoke the worker exactly once with the whole batch as an array.
#[instrument(name = "execute_whole", skip(ctx, items), fields(run_id = %ctx.run_id(), items = items.len()))]
pub async fn execute_whole(ctx: &ExecutionContext, items: &[Value]) -> Result<ExecutorOutput, ExecutionError> {
  let output = ctx.invoke(None, Value::Array(items.to_vec())).await?;
  Ok(ExecutorOutput::Batch(output))
}

/// Invoke the worker per item with at most `max_concurrency` invocations in flight.
///
/// Items are dispatched in input order as slots free up. The first failure
/// observed stops further dispatch; invocations already in flight are allowed
/// to finish and their outcomes are discarded.
#[instrument(
  name = "execute_bounded",
  skip(ctx, items),
  fields(run_id = %ctx.run_id(), items = items.len(), max_concurrency = max_concurrency.get())
)]
pub async fn execute_bounded(
  ctx: &ExecutionContext,
  items: Arc<[Value]>,
  max_concurrency: NonZeroUsize,
) -> Result<Vec<Value>, ExecutionError> {
  let total = items.len();
  let slots = max_concurrency.get();

  let mut results: Vec<Option<Value>> = vec![None; total];
  let mut in_flight: JoinSet<(usize, Result<Value, ExecutionError>)> = JoinSet::new();
  let mut next = 0;
  let mut first_failure: Option<ExecutionError> = None;

  loop {
    while first_failure.is_none() && next < total && in_flight.len() < slots {
      let ctx = ctx.clone();
      let item = items[next].clone();
      let index = next;
      in_flight.spawn(async move { (index, ctx.invoke(Some(index), item).await) });
      next += 1;
    }

    let Some(joined) = in_flight.join_next().await else {
      break;
    };

    match joined {
      Ok((index, Ok(output))) => {
        results[index] = Some(output);
      }
      Ok((index, Err(e))) => {
        if first_failure.is_none() {
          warn!(
            index,
            in_flight = in_flight.len(),
            undispatched = total - next,
            "item failed, draining in-flight invocations"
          );
          first_failure = Some(e);
        } else {
          debug!(index, error = %e, "discarding failure after the first");
        }
      }
      Err(join_error) => {
        if first_failure.is_none() {
          first_failure = Some(ExecutionError::Aborted {
            message: join_error.to_string(),
          });
        }
      }
    }
  }

  if let Some(e) = first_failure {
    return Err(e);
  }

  info!(completed = total, "all items processed");

  results
    .into_iter()
    .enumerate()
    .map(|(index, output)| {
      output.ok_or_else(|| ExecutionError::Aborted {
        message: format!("item {} produced no outcome", index),
      })
    })
    .collect()
}

/// Invoke the worker per item, one at a time, in input order.
///
/// A failure on item `i` returns before item `i + 1` is started.
#[instrument(name = "execute_loop", skip(ctx, items), fields(run_id = %ctx.run_id(), items = items.len()))]
pub async fn execute_loop(ctx: &ExecutionContext, items: &[Value]) -> Result<Vec<Value>, ExecutionError> {
  let mut results = Vec::with_capacity(items.len());

  for (index, item) in items.iter().enumerate() {
    results.push(ctx.invoke(Some(index), item.clone()).await?);
  }

  Ok(results)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::{ChannelNotifier, NoopNotifier};
  use batchflow_worker::{BoxError, WorkerError, worker_fn};
  use serde_json::json;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;
  use tokio::sync::mpsc;

  fn context(invoker: Invoker) -> ExecutionContext {
    ExecutionContext::new("run-test", invoker, Arc::new(NoopNotifier))
  }

  fn items(n: i64) -> Arc<[Value]> {
    (1..=n).map(|i| json!(i)).collect::<Vec<_>>().into()
  }

  /// Multiplies by ten after a delay that shrinks with the item value, so
  /// later items complete first.
  fn reversed_completion_invoker(n: i64) -> Invoker {
    Invoker::new(Arc::new(worker_fn(move |item: Value| async move {
      let value = item.as_i64().unwrap_or_default();
      tokio::time::sleep(Duration::from_millis(((n - value) * 5) as u64)).await;
      Ok::<_, BoxError>(json!(value * 10))
    })))
  }

  #[tokio::test]
  async fn test_bounded_preserves_input_order() {
    let n = 8;
    let ctx = context(reversed_completion_invoker(n));
    let expected: Vec<Value> = (1..=n).map(|i| json!(i * 10)).collect();

    for k in [1, n as usize / 2, n as usize] {
      let results = execute_bounded(&ctx, items(n), NonZeroUsize::new(k).unwrap())
        .await
        .expect("all items succeed");
      assert_eq!(results, expected, "max_concurrency = {}", k);
    }
  }

  #[tokio::test]
  async fn test_bounded_never_exceeds_limit() {
    let n = 10;

    for k in [1usize, 2, n] {
      let current = Arc::new(AtomicUsize::new(0));
      let peak = Arc::new(AtomicUsize::new(0));

      let worker = {
        let current = current.clone();
        let peak = peak.clone();
        worker_fn(move |item: Value| {
          let current = current.clone();
          let peak = peak.clone();
          async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, BoxError>(item)
          }
        })
      };

      let ctx = context(Invoker::new(Arc::new(worker)));
      let results = execute_bounded(&ctx, items(n as i64), NonZeroUsize::new(k).unwrap())
        .await
        .expect("all items succeed");

      assert_eq!(results.len(), n);
      assert!(peak.load(Ordering::SeqCst) <= k, "peak exceeded {}", k);
      assert_eq!(current.load(Ordering::SeqCst), 0);
    }
  }

  #[tokio::test]
  async fn test_bounded_saturates_up_to_limit() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let worker = {
      let current = current.clone();
      let peak = peak.clone();
      worker_fn(move |item: Value| {
        let current = current.clone();
        let peak = peak.clone();
        async move {
          let now = current.fetch_add(1, Ordering::SeqCst) + 1;
          peak.fetch_max(now, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(30)).await;
          current.fetch_sub(1, Ordering::SeqCst);
          Ok::<_, BoxError>(item)
        }
      })
    };

    let ctx = context(Invoker::new(Arc::new(worker)));
    execute_bounded(&ctx, items(6), NonZeroUsize::new(3).unwrap())
      .await
      .expect("all items succeed");

    assert_eq!(peak.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_bounded_failure_is_decisive() {
    let invoked = Arc::new(Mutex::new(Vec::new()));

    let worker = {
      let invoked = invoked.clone();
      worker_fn(move |item: Value| {
        let invoked = invoked.clone();
        async move {
          invoked.lock().unwrap().push(item.clone());
          if item == json!(3) {
            return Err::<Value, BoxError>("three is not allowed".into());
          }
          Ok(item)
        }
      })
    };

    let ctx = context(Invoker::new(Arc::new(worker)));
    let result = execute_bounded(&ctx, items(4), NonZeroUsize::new(2).unwrap()).await;

    assert_eq!(
      result,
      Err(ExecutionError::Worker {
        index: Some(2),
        source: WorkerError::failed("three is not allowed"),
      })
    );
    assert!(invoked.lock().unwrap().contains(&json!(3)));
  }

  #[tokio::test]
  async fn test_bounded_limit_larger_than_batch() {
    let ctx = context(reversed_completion_invoker(3));
    let results = execute_bounded(&ctx, items(3), NonZeroUsize::new(100).unwrap())
      .await
      .unwrap();
    assert_eq!(results, vec![json!(10), json!(20), json!(30)]);
  }

  #[tokio::test]
  async fn test_empty_batches_invoke_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let worker = {
      let calls = calls.clone();
      worker_fn(move |item: Value| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, BoxError>(item) }
      })
    };
    let ctx = context(Invoker::new(Arc::new(worker)));

    let bounded = execute_bounded(&ctx, items(0), NonZeroUsize::new(2).unwrap()).await;
    let looped = execute_loop(&ctx, &[]).await;

    assert_eq!(bounded, Ok(vec![]));
    assert_eq!(looped, Ok(vec![]));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_loop_stops_at_first_failure() {
    let invoked = Arc::new(Mutex::new(Vec::new()));

    let worker = {
      let invoked = invoked.clone();
      worker_fn(move |item: Value| {
        let invoked = invoked.clone();
        async move {
          invoked.lock().unwrap().push(item.clone());
          if item == json!(2) {
            return Err::<Value, BoxError>("two failed".into());
          }
          Ok(item)
        }
      })
    };

    let ctx = context(Invoker::new(Arc::new(worker)));
    let result = execute_loop(&ctx, &items(3)).await;

    assert!(matches!(
      result,
      Err(ExecutionError::Worker { index: Some(1), .. })
    ));
    assert_eq!(*invoked.lock().unwrap(), vec![json!(1), json!(2)]);
  }

  #[tokio::test]
  async fn test_loop_preserves_input_order() {
    let ctx = context(reversed_completion_invoker(4));
    let results = execute_loop(&ctx, &items(4)).await.unwrap();
    assert_eq!(results, vec![json!(10), json!(20), json!(30), json!(40)]);
  }

  #[tokio::test]
  async fn test_whole_invokes_once_with_entire_batch() {
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let worker = {
      let payloads = payloads.clone();
      worker_fn(move |payload: Value| {
        payloads.lock().unwrap().push(payload.clone());
        async move { Ok::<_, BoxError>(json!({"received": payload})) }
      })
    };

    let ctx = context(Invoker::new(Arc::new(worker)));
    let output = execute_whole(&ctx, &items(3)).await.unwrap();

    assert_eq!(
      output,
      ExecutorOutput::Batch(json!({"received": [1, 2, 3]}))
    );
    assert_eq!(*payloads.lock().unwrap(), vec![json!([1, 2, 3])]);
  }

  #[tokio::test]
  async fn test_invocations_are_reported_as_events() {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let invoker = Invoker::new(Arc::new(worker_fn(|item: Value| async move {
      if item == json!(2) {
        return Err::<Value, BoxError>("nope".into());
      }
      Ok(item)
    })));
    let ctx = ExecutionContext::new("run-events", invoker, Arc::new(ChannelNotifier::new(sender)));

    let _ = execute_loop(&ctx, &items(3)).await;
    drop(ctx);

    let mut types = Vec::new();
    while let Some(event) = receiver.recv().await {
      assert_eq!(event.run_id(), "run-events");
      types.push(event.event_type());
    }

    assert_eq!(
      types,
      vec![
        "invocation_started",
        "invocation_succeeded",
        "invocation_started",
        "invocation_failed",
      ]
    );
  }
}
