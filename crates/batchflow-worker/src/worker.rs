//! The worker seam.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BoxError;

/// An external function from payload to result.
///
/// The payload is a single item or, in whole-batch mode, the entire item
/// array. Output is taken verbatim; no schema is imposed in either direction.
#[async_trait]
pub trait Worker: Send + Sync {
  async fn invoke(&self, payload: Value) -> Result<Value, BoxError>;
}

/// A worker backed by an async closure.
pub struct FnWorker<F> {
  f: F,
}

/// Wrap an async closure as a [`Worker`].
///
/// ```ignore
/// let worker = worker_fn(|item| async move {
///   Ok(json!(item.as_i64().unwrap_or_default() * 10))
/// });
/// ```
pub fn worker_fn<F, Fut>(f: F) -> FnWorker<F>
where
  F: Fn(Value) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Value, BoxError>> + Send,
{
  FnWorker { f }
}

#[async_trait]
impl<F, Fut> Worker for FnWorker<F>
where
  F: Fn(Value) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Value, BoxError>> + Send,
{
  async fn invoke(&self, payload: Value) -> Result<Value, BoxError> {
    (self.f)(payload).await
  }
}
