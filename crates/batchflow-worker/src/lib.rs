//! Batchflow Worker
//!
//! The worker is the external collaborator that turns one item (or a whole
//! batch) into a result. This crate defines the seam and the invoker that sits
//! in front of it:
//!
//! ```text
//! Invoker::invoke(payload)
//! ├── optional per-invocation timeout
//! ├── panic capture
//! └── Worker::invoke(payload) -> Result<Value, BoxError>
//!         │
//!         ▼
//!     Result<Value, WorkerError>
//! ```
//!
//! The invoker never retries.

mod command;
mod error;
mod invoker;
mod worker;

pub use command::CommandWorker;
pub use error::{BoxError, WorkerError};
pub use invoker::{InvocationTarget, Invoker, ItemOutcome};
pub use worker::{FnWorker, Worker, worker_fn};
