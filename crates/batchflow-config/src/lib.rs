//! Batchflow Config
//!
//! This crate contains the serializable types that enter the orchestrator from
//! the outside: the trigger request describing one run, and the orchestrator
//! configuration loaded by the CLI.
//!
//! A [`RunRequest`] is intentionally lenient. It keeps the raw JSON value so a
//! malformed trigger (missing `processType`, non-array `items`, ...) still
//! reaches the dispatcher, where it is turned into a configuration failure
//! instead of a deserialization error.
//!
//! ```json
//! {
//!   "processType": "parallel",
//!   "items": [1, 2, 3, 4],
//!   "maxConcurrency": 2
//! }
//! ```

mod enums;
mod orchestrator;
mod request;

pub use enums::ProcessType;
pub use orchestrator::OrchestratorConfig;
pub use request::RunRequest;
