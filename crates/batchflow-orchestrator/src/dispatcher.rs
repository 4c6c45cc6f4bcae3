//! Mode dispatch.
//!
//! Inspects a trigger and either produces a [`Run`] bound to one of the three
//! executors or a [`ConfigurationError`] that sends the run straight to the
//! failure sink. No worker is invoked here.

use std::num::NonZeroUsize;

use batchflow_config::{ProcessType, RunRequest};
use serde_json::Value;

use crate::error::ConfigurationError;
use crate::run::{Mode, Run};

/// Validate a trigger and select its processing mode.
pub fn select_mode(request: &RunRequest) -> Result<Mode, ConfigurationError> {
  let process_type = match request.process_type() {
    Some(value) => ProcessType::parse(value).ok_or_else(|| ConfigurationError::UnknownProcessType {
      value: value.to_string(),
    })?,
    None => {
      return Err(match request.as_value().get("processType") {
        None | Some(Value::Null) => ConfigurationError::MissingProcessType,
        Some(other) => ConfigurationError::UnknownProcessType {
          value: other.to_string(),
        },
      });
    }
  };

  if request.items().is_none() {
    return Err(ConfigurationError::InvalidItems);
  }

  match process_type {
    ProcessType::Whole => Ok(Mode::WholeBatch),
    ProcessType::Loop => Ok(Mode::Loop),
    ProcessType::Parallel => {
      let max_concurrency = parse_max_concurrency(request.max_concurrency())?;
      Ok(Mode::Parallel { max_concurrency })
    }
  }
}

/// Build the run for a trigger, or reject it.
pub fn dispatch(run_id: &str, request: &RunRequest) -> Result<Run, ConfigurationError> {
  let mode = select_mode(request)?;
  let items = request
    .items()
    .ok_or(ConfigurationError::InvalidItems)?
    .to_vec();

  Ok(Run::new(run_id, mode, items, request.as_value().clone()))
}

fn parse_max_concurrency(value: Option<&Value>) -> Result<NonZeroUsize, ConfigurationError> {
  let value = value.ok_or(ConfigurationError::MissingMaxConcurrency)?;

  value
    .as_u64()
    .and_then(|n| usize::try_from(n).ok())
    .and_then(NonZeroUsize::new)
    .ok_or_else(|| ConfigurationError::InvalidMaxConcurrency {
      value: value.to_string(),
    })
}
