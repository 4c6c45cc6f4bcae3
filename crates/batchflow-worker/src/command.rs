//! Subprocess worker.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::BoxError;
use crate::worker::Worker;

/// A worker that runs an external program per invocation.
///
/// The payload is written to the program's stdin as JSON. Stdout is parsed as
/// JSON when possible and otherwise returned as a string. A non-zero exit
/// status is an error carrying stderr.
#[derive(Debug, Clone)]
pub struct CommandWorker {
  program: String,
  args: Vec<String>,
}

impl CommandWorker {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }
}

#[async_trait]
impl Worker for CommandWorker {
  async fn invoke(&self, payload: Value) -> Result<Value, BoxError> {
    let input = serde_json::to_vec(&payload)?;

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| format!("failed to spawn '{}': {}", self.program, e))?;

    debug!(program = %self.program, pid = ?child.id(), "worker process spawned");

    let stdin = child.stdin.take();
    let write = async move {
      if let Some(mut stdin) = stdin {
        stdin.write_all(&input).await?;
        stdin.shutdown().await?;
      }
      Ok::<_, std::io::Error>(())
    };

    let (written, output) = tokio::join!(write, child.wait_with_output());
    let output = output?;

    // A program that ignores its stdin may exit before we finish writing.
    match written {
      Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
      _ => {}
    }

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(format!("'{}' exited with {}: {}", self.program, output.status, stderr.trim()).into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
      return Ok(Value::Null);
    }

    Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
  }
}
