use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use batchflow_config::{OrchestratorConfig, RunRequest};
use batchflow_engine::{Engine, EngineError, Runner};
use batchflow_orchestrator::Orchestrator;
use batchflow_store::SqliteStore;
use batchflow_worker::{BoxError, CommandWorker, Invoker, Worker, worker_fn};

/// Batchflow - run a batch of items through a worker in whole, parallel or loop mode
#[derive(Parser)]
#[command(name = "batchflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.batchflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Orchestrator configuration file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one batch and print its outcome
  Run {
    /// Path to the trigger request (JSON). Read from stdin when omitted.
    request_file: Option<PathBuf>,

    #[command(flatten)]
    worker: WorkerArgs,
  },

  /// Describe a run by its id
  Status {
    /// The run id printed when the run was triggered
    run_id: String,
  },

  /// List recorded runs
  List,

  /// Read one trigger request per line from stdin and run each
  Serve {
    #[command(flatten)]
    worker: WorkerArgs,
  },
}

#[derive(clap::Args)]
struct WorkerArgs {
  /// Program invoked once per payload (JSON on stdin, result on stdout).
  /// Payloads are echoed back when omitted.
  #[arg(long)]
  worker: Option<String>,

  /// Argument passed to the worker program (repeatable)
  #[arg(long = "worker-arg", allow_hyphen_values = true)]
  worker_args: Vec<String>,
}

impl WorkerArgs {
  fn invoker(&self) -> Invoker {
    match &self.worker {
      Some(program) => {
        let worker: Arc<dyn Worker> =
          Arc::new(CommandWorker::new(program).args(self.worker_args.clone()));
        Invoker::new(worker)
      }
      None => echo_invoker(),
    }
  }
}

/// Returns every payload unchanged.
fn echo_invoker() -> Invoker {
  Invoker::new(Arc::new(worker_fn(|payload| async move {
    Ok::<_, BoxError>(payload)
  })))
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".batchflow"),
  };
  let config = load_config(cli.config.as_deref())?;

  match cli.command {
    Some(Commands::Run {
      request_file,
      worker,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      let processed = rt.block_on(run_batch(request_file, worker, config, &data_dir))?;
      if !processed {
        std::process::exit(1);
      }
    }
    Some(Commands::Status { run_id }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(show_status(run_id, config, &data_dir))?;
    }
    Some(Commands::List) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(list_runs(config, &data_dir))?;
    }
    Some(Commands::Serve { worker }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(serve(worker, config, &data_dir))?;
    }
    None => {
      println!("batchflow - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
  let Some(path) = path else {
    return Ok(OrchestratorConfig::default());
  };

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}

async fn open_engine(invoker: Invoker, config: OrchestratorConfig, data_dir: &Path) -> Result<Engine> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let db_path = data_dir.join("batchflow.db");
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open run registry: {}", db_path.display()))?;

  Ok(Engine::new(Orchestrator::new(invoker, config), Arc::new(store)))
}

async fn run_batch(
  request_file: Option<PathBuf>,
  worker: WorkerArgs,
  config: OrchestratorConfig,
  data_dir: &Path,
) -> Result<bool> {
  let request = match request_file {
    Some(path) => {
      let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read request file: {}", path.display()))?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse request file: {}", path.display()))?
    }
    None => read_request_from_stdin()?,
  };

  let engine = open_engine(worker.invoker(), config, data_dir).await?;
  let handle = engine
    .start(RunRequest::from_value(request))
    .await
    .context("failed to trigger run")?;
  eprintln!("Run: {}", handle.run_id());

  let outcome = handle.wait().await.context("run did not complete")?;
  println!("{}", serde_json::to_string_pretty(&outcome)?);

  Ok(outcome.is_processed())
}

async fn show_status(run_id: String, config: OrchestratorConfig, data_dir: &Path) -> Result<()> {
  let engine = open_engine(echo_invoker(), config, data_dir).await?;

  match engine.describe(&run_id).await {
    Ok(description) => {
      println!("{}", serde_json::to_string_pretty(&description)?);
      Ok(())
    }
    Err(EngineError::NotFound { run_id }) => bail!("no run with id '{}'", run_id),
    Err(e) => Err(e).context("failed to describe run"),
  }
}

async fn list_runs(config: OrchestratorConfig, data_dir: &Path) -> Result<()> {
  let engine = open_engine(echo_invoker(), config, data_dir).await?;

  for run in engine.list_runs().await.context("failed to list runs")? {
    println!(
      "{}\t{}\t{}",
      run.run_id,
      run.status,
      run.started_at.to_rfc3339()
    );
  }
  Ok(())
}

async fn serve(worker: WorkerArgs, config: OrchestratorConfig, data_dir: &Path) -> Result<()> {
  let engine = Arc::new(open_engine(worker.invoker(), config, data_dir).await?);
  let runner = Runner::new(engine);
  let sender = runner.sender();

  let cancel = CancellationToken::new();
  let runner_task = tokio::spawn(runner.start(cancel.clone()));

  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("interrupt_received");
      ctrl_c.cancel();
    }
  });

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    let line = tokio::select! {
      _ = cancel.cancelled() => break,
      line = lines.next_line() => line.context("failed to read stdin")?,
    };
    let Some(line) = line else { break };
    if line.trim().is_empty() {
      continue;
    }

    match serde_json::from_str(&line) {
      Ok(value) => {
        if sender.send(RunRequest::from_value(value)).await.is_err() {
          warn!("runner_stopped_accepting");
          break;
        }
      }
      Err(e) => error!(error = %e, "request_parse_failed"),
    }
  }
  drop(sender);

  runner_task
    .await
    .context("runner task panicked")?
    .context("runner failed")?;
  Ok(())
}

fn read_request_from_stdin() -> Result<serde_json::Value> {
  if io::stdin().is_terminal() {
    bail!("no request given: pass a request file or pipe JSON on stdin");
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read request from stdin")?;

  serde_json::from_str(&input).context("failed to parse request JSON from stdin")
}
