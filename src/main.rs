use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rivulet_config::NodeConfig;
use rivulet_datum::{
  EndpointDatum, InternalSignal, JsonTypedDatumSerializer, NodeId, TypedDatum,
  TypedDatumSerializer,
};
use rivulet_endpoint::ComponentInterface;
use rivulet_scheduler::{
  ExecutionScheduler, SchedulerContext, SchedulerHandle, SchedulerRunner, SchedulingEvent,
  SchedulingEvents, SchedulingState,
};
use rivulet_wire::EndpointDatumSerializer;

/// Rivulet - dataflow workflow execution core
#[derive(Parser)]
#[command(name = "rivulet")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a node configuration file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Replay a token script through one scheduler and print its transitions
  Schedule {
    /// Component interface (inputs and groups) as JSON
    interface_file: PathBuf,

    /// Token script: a JSON array of `{"input", "value"}` or `{"input", "finish": true}`
    tokens_file: PathBuf,

    /// How long to wait for the next transition before stopping
    #[arg(long, default_value_t = 200)]
    idle_ms: u64,
  },

  /// Read JSON endpoint datums (one per line) and print wire lines
  Encode,

  /// Read wire lines and print JSON endpoint datums
  Decode,
}

/// One entry of a token script.
#[derive(Debug, Deserialize)]
struct ScriptToken {
  input: String,
  #[serde(default)]
  value: Option<serde_json::Value>,
  #[serde(default)]
  finish: bool,
}

const EXECUTION_ID: &str = "cli-execution";
const INSTANCE_NAME: &str = "cli";

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let config = load_config(cli.config.as_deref())?;

  match cli.command {
    Some(Commands::Schedule {
      interface_file,
      tokens_file,
      idle_ms,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(schedule(
        &config,
        &interface_file,
        &tokens_file,
        Duration::from_millis(idle_ms),
      ))?;
    }
    Some(Commands::Encode) => encode()?,
    Some(Commands::Decode) => decode()?,
    None => {
      println!("rivulet - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
  let config = match path {
    Some(path) => NodeConfig::from_file(path)
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => NodeConfig::default(),
  };
  config
    .with_env_overrides(|key| std::env::var(key).ok())
    .context("invalid environment override")
}

async fn schedule(
  config: &NodeConfig,
  interface_file: &Path,
  tokens_file: &Path,
  idle: Duration,
) -> Result<()> {
  let interface_content = tokio::fs::read_to_string(interface_file)
    .await
    .with_context(|| format!("failed to read interface file: {}", interface_file.display()))?;
  let interface = ComponentInterface::from_json(&interface_content)
    .with_context(|| format!("failed to parse interface file: {}", interface_file.display()))?;

  let tokens_content = tokio::fs::read_to_string(tokens_file)
    .await
    .with_context(|| format!("failed to read token script: {}", tokens_file.display()))?;
  let script: Vec<ScriptToken> = serde_json::from_str(&tokens_content)
    .with_context(|| format!("failed to parse token script: {}", tokens_file.display()))?;

  let node = NodeId::from(config.node_id.as_str());
  let datums = script
    .into_iter()
    .map(|token| to_datum(token, &node))
    .collect::<Result<Vec<_>>>()?;

  let (notifier, mut events) = SchedulingEvents::channel();
  let scheduler = ExecutionScheduler::initialize(
    SchedulerContext {
      execution_id: EXECUTION_ID.to_string(),
      instance_name: INSTANCE_NAME.to_string(),
      interface,
    },
    Arc::new(notifier),
  )
  .context("failed to initialize scheduler")?;

  let runner = SchedulerRunner::with_buffer_size(scheduler, config.scheduler.inbound_buffer_size);
  let handle = runner.handle();
  let cancel = CancellationToken::new();
  let runner_task = tokio::spawn(runner.start(cancel.clone()));

  info!(tokens = datums.len(), "replaying token script");
  handle.enable().await;
  for datum in datums {
    handle.enqueue(datum).await?;
  }

  let mut stdout = io::stdout().lock();
  loop {
    let event = match tokio::time::timeout(idle, events.next_event()).await {
      Ok(Some(event)) => event,
      Ok(None) => break,
      Err(_) => {
        debug!("no further transitions");
        break;
      }
    };

    let finished = respond(&handle, &event, &mut stdout).await?;
    if finished {
      break;
    }
  }

  cancel.cancel();
  runner_task.await??;
  Ok(())
}

/// Prints one event and does what the owning component would do next.
/// Returns true once no further transitions can happen.
async fn respond(
  handle: &SchedulerHandle,
  event: &SchedulingEvent,
  out: &mut impl Write,
) -> Result<bool> {
  let state = match event {
    SchedulingEvent::SchedulingFailed { .. } => {
      writeln!(out, "{}", serde_json::to_string(event)?)?;
      return Ok(true);
    }
    SchedulingEvent::NewSchedulingState { state, .. } => *state,
  };

  let mut line = serde_json::to_value(event)?;
  match state {
    SchedulingState::ProcessInputData | SchedulingState::ProcessInputDataWithNotAValueData => {
      let inputs: BTreeMap<String, String> = handle
        .fetch_endpoint_datums()
        .await?
        .into_iter()
        .map(|(input, datum)| (input, datum.value.to_string()))
        .collect();
      line["inputs"] = json!(inputs);
    }
    SchedulingState::Reset => {
      if let Some(signal) = handle.take_reset_datum().await {
        line["signal"] = json!(signal.to_string());
      }
    }
    SchedulingState::FailureForward => {
      if let Some(signal) = handle.take_failure_datum().await {
        line["signal"] = json!(signal.to_string());
      }
    }
    SchedulingState::LoopReset | SchedulingState::Idling => {}
    SchedulingState::Finished => {
      writeln!(out, "{line}")?;
      return Ok(true);
    }
  }

  writeln!(out, "{line}")?;
  handle.enable().await;
  Ok(false)
}

fn to_datum(token: ScriptToken, node: &NodeId) -> Result<EndpointDatum> {
  let value = match (token.finish, token.value) {
    (true, None) => TypedDatum::Internal(InternalSignal::workflow_finish()),
    (false, Some(value)) => JsonTypedDatumSerializer
      .deserialize(&value.to_string())
      .with_context(|| format!("invalid value for input '{}'", token.input))?,
    (true, Some(_)) => bail!("token for input '{}' has both a value and finish", token.input),
    (false, None) => bail!("token for input '{}' has neither a value nor finish", token.input),
  };

  Ok(EndpointDatum {
    input_name: token.input,
    value,
    inputs_component_execution_id: EXECUTION_ID.to_string(),
    inputs_component_instance_name: INSTANCE_NAME.to_string(),
    inputs_node_id: node.clone(),
    outputs_component_execution_id: "cli-upstream".to_string(),
    outputs_node_id: node.clone(),
    workflow_execution_id: "cli-workflow".to_string(),
    workflow_controller_node_id: node.clone(),
    data_management_id: None,
  })
}

fn encode() -> Result<()> {
  let serializer = EndpointDatumSerializer::default();
  let mut out = io::stdout().lock();
  for (number, line) in io::stdin().lock().lines().enumerate() {
    let line = line.context("failed to read stdin")?;
    if line.trim().is_empty() {
      continue;
    }
    let datum: EndpointDatum = serde_json::from_str(&line)
      .with_context(|| format!("line {}: not an endpoint datum", number + 1))?;
    let encoded = serializer
      .serialize_endpoint_datum(&datum)
      .with_context(|| format!("line {}: failed to encode", number + 1))?;
    writeln!(out, "{encoded}")?;
  }
  Ok(())
}

fn decode() -> Result<()> {
  let serializer = EndpointDatumSerializer::default();
  let mut out = io::stdout().lock();
  for (number, line) in io::stdin().lock().lines().enumerate() {
    let line = line.context("failed to read stdin")?;
    if line.trim().is_empty() {
      continue;
    }
    let datum = serializer
      .deserialize_endpoint_datum(&line)
      .with_context(|| format!("line {}: failed to decode", number + 1))?;
    writeln!(out, "{}", serde_json::to_string(&datum)?)?;
  }
  Ok(())
}
