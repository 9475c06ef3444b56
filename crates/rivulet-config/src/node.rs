use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryConfig;

const ENV_NODE_ID: &str = "RIVULET_NODE_ID";
const ENV_RETRY_MAX_ATTEMPTS: &str = "RIVULET_RETRY_MAX_ATTEMPTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  /// Capacity of a scheduler's inbound datum queue.
  pub inbound_buffer_size: usize,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      inbound_buffer_size: 100,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
  /// Applied to forwarding calls to a remote dispatcher.
  pub retry: RetryConfig,
  /// Applied when a relaying node waits for an unreachable target to come back.
  pub reachability_retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
  pub node_id: String,
  pub scheduler: SchedulerConfig,
  pub dispatch: DispatchConfig,
}

impl Default for NodeConfig {
  fn default() -> Self {
    Self {
      node_id: "local".to_string(),
      scheduler: SchedulerConfig::default(),
      dispatch: DispatchConfig::default(),
    }
  }
}

impl NodeConfig {
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content)
  }

  /// Defaults overridden by `RIVULET_NODE_ID` and `RIVULET_RETRY_MAX_ATTEMPTS`.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::default().with_env_overrides(|key| std::env::var(key).ok())
  }

  /// Applies overrides looked up through `lookup`.
  pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(node_id) = lookup(ENV_NODE_ID) {
      self.node_id = node_id;
    }
    if let Some(value) = lookup(ENV_RETRY_MAX_ATTEMPTS) {
      self.dispatch.retry.max_attempts =
        value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
          key: ENV_RETRY_MAX_ATTEMPTS.to_string(),
          value,
        })?;
    }
    Ok(self)
  }
}
