use thiserror::Error;

/// Configuration errors detected while compiling a component's inputs.
#[derive(Debug, Error)]
pub enum EndpointError {
  #[error("input '{input}' is required but not connected")]
  RequiredInputNotConnected { input: String },

  #[error("'{member}' references unknown input group '{group}'")]
  UnknownGroup { member: String, group: String },

  #[error("input '{0}' is declared more than once")]
  DuplicateInput(String),

  #[error("input group '{0}' is declared more than once")]
  DuplicateGroup(String),

  #[error("input group hierarchy contains a cycle at '{0}'")]
  GroupCycle(String),

  #[error("failed to parse component interface: {0}")]
  Parse(#[from] serde_json::Error),
}
