use rivulet_datum::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
  #[error("failed to decode endpoint datum: {0}")]
  Decode(String),

  #[error("failed to encode endpoint datum: {0}")]
  Encode(String),

  #[error("no local execution controller registered for '{execution_id}'")]
  NoLocalController { execution_id: String },

  #[error("no remote dispatcher available for node '{node}'")]
  NoRemoteDispatcher { node: NodeId },

  #[error("remote operation at node '{node}' failed: {message}")]
  Remote { node: NodeId, message: String },

  #[error("node '{node}' is not reachable")]
  Unreachable { node: NodeId },

  #[error("sender for node '{node}' is closed")]
  SenderClosed { node: NodeId },
}

/// Failure reported by a remote collaborator (transport error, timeout,
/// remote exception).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteOperationError {
  pub message: String,
}

impl RemoteOperationError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}
