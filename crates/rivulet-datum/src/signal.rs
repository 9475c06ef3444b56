//! In-band control signals and the hop paths they follow.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DatumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternalSignalKind {
  /// No further values will arrive on this edge.
  WorkflowFinish,
  /// The current loop iteration must restart.
  NestedLoopReset,
  /// A failure inside a loop body travels to the loop driver.
  FailureInLoop,
}

impl InternalSignalKind {
  pub fn as_str(self) -> &'static str {
    match self {
      InternalSignalKind::WorkflowFinish => "WorkflowFinish",
      InternalSignalKind::NestedLoopReset => "NestedLoopReset",
      InternalSignalKind::FailureInLoop => "FailureInLoop",
    }
  }

  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "WorkflowFinish" => Some(InternalSignalKind::WorkflowFinish),
      "NestedLoopReset" => Some(InternalSignalKind::NestedLoopReset),
      "FailureInLoop" => Some(InternalSignalKind::FailureInLoop),
      _ => None,
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      InternalSignalKind::WorkflowFinish => "Internal (Finished)",
      InternalSignalKind::NestedLoopReset => "Internal (Reset)",
      InternalSignalKind::FailureInLoop => "Internal (Failure)",
    }
  }
}

/// One edge of a precomputed traversal path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowGraphHop {
  /// Execution id of the component that emits the signal along this hop.
  #[serde(rename = "e")]
  pub hop_execution_id: String,
  #[serde(rename = "o")]
  pub hop_output_name: String,
  #[serde(rename = "x")]
  pub target_execution_id: String,
  #[serde(rename = "n")]
  pub target_input_name: String,
}

impl WorkflowGraphHop {
  pub fn new(
    hop_execution_id: impl Into<String>,
    hop_output_name: impl Into<String>,
    target_execution_id: impl Into<String>,
    target_input_name: impl Into<String>,
  ) -> Self {
    Self {
      hop_execution_id: hop_execution_id.into(),
      hop_output_name: hop_output_name.into(),
      target_execution_id: target_execution_id.into(),
      target_input_name: target_input_name.into(),
    }
  }
}

/// An immutable, shared sequence of hops plus a cursor.
///
/// The hop list itself is never mutated; consuming a hop produces a new
/// `HopPath` with the cursor moved forward. Equality and serialization only
/// look at the hops that are still left.
#[derive(Clone)]
pub struct HopPath {
  hops: Arc<[WorkflowGraphHop]>,
  cursor: usize,
}

impl HopPath {
  pub fn new(hops: Vec<WorkflowGraphHop>) -> Self {
    Self {
      hops: Arc::from(hops),
      cursor: 0,
    }
  }

  pub fn empty() -> Self {
    Self::new(Vec::new())
  }

  /// The next hop to traverse, if any.
  pub fn current(&self) -> Option<&WorkflowGraphHop> {
    self.hops.get(self.cursor)
  }

  pub fn remaining(&self) -> &[WorkflowGraphHop] {
    self.hops.get(self.cursor..).unwrap_or(&[])
  }

  pub fn is_exhausted(&self) -> bool {
    self.cursor >= self.hops.len()
  }

  /// Returns the path with the current hop consumed.
  pub fn advance(&self) -> Self {
    Self {
      hops: Arc::clone(&self.hops),
      cursor: (self.cursor + 1).min(self.hops.len()),
    }
  }
}

impl Default for HopPath {
  fn default() -> Self {
    Self::empty()
  }
}

impl PartialEq for HopPath {
  fn eq(&self, other: &Self) -> bool {
    self.remaining() == other.remaining()
  }
}

impl Eq for HopPath {}

impl fmt::Debug for HopPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.remaining()).finish()
  }
}

impl Serialize for HopPath {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.remaining())
  }
}

impl<'de> Deserialize<'de> for HopPath {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Vec::<WorkflowGraphHop>::deserialize(deserializer).map(HopPath::new)
  }
}

/// A control signal carried on a data edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalSignal {
  #[serde(rename = "t")]
  kind: InternalSignalKind,
  #[serde(rename = "i")]
  identifier: String,
  #[serde(rename = "h", default, skip_serializing_if = "HopPath::is_exhausted")]
  hops: HopPath,
  /// Error summary for failures, or an opaque reference.
  #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
  payload: Option<String>,
}

impl InternalSignal {
  pub fn new(
    kind: InternalSignalKind,
    identifier: impl Into<String>,
    hops: HopPath,
    payload: Option<String>,
  ) -> Self {
    Self {
      kind,
      identifier: identifier.into(),
      hops,
      payload,
    }
  }

  pub fn workflow_finish() -> Self {
    Self::new(
      InternalSignalKind::WorkflowFinish,
      generate_identifier(),
      HopPath::empty(),
      None,
    )
  }

  pub fn nested_loop_reset(hops: HopPath) -> Self {
    Self::new(
      InternalSignalKind::NestedLoopReset,
      generate_identifier(),
      hops,
      None,
    )
  }

  pub fn failure_in_loop(hops: HopPath, error_summary: impl Into<String>) -> Self {
    Self::new(
      InternalSignalKind::FailureInLoop,
      generate_identifier(),
      hops,
      Some(error_summary.into()),
    )
  }

  pub fn kind(&self) -> InternalSignalKind {
    self.kind
  }

  pub fn identifier(&self) -> &str {
    &self.identifier
  }

  pub fn hops(&self) -> &HopPath {
    &self.hops
  }

  pub fn payload(&self) -> Option<&str> {
    self.payload.as_deref()
  }

  /// The same signal with its current hop consumed, ready to be forwarded.
  pub fn advanced(&self) -> Self {
    Self {
      hops: self.hops.advance(),
      ..self.clone()
    }
  }

  /// Encodes the signal as compact JSON.
  pub fn serialize(&self) -> Result<String, DatumError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn deserialize(input: &str) -> Result<Self, DatumError> {
    serde_json::from_str(input).map_err(|e| DatumError::Deserialization {
      input: input.to_string(),
      message: e.to_string(),
    })
  }
}

impl fmt::Display for InternalSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} [{}]", self.kind.display_name(), self.identifier)
  }
}

fn generate_identifier() -> String {
  uuid::Uuid::new_v4().to_string()
}
