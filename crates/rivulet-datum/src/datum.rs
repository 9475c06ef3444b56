use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TypedDatum;

/// Identity of a participating node (process) in a distributed workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for NodeId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl From<String> for NodeId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

/// A token in flight from one component output to one component input.
///
/// Created by the producing side, consumed exactly once by the scheduler of
/// the receiving component instance. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDatum {
  /// Input on the receiving component.
  pub input_name: String,
  pub value: TypedDatum,
  pub inputs_component_execution_id: String,
  pub inputs_component_instance_name: String,
  pub inputs_node_id: NodeId,
  pub outputs_component_execution_id: String,
  pub outputs_node_id: NodeId,
  pub workflow_execution_id: String,
  /// Relay used when the receiving node is not directly reachable.
  pub workflow_controller_node_id: NodeId,
  /// Reference to a persisted record, opaque to the execution core.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_management_id: Option<i64>,
}

impl EndpointDatum {
  /// Same addressing, different payload.
  pub fn with_value(&self, value: TypedDatum) -> Self {
    Self {
      value,
      ..self.clone()
    }
  }

  /// Short description used in logs and failure messages.
  pub fn describe(&self) -> String {
    format!(
      "'{}' at input '{}' of '{}' ({})",
      self.value, self.input_name, self.inputs_component_instance_name, self.inputs_component_execution_id
    )
  }
}
