use rivulet_datum::DataType;
use serde::{Deserialize, Serialize};

use crate::error::EndpointError;

/// How values are held at an input between firings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDatumHandling {
  /// One value at a time, consumed on firing.
  #[default]
  Single,
  /// Unbounded FIFO, one value consumed per firing.
  Queue,
  /// One value, kept across firings until reset.
  Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputExecutionConstraint {
  #[default]
  Required,
  RequiredIfConnected,
  NotRequired,
}

/// Loop level of an input, relevant for finish detection only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointCharacter {
  #[default]
  SameLoop,
  OuterLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperation {
  And,
  Or,
}

fn default_connected() -> bool {
  true
}

/// Static declaration of one component input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDefinition {
  pub name: String,
  #[serde(default)]
  pub input_datum_handling: InputDatumHandling,
  #[serde(default)]
  pub input_execution_constraint: InputExecutionConstraint,
  #[serde(default)]
  pub endpoint_character: EndpointCharacter,
  #[serde(default = "default_connected")]
  pub connected: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_group_name: Option<String>,
  /// Expected value type. `None` accepts every type.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_type: Option<DataType>,
}

impl EndpointDefinition {
  pub fn new(
    name: impl Into<String>,
    handling: InputDatumHandling,
    constraint: InputExecutionConstraint,
  ) -> Self {
    Self {
      name: name.into(),
      input_datum_handling: handling,
      input_execution_constraint: constraint,
      endpoint_character: EndpointCharacter::SameLoop,
      connected: true,
      parent_group_name: None,
      data_type: None,
    }
  }

  pub fn in_group(mut self, group: impl Into<String>) -> Self {
    self.parent_group_name = Some(group.into());
    self
  }

  pub fn with_character(mut self, character: EndpointCharacter) -> Self {
    self.endpoint_character = character;
    self
  }

  pub fn with_data_type(mut self, data_type: DataType) -> Self {
    self.data_type = Some(data_type);
    self
  }

  pub fn disconnected(mut self) -> Self {
    self.connected = false;
    self
  }
}

/// A named AND/OR combinator over inputs and nested groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointGroupDefinition {
  pub name: String,
  pub logic_operation: LogicOperation,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_group_name: Option<String>,
}

impl EndpointGroupDefinition {
  pub fn new(name: impl Into<String>, logic_operation: LogicOperation) -> Self {
    Self {
      name: name.into(),
      logic_operation,
      parent_group_name: None,
    }
  }

  pub fn in_group(mut self, group: impl Into<String>) -> Self {
    self.parent_group_name = Some(group.into());
    self
  }
}

/// Everything the scheduler needs to know about a component's inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentInterface {
  #[serde(default)]
  pub inputs: Vec<EndpointDefinition>,
  #[serde(default)]
  pub groups: Vec<EndpointGroupDefinition>,
  #[serde(default)]
  pub is_loop_driver: bool,
  #[serde(default)]
  pub is_nested_loop_driver: bool,
}

impl ComponentInterface {
  pub fn from_json(json: &str) -> Result<Self, EndpointError> {
    Ok(serde_json::from_str(json)?)
  }
}
