use std::fmt;
use std::sync::Arc;

use rivulet_datum::{
  EndpointDatum, InternalSignal, InternalSignalKind, JsonTypedDatumSerializer, NodeId, TypedDatum,
  TypedDatumSerializer,
};
use serde_json::Value;

use crate::error::WireError;
use crate::escape::{escape_and_join, split_and_unescape};

const FIELD_COUNT: usize = 10;

/// Encodes endpoint datums as single lines and back.
#[derive(Clone)]
pub struct EndpointDatumSerializer {
  values: Arc<dyn TypedDatumSerializer>,
}

impl fmt::Debug for EndpointDatumSerializer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EndpointDatumSerializer").finish_non_exhaustive()
  }
}

impl Default for EndpointDatumSerializer {
  fn default() -> Self {
    Self::new(Arc::new(JsonTypedDatumSerializer))
  }
}

impl EndpointDatumSerializer {
  pub fn new(values: Arc<dyn TypedDatumSerializer>) -> Self {
    Self { values }
  }

  pub fn serialize_endpoint_datum(&self, datum: &EndpointDatum) -> Result<String, WireError> {
    let value = match &datum.value {
      TypedDatum::Internal(signal) => signal.serialize()?,
      other => self.values.serialize(other)?,
    };
    let data_management_id = datum
      .data_management_id
      .map(|id| id.to_string())
      .unwrap_or_default();

    Ok(escape_and_join(&[
      datum.input_name.as_str(),
      &value,
      &datum.inputs_component_execution_id,
      &datum.inputs_component_instance_name,
      datum.inputs_node_id.as_str(),
      &datum.outputs_component_execution_id,
      datum.outputs_node_id.as_str(),
      &datum.workflow_execution_id,
      datum.workflow_controller_node_id.as_str(),
      &data_management_id,
    ]))
  }

  /// Accepts lines with or without the trailing data management id field.
  pub fn deserialize_endpoint_datum(&self, line: &str) -> Result<EndpointDatum, WireError> {
    let mut fields = split_and_unescape(line.trim_end_matches(['\r', '\n']));
    if fields.len() == FIELD_COUNT - 1 {
      fields.push(String::new());
    }
    let found = fields.len();
    let fields: [String; FIELD_COUNT] = fields.try_into().map_err(|_| WireError::FieldCount {
      expected: FIELD_COUNT,
      found,
    })?;
    let [
      input_name,
      value,
      inputs_component_execution_id,
      inputs_component_instance_name,
      inputs_node_id,
      outputs_component_execution_id,
      outputs_node_id,
      workflow_execution_id,
      workflow_controller_node_id,
      data_management_id,
    ] = fields;

    let data_management_id = match data_management_id.as_str() {
      "" => None,
      id => Some(
        id.parse::<i64>()
          .map_err(|_| WireError::InvalidDataManagementId(id.to_string()))?,
      ),
    };

    Ok(EndpointDatum {
      input_name,
      value: self.deserialize_value(&value)?,
      inputs_component_execution_id,
      inputs_component_instance_name,
      inputs_node_id: NodeId::from(inputs_node_id),
      outputs_component_execution_id,
      outputs_node_id: NodeId::from(outputs_node_id),
      workflow_execution_id,
      workflow_controller_node_id: NodeId::from(workflow_controller_node_id),
      data_management_id,
    })
  }

  fn deserialize_value(&self, input: &str) -> Result<TypedDatum, WireError> {
    if is_internal_signal(input) {
      Ok(TypedDatum::Internal(InternalSignal::deserialize(input)?))
    } else {
      Ok(self.values.deserialize(input)?)
    }
  }
}

/// Internal signals carry their kind name where ordinary values carry a
/// data type short name.
fn is_internal_signal(input: &str) -> bool {
  serde_json::from_str::<Value>(input)
    .ok()
    .as_ref()
    .and_then(|root| root.get("t"))
    .and_then(Value::as_str)
    .and_then(InternalSignalKind::parse)
    .is_some()
}
