use std::collections::HashMap;

use rivulet_endpoint::EndpointCharacter;
use serde::{Deserialize, Serialize};

use crate::WorkflowError;

/// One component execution of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowGraphNode {
  pub execution_id: String,
  pub instance_name: String,
  /// Whether the component drives a loop.
  #[serde(default)]
  pub is_driver: bool,
}

impl WorkflowGraphNode {
  pub fn new(execution_id: impl Into<String>, instance_name: impl Into<String>) -> Self {
    Self {
      execution_id: execution_id.into(),
      instance_name: instance_name.into(),
      is_driver: false,
    }
  }

  pub fn driver(mut self) -> Self {
    self.is_driver = true;
    self
  }
}

/// A connection from an output of one execution to an input of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowGraphEdge {
  pub source_execution_id: String,
  pub output_name: String,
  #[serde(default)]
  pub output_character: EndpointCharacter,
  pub target_execution_id: String,
  pub input_name: String,
  #[serde(default)]
  pub input_character: EndpointCharacter,
}

impl WorkflowGraphEdge {
  pub fn new(
    source_execution_id: impl Into<String>,
    output_name: impl Into<String>,
    target_execution_id: impl Into<String>,
    input_name: impl Into<String>,
  ) -> Self {
    Self {
      source_execution_id: source_execution_id.into(),
      output_name: output_name.into(),
      output_character: EndpointCharacter::SameLoop,
      target_execution_id: target_execution_id.into(),
      input_name: input_name.into(),
      input_character: EndpointCharacter::SameLoop,
    }
  }

  pub fn with_characters(mut self, output: EndpointCharacter, input: EndpointCharacter) -> Self {
    self.output_character = output;
    self.input_character = input;
    self
  }
}

/// Serialized form of a workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraphDefinition {
  #[serde(default)]
  pub nodes: Vec<WorkflowGraphNode>,
  #[serde(default)]
  pub edges: Vec<WorkflowGraphEdge>,
}

/// Graph structure for traversal.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
  nodes: HashMap<String, WorkflowGraphNode>,
  /// execution_id -> outgoing edges, in declaration order.
  outgoing: HashMap<String, Vec<WorkflowGraphEdge>>,
  /// execution_id -> downstream execution ids.
  adjacency: HashMap<String, Vec<String>>,
  /// execution_id -> upstream execution ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl WorkflowGraph {
  pub fn new(definition: WorkflowGraphDefinition) -> Result<Self, WorkflowError> {
    let mut nodes = HashMap::new();
    let mut outgoing: HashMap<String, Vec<WorkflowGraphEdge>> = HashMap::new();
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node in definition.nodes {
      let id = node.execution_id.clone();
      adjacency.entry(id.clone()).or_default();
      reverse_adjacency.entry(id.clone()).or_default();
      if nodes.insert(id.clone(), node).is_some() {
        return Err(WorkflowError::DuplicateNode(id));
      }
    }

    for edge in definition.edges {
      if !nodes.contains_key(&edge.source_execution_id)
        || !nodes.contains_key(&edge.target_execution_id)
      {
        return Err(WorkflowError::InvalidEdge {
          from: edge.source_execution_id,
          to: edge.target_execution_id,
        });
      }
      let downstream = adjacency.entry(edge.source_execution_id.clone()).or_default();
      if !downstream.contains(&edge.target_execution_id) {
        downstream.push(edge.target_execution_id.clone());
      }
      let upstream = reverse_adjacency
        .entry(edge.target_execution_id.clone())
        .or_default();
      if !upstream.contains(&edge.source_execution_id) {
        upstream.push(edge.source_execution_id.clone());
      }
      outgoing
        .entry(edge.source_execution_id.clone())
        .or_default()
        .push(edge);
    }

    Ok(Self {
      nodes,
      outgoing,
      adjacency,
      reverse_adjacency,
    })
  }

  pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
    Self::new(serde_json::from_str(json)?)
  }

  pub fn node(&self, execution_id: &str) -> Result<&WorkflowGraphNode, WorkflowError> {
    self
      .nodes
      .get(execution_id)
      .ok_or_else(|| WorkflowError::NodeNotFound(execution_id.to_string()))
  }

  /// Outgoing edges of a node in declaration order.
  pub fn edges_from(&self, execution_id: &str) -> &[WorkflowGraphEdge] {
    self
      .outgoing
      .get(execution_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn downstream(&self, execution_id: &str) -> &[String] {
    self
      .adjacency
      .get(execution_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn upstream(&self, execution_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(execution_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
