use std::collections::HashSet;

use rivulet_datum::{HopPath, WorkflowGraphHop};
use rivulet_endpoint::EndpointCharacter;
use uuid::Uuid;

use crate::graph::{WorkflowGraph, WorkflowGraphEdge};
use crate::WorkflowError;

const DUMMY_PREFIX: &str = "dummy";

impl WorkflowGraph {
  /// Hop paths a nested loop reset emitted by `start_execution_id` has to
  /// travel, one per leaf of a depth-first walk over outgoing edges.
  ///
  /// Every node is entered at most once per walk. A driver only follows
  /// outputs on the loop level it was entered on, so the walk never leaves
  /// the loop being reset. A path that does not end at the start node gets a
  /// terminal hop with unreachable names emitted by its last node, which lets
  /// that node recognise itself as the final forwarder.
  pub fn hops_to_traverse_when_resetting(
    &self,
    start_execution_id: &str,
  ) -> Result<Vec<HopPath>, WorkflowError> {
    self.node(start_execution_id)?;

    let mut visited = HashSet::new();
    let mut chains = Vec::new();
    self.walk(
      start_execution_id,
      EndpointCharacter::SameLoop,
      &mut visited,
      Vec::new(),
      &mut chains,
    )?;

    Ok(
      chains
        .into_iter()
        .map(|chain| HopPath::new(to_hops(start_execution_id, &chain)))
        .collect(),
    )
  }

  fn walk<'a>(
    &'a self,
    execution_id: &str,
    entered_on: EndpointCharacter,
    visited: &mut HashSet<&'a str>,
    chain: Vec<&'a WorkflowGraphEdge>,
    chains: &mut Vec<Vec<&'a WorkflowGraphEdge>>,
  ) -> Result<(), WorkflowError> {
    let node = self.node(execution_id)?;

    let mut next = Vec::new();
    for edge in self.edges_from(execution_id) {
      if visited.contains(edge.target_execution_id.as_str()) {
        continue;
      }
      if node.is_driver && edge.output_character != entered_on {
        continue;
      }
      visited.insert(edge.target_execution_id.as_str());
      next.push(edge);
    }

    if next.is_empty() {
      if !chain.is_empty() {
        chains.push(chain);
      }
      return Ok(());
    }

    for edge in next {
      let mut extended = chain.clone();
      extended.push(edge);
      self.walk(
        &edge.target_execution_id,
        edge.input_character,
        visited,
        extended,
        chains,
      )?;
    }
    Ok(())
  }
}

fn to_hops(start_execution_id: &str, chain: &[&WorkflowGraphEdge]) -> Vec<WorkflowGraphHop> {
  let mut hops: Vec<WorkflowGraphHop> = chain
    .iter()
    .map(|edge| {
      WorkflowGraphHop::new(
        edge.source_execution_id.as_str(),
        edge.output_name.as_str(),
        edge.target_execution_id.as_str(),
        edge.input_name.as_str(),
      )
    })
    .collect();

  if let Some(last) = chain.last() {
    if last.target_execution_id != start_execution_id {
      hops.push(WorkflowGraphHop::new(
        last.target_execution_id.as_str(),
        format!("{DUMMY_PREFIX}{}", Uuid::new_v4()),
        format!("{DUMMY_PREFIX}{}", Uuid::new_v4()),
        format!("{DUMMY_PREFIX}{}", Uuid::new_v4()),
      ));
    }
  }
  hops
}
