//! Rivulet Workflow
//!
//! The workflow graph as seen by the execution core: component executions
//! as nodes, output-to-input connections as edges. Both ends of an edge carry
//! an [`EndpointCharacter`](rivulet_endpoint::EndpointCharacter) so that loop
//! drivers can tell connections into their own loop from connections to the
//! enclosing one.
//!
//! The graph is used to precompute the hop paths a nested loop reset has to
//! travel; see [`WorkflowGraph::hops_to_traverse_when_resetting`].

mod error;
mod graph;
mod reset;

pub use error::WorkflowError;
pub use graph::{WorkflowGraph, WorkflowGraphDefinition, WorkflowGraphEdge, WorkflowGraphNode};
