//! Interfaces to the component side and to other nodes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use rivulet_datum::{EndpointDatum, NodeId};

use crate::error::{DispatchError, RemoteOperationError};

/// Callbacks of the actor that owns one component execution.
#[async_trait]
pub trait ComponentExecutionController: Send + Sync {
  /// A datum addressed to one of the component's inputs arrived.
  async fn on_endpoint_datum_received(&self, datum: EndpointDatum);

  /// A datum sent by this component could not be delivered.
  async fn on_sending_endpoint_datum_failed(&self, datum: EndpointDatum, error: DispatchError);
}

/// Lookup of the controllers running on the local node.
pub trait LocalControllerRegistry: Send + Sync {
  fn controller(&self, execution_id: &str) -> Option<Arc<dyn ComponentExecutionController>>;
}

/// Entry point of another node's dispatcher.
#[async_trait]
pub trait RemoteEndpointDatumDispatcher: Send + Sync {
  async fn dispatch_endpoint_datum(&self, line: String) -> Result<(), RemoteOperationError>;
}

/// Controller callbacks exposed by another node.
#[async_trait]
pub trait RemoteExecutionControllerService: Send + Sync {
  async fn on_sending_endpoint_datum_failed(
    &self,
    execution_id: &str,
    datum: EndpointDatum,
    error: DispatchError,
  ) -> Result<(), RemoteOperationError>;
}

/// Snapshot view of the network as seen from the local node.
///
/// Refreshed by an outside collaborator; every call may observe a different
/// reachability set.
pub trait NodeDirectory: Send + Sync {
  fn is_local(&self, node: &NodeId) -> bool;

  fn reachable_nodes(&self) -> HashSet<NodeId>;

  fn is_reachable(&self, node: &NodeId) -> bool {
    self.reachable_nodes().contains(node)
  }

  fn remote_dispatcher(&self, node: &NodeId) -> Option<Arc<dyn RemoteEndpointDatumDispatcher>>;

  fn remote_execution_controller_service(
    &self,
    node: &NodeId,
  ) -> Option<Arc<dyn RemoteExecutionControllerService>>;
}

/// Registry backed by a map, filled as executions start and stop.
#[derive(Default)]
pub struct InMemoryControllerRegistry {
  controllers: RwLock<HashMap<String, Arc<dyn ComponentExecutionController>>>,
}

impl InMemoryControllerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(
    &self,
    execution_id: impl Into<String>,
    controller: Arc<dyn ComponentExecutionController>,
  ) {
    self
      .controllers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(execution_id.into(), controller);
  }

  pub fn unregister(&self, execution_id: &str) -> bool {
    self
      .controllers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(execution_id)
      .is_some()
  }
}

impl LocalControllerRegistry for InMemoryControllerRegistry {
  fn controller(&self, execution_id: &str) -> Option<Arc<dyn ComponentExecutionController>> {
    self
      .controllers
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(execution_id)
      .cloned()
  }
}
