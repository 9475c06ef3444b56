//! Forwarding to other nodes.
//!
//! Each receiving node gets its own worker task fed by an unbounded channel.
//! Datums for the same receiving node leave in submission order, one at a
//! time, whether they go there directly or through the workflow controller
//! node. Receiving nodes never wait on each other.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rivulet_config::DispatchConfig;
use rivulet_datum::{EndpointDatum, NodeId};
use rivulet_wire::EndpointDatumSerializer;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::NodeDirectory;
use crate::error::DispatchError;
use crate::failure::FailureCallback;
use crate::retry::RetryPolicy;

struct SenderShared {
  directory: Arc<dyn NodeDirectory>,
  serializer: Arc<EndpointDatumSerializer>,
  failures: Arc<FailureCallback>,
  retry: RetryPolicy,
  reachability_retry: RetryPolicy,
}

pub(crate) struct EndpointDatumSender {
  shared: Arc<SenderShared>,
  workers: Mutex<HashMap<NodeId, mpsc::UnboundedSender<EndpointDatum>>>,
  shutdown: CancellationToken,
}

impl EndpointDatumSender {
  pub(crate) fn new(
    directory: Arc<dyn NodeDirectory>,
    serializer: Arc<EndpointDatumSerializer>,
    failures: Arc<FailureCallback>,
    config: &DispatchConfig,
  ) -> Self {
    Self {
      shared: Arc::new(SenderShared {
        directory,
        serializer,
        failures,
        retry: RetryPolicy::new(config.retry),
        reachability_retry: RetryPolicy::new(config.reachability_retry),
      }),
      workers: Mutex::new(HashMap::new()),
      shutdown: CancellationToken::new(),
    }
  }

  /// Queues `datum` behind every datum sent before it to the same receiving
  /// node. Returns once queued, not once sent.
  pub(crate) async fn send(&self, datum: EndpointDatum) {
    let receiving_node = datum.inputs_node_id.clone();
    let rejected = {
      let mut workers = self.workers.lock().await;
      if self.shutdown.is_cancelled() {
        Some(datum)
      } else {
        let queue = workers
          .entry(receiving_node.clone())
          .or_insert_with(|| self.spawn_worker(receiving_node.clone()));
        queue.send(datum).err().map(|e| e.0)
      }
    };

    if let Some(datum) = rejected {
      self
        .shared
        .failures
        .report(datum, DispatchError::SenderClosed { node: receiving_node })
        .await;
    }
  }

  /// Stops all workers. Datums still queued are reported as not sent.
  pub(crate) fn shutdown(&self) {
    self.shutdown.cancel();
  }

  fn spawn_worker(&self, receiving_node: NodeId) -> mpsc::UnboundedSender<EndpointDatum> {
    let (sender, receiver) = mpsc::unbounded_channel();
    let worker = ReceivingNodeWorker {
      receiving_node,
      relayed_through: HashSet::new(),
      shared: self.shared.clone(),
      receiver,
    };
    tokio::spawn(worker.run(self.shutdown.clone()));
    sender
  }
}

struct ReceivingNodeWorker {
  receiving_node: NodeId,
  /// Controller nodes this worker already relayed through. Later datums
  /// keep that route so they cannot overtake the relayed ones.
  relayed_through: HashSet<NodeId>,
  shared: Arc<SenderShared>,
  receiver: mpsc::UnboundedReceiver<EndpointDatum>,
}

impl ReceivingNodeWorker {
  async fn run(mut self, cancel: CancellationToken) {
    debug!(node = %self.receiving_node, "starting sender worker");

    loop {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          self.reject_queued().await;
          info!(node = %self.receiving_node, "sender worker stopped");
          break;
        }
        datum = self.receiver.recv() => {
          let Some(datum) = datum else {
            break;
          };
          if let Err(error) = self.deliver(&datum).await {
            self.shared.failures.report(datum, error).await;
          }
        }
      }
    }
  }

  async fn reject_queued(&mut self) {
    self.receiver.close();
    while let Ok(datum) = self.receiver.try_recv() {
      let error = DispatchError::SenderClosed {
        node: self.receiving_node.clone(),
      };
      self.shared.failures.report(datum, error).await;
    }
  }

  async fn deliver(&mut self, datum: &EndpointDatum) -> Result<(), DispatchError> {
    let next_hop = self.next_hop(datum);
    self.await_reachable(&next_hop).await?;

    let line = self
      .shared
      .serializer
      .serialize_endpoint_datum(datum)
      .map_err(|e| DispatchError::Encode(e.to_string()))?;

    let Some(remote) = self.shared.directory.remote_dispatcher(&next_hop) else {
      return Err(DispatchError::NoRemoteDispatcher { node: next_hop });
    };

    debug!(
      node = %next_hop,
      datum = %datum.describe(),
      "forwarding endpoint datum"
    );
    self
      .shared
      .retry
      .execute(|_| {
        let remote = remote.clone();
        let line = line.clone();
        async move { remote.dispatch_endpoint_datum(line).await }
      })
      .await
      .map_err(|e| DispatchError::Remote {
        node: next_hop,
        message: e.message,
      })
  }

  /// The receiving node itself, unless it is out of reach and this node is
  /// not the workflow controller.
  fn next_hop(&mut self, datum: &EndpointDatum) -> NodeId {
    let directory = &self.shared.directory;
    let controller = &datum.workflow_controller_node_id;
    if directory.is_local(controller) {
      return self.receiving_node.clone();
    }
    if self.relayed_through.contains(controller) || !directory.is_reachable(&self.receiving_node)
    {
      if self.relayed_through.insert(controller.clone()) {
        debug!(
          node = %self.receiving_node,
          relay = %controller,
          "receiving node not reachable, relaying through workflow controller"
        );
      }
      return controller.clone();
    }
    self.receiving_node.clone()
  }

  async fn await_reachable(&self, node: &NodeId) -> Result<(), DispatchError> {
    let directory = &self.shared.directory;
    self
      .shared
      .reachability_retry
      .execute(|attempt| async move {
        if directory.is_reachable(node) {
          Ok(())
        } else {
          if attempt == 1 {
            warn!(node = %node, "node not reachable, waiting");
          }
          Err(DispatchError::Unreachable { node: node.clone() })
        }
      })
      .await
  }
}
