use std::sync::Arc;

use async_trait::async_trait;
use rivulet_config::DispatchConfig;
use rivulet_datum::EndpointDatum;
use rivulet_wire::EndpointDatumSerializer;
use tracing::{instrument, warn};

use crate::controller::{LocalControllerRegistry, NodeDirectory, RemoteEndpointDatumDispatcher};
use crate::error::{DispatchError, RemoteOperationError};
use crate::failure::FailureCallback;
use crate::processor::EndpointDatumProcessor;
use crate::sender::EndpointDatumSender;

/// Delivers endpoint datums to their receiving component, wherever it runs.
///
/// A datum whose receiver lives on this node goes straight to its
/// controller. Anything else is forwarded, either directly to the receiving
/// node or through the workflow controller node when the receiving node is
/// out of reach. Failures end up at the controller of the sending component.
pub struct EndpointDatumDispatcher {
  directory: Arc<dyn NodeDirectory>,
  serializer: Arc<EndpointDatumSerializer>,
  processor: EndpointDatumProcessor,
  sender: EndpointDatumSender,
  failures: Arc<FailureCallback>,
}

impl EndpointDatumDispatcher {
  pub fn new(
    directory: Arc<dyn NodeDirectory>,
    registry: Arc<dyn LocalControllerRegistry>,
    config: &DispatchConfig,
    serializer: EndpointDatumSerializer,
  ) -> Self {
    let serializer = Arc::new(serializer);
    let failures = Arc::new(FailureCallback::new(directory.clone(), registry.clone()));
    let sender = EndpointDatumSender::new(
      directory.clone(),
      serializer.clone(),
      failures.clone(),
      config,
    );

    Self {
      directory,
      serializer,
      processor: EndpointDatumProcessor::new(registry),
      sender,
      failures,
    }
  }

  /// Entry point for datums arriving from another node.
  #[instrument(skip(self, line))]
  pub async fn dispatch_serialized(&self, line: &str) -> Result<(), DispatchError> {
    let datum = match self.serializer.deserialize_endpoint_datum(line) {
      Ok(datum) => datum,
      Err(e) => {
        warn!(error = %e, line, "dropping undecodable endpoint datum");
        return Err(DispatchError::Decode(e.to_string()));
      }
    };
    self.dispatch(datum).await;
    Ok(())
  }

  /// Routes one datum. Returns once the datum is handed to the local
  /// controller or queued for its receiving node.
  pub async fn dispatch(&self, datum: EndpointDatum) {
    if self.directory.is_local(&datum.inputs_node_id) {
      if let Err(error) = self.processor.process(datum.clone()).await {
        self.failures.report(datum, error).await;
      }
      return;
    }

    self.sender.send(datum).await;
  }

  /// Stops forwarding. Datums not yet sent are reported to their senders
  /// as not sent.
  pub fn shutdown(&self) {
    self.sender.shutdown();
  }
}

impl Drop for EndpointDatumDispatcher {
  fn drop(&mut self) {
    self.sender.shutdown();
  }
}

/// Lets a dispatcher act as the remote end of another node's dispatcher.
/// Only undecodable lines are reported back; every other failure already
/// went to the sending component.
#[async_trait]
impl RemoteEndpointDatumDispatcher for EndpointDatumDispatcher {
  async fn dispatch_endpoint_datum(&self, line: String) -> Result<(), RemoteOperationError> {
    self
      .dispatch_serialized(&line)
      .await
      .map_err(|e| RemoteOperationError::new(e.to_string()))
  }
}
