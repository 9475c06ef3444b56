use std::sync::Arc;

use rivulet_datum::EndpointDatum;
use tracing::{error, warn};

use crate::controller::{LocalControllerRegistry, NodeDirectory};
use crate::error::DispatchError;

/// Routes delivery failures back to the controller of the sending component,
/// locally or on the sender's node.
pub(crate) struct FailureCallback {
  directory: Arc<dyn NodeDirectory>,
  registry: Arc<dyn LocalControllerRegistry>,
}

impl FailureCallback {
  pub(crate) fn new(
    directory: Arc<dyn NodeDirectory>,
    registry: Arc<dyn LocalControllerRegistry>,
  ) -> Self {
    Self {
      directory,
      registry,
    }
  }

  pub(crate) async fn report(&self, datum: EndpointDatum, failure: DispatchError) {
    let execution_id = datum.outputs_component_execution_id.clone();
    warn!(
      datum = %datum.describe(),
      sender = %execution_id,
      error = %failure,
      "failed to deliver endpoint datum"
    );

    if self.directory.is_local(&datum.outputs_node_id) {
      match self.registry.controller(&execution_id) {
        Some(controller) => controller.on_sending_endpoint_datum_failed(datum, failure).await,
        None => error!(
          sender = %execution_id,
          "no local controller to notify about failed delivery"
        ),
      }
      return;
    }

    let node = datum.outputs_node_id.clone();
    match self.directory.remote_execution_controller_service(&node) {
      Some(service) => {
        if let Err(e) = service
          .on_sending_endpoint_datum_failed(&execution_id, datum, failure)
          .await
        {
          error!(
            sender = %execution_id,
            node = %node,
            error = %e,
            "failed to notify remote controller about failed delivery"
          );
        }
      }
      None => error!(
        sender = %execution_id,
        node = %node,
        "no remote controller service to notify about failed delivery"
      ),
    }
  }
}
