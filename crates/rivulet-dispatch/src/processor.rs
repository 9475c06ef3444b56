use std::sync::Arc;

use rivulet_datum::EndpointDatum;
use tracing::debug;

use crate::controller::LocalControllerRegistry;
use crate::error::DispatchError;

/// Hands datums to controllers running on this node.
pub struct EndpointDatumProcessor {
  registry: Arc<dyn LocalControllerRegistry>,
}

impl EndpointDatumProcessor {
  pub fn new(registry: Arc<dyn LocalControllerRegistry>) -> Self {
    Self { registry }
  }

  /// Fails if the target execution has no registered controller, e.g. it
  /// was not started yet or already terminated.
  pub async fn process(&self, datum: EndpointDatum) -> Result<(), DispatchError> {
    let Some(controller) = self.registry.controller(&datum.inputs_component_execution_id) else {
      return Err(DispatchError::NoLocalController {
        execution_id: datum.inputs_component_execution_id,
      });
    };
    debug!(datum = %datum.describe(), "processing endpoint datum locally");
    controller.on_endpoint_datum_received(datum).await;
    Ok(())
  }
}
