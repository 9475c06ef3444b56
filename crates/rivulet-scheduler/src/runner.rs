//! Scheduler runner with channel-based delivery.
//!
//! The `SchedulerRunner` owns an mpsc channel of arriving datums and feeds
//! them into one `ExecutionScheduler` in arrival order. The component's
//! worker talks to the same scheduler through a [`SchedulerHandle`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rivulet_datum::{EndpointDatum, InternalSignal};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::SchedulerError;
use crate::scheduler::ExecutionScheduler;
use crate::state::SchedulingState;

/// Default capacity of the inbound datum channel.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Serializes datum arrival and owner calls for one scheduler.
///
/// # Usage
///
/// ```ignore
/// let runner = SchedulerRunner::new(scheduler);
///
/// // Hand out to the dispatch side and to the component worker
/// let handle = runner.handle();
///
/// let cancel = CancellationToken::new();
/// tokio::spawn(runner.start(cancel));
/// handle.enable().await;
/// ```
pub struct SchedulerRunner {
  sender: mpsc::Sender<EndpointDatum>,
  receiver: mpsc::Receiver<EndpointDatum>,
  scheduler: Arc<Mutex<ExecutionScheduler>>,
}

impl SchedulerRunner {
  pub fn new(scheduler: ExecutionScheduler) -> Self {
    Self::with_buffer_size(scheduler, DEFAULT_BUFFER_SIZE)
  }

  pub fn with_buffer_size(scheduler: ExecutionScheduler, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size.max(1));
    Self {
      sender,
      receiver,
      scheduler: Arc::new(Mutex::new(scheduler)),
    }
  }

  /// Sender for arriving datums.
  pub fn sender(&self) -> mpsc::Sender<EndpointDatum> {
    self.sender.clone()
  }

  pub fn handle(&self) -> SchedulerHandle {
    SchedulerHandle {
      sender: self.sender.clone(),
      scheduler: self.scheduler.clone(),
    }
  }

  /// Runs until cancelled or until every sender is dropped.
  #[instrument(skip_all)]
  pub async fn start(mut self, cancel: CancellationToken) -> Result<(), SchedulerError> {
    let execution_id = self.scheduler.lock().await.execution_id().to_string();
    // Handles hold senders too; only the runner's own copy is dropped here.
    drop(self.sender);
    info!(execution_id = %execution_id, "starting scheduler runner");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(execution_id = %execution_id, "scheduler runner cancelled");
          break;
        }
        datum = self.receiver.recv() => {
          match datum {
            Some(datum) => {
              debug!(
                execution_id = %execution_id,
                input = %datum.input_name,
                value = %datum.value,
                "datum received"
              );
              self.scheduler.lock().await.validate_and_queue_endpoint_datum(datum);
            }
            None => {
              info!(execution_id = %execution_id, "scheduler runner channel closed");
              break;
            }
          }
        }
      }
    }

    Ok(())
  }
}

/// Cloneable access to a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
  sender: mpsc::Sender<EndpointDatum>,
  scheduler: Arc<Mutex<ExecutionScheduler>>,
}

impl SchedulerHandle {
  /// Queues an arriving datum behind all datums sent before it.
  pub async fn enqueue(&self, datum: EndpointDatum) -> Result<(), SchedulerError> {
    self
      .sender
      .send(datum)
      .await
      .map_err(|_| SchedulerError::RunnerClosed)
  }

  pub async fn fetch_endpoint_datums(
    &self,
  ) -> Result<BTreeMap<String, EndpointDatum>, SchedulerError> {
    self.scheduler.lock().await.fetch_endpoint_datums()
  }

  pub async fn take_reset_datum(&self) -> Option<InternalSignal> {
    self.scheduler.lock().await.take_reset_datum()
  }

  pub async fn take_failure_datum(&self) -> Option<InternalSignal> {
    self.scheduler.lock().await.take_failure_datum()
  }

  pub async fn enable(&self) {
    self.scheduler.lock().await.enable();
  }

  pub async fn disable(&self) {
    self.scheduler.lock().await.disable();
  }

  pub async fn add_not_a_value_datum_sent(&self, identifier: impl Into<String>) {
    self
      .scheduler
      .lock()
      .await
      .add_not_a_value_datum_sent(identifier);
  }

  pub async fn add_reset_data_id_sent(&self, identifier: impl Into<String>) {
    self.scheduler.lock().await.add_reset_data_id_sent(identifier);
  }

  pub async fn is_loop_reset_requested(&self) -> bool {
    self.scheduler.lock().await.is_loop_reset_requested()
  }

  pub async fn scheduling_state(&self) -> SchedulingState {
    self.scheduler.lock().await.scheduling_state()
  }
}
