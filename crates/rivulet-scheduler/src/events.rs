//! Scheduler events and notifiers.
//!
//! A scheduler reports to its owner through a [`SchedulingNotifier`]. After
//! posting, the scheduler disables itself until the owner calls `enable`
//! again, so a well-behaved owner never sees more than one state event in
//! flight.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::SchedulingState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulingEvent {
  /// A new non-idle state was reached.
  NewSchedulingState {
    execution_id: String,
    state: SchedulingState,
  },

  /// A scheduling violation occurred. Posted once; the scheduler stays
  /// disabled afterwards.
  SchedulingFailed { execution_id: String, error: String },
}

impl SchedulingEvent {
  pub fn execution_id(&self) -> &str {
    match self {
      SchedulingEvent::NewSchedulingState { execution_id, .. }
      | SchedulingEvent::SchedulingFailed { execution_id, .. } => execution_id,
    }
  }
}

pub trait SchedulingNotifier: Send + Sync {
  fn notify(&self, event: SchedulingEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl SchedulingNotifier for NoopNotifier {
  fn notify(&self, _event: SchedulingEvent) {}
}

/// Sends events to an unbounded channel. The enable/disable gate keeps the
/// number of pending events per scheduler small.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<SchedulingEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<SchedulingEvent>) -> Self {
    Self { sender }
  }
}

impl SchedulingNotifier for ChannelNotifier {
  fn notify(&self, event: SchedulingEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// Receiving side of a [`ChannelNotifier`].
#[derive(Debug)]
pub struct SchedulingEvents {
  receiver: mpsc::UnboundedReceiver<SchedulingEvent>,
}

impl SchedulingEvents {
  /// Creates a connected notifier and receiver pair.
  pub fn channel() -> (ChannelNotifier, SchedulingEvents) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelNotifier::new(sender), SchedulingEvents { receiver })
  }

  /// Waits for the next event. Returns `None` once every notifier is gone.
  pub async fn next_event(&mut self) -> Option<SchedulingEvent> {
    self.receiver.recv().await
  }

  /// Returns an already posted event without waiting.
  pub fn try_next_event(&mut self) -> Option<SchedulingEvent> {
    self.receiver.try_recv().ok()
  }
}
