//! Rivulet Scheduler
//!
//! Per-component readiness state machine. One `ExecutionScheduler` exists
//! per component execution; it collects arriving datums into input slots and
//! decides when the component fires, resets, forwards a failure or finishes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SchedulerRunner                        │
//! │  - owns mpsc channel of arriving datums                     │
//! │  - start(cancel) feeds them in arrival order                │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ExecutionScheduler                        │
//! │  - validates datums on arrival                              │
//! │  - evaluates the input policy one datum at a time           │
//! │  - posts SchedulingEvents, then waits to be enabled         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SchedulingNotifier                       │
//! │  - component worker fetches values and re-enables           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let (notifier, mut events) = SchedulingEvents::channel();
//! let scheduler = ExecutionScheduler::initialize(context, Arc::new(notifier))?;
//! let runner = SchedulerRunner::new(scheduler);
//! let handle = runner.handle();
//! tokio::spawn(runner.start(cancel));
//!
//! handle.enable().await;
//! while let Some(event) = events.next_event().await {
//!   // fetch, run the component, enable again
//! }
//! ```

mod error;
mod events;
mod runner;
mod scheduler;
mod slot;
mod state;

pub use error::SchedulerError;
pub use events::{
  ChannelNotifier, NoopNotifier, SchedulingEvent, SchedulingEvents, SchedulingNotifier,
};
pub use runner::{DEFAULT_BUFFER_SIZE, SchedulerHandle, SchedulerRunner};
pub use scheduler::{ExecutionScheduler, SchedulerContext};
pub use state::SchedulingState;
