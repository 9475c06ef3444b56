//! Rivulet Dispatch
//!
//! Moves endpoint datums between component executions. Receivers on the
//! local node are reached through their controller; receivers elsewhere are
//! reached through the serialized line format of `rivulet-wire`.
//!
//! ```text
//!   dispatch(datum)
//!        │
//!        ├─ receiver local ──► EndpointDatumProcessor ─► controller
//!        │
//!        └─ otherwise ───────► EndpointDatumSender, one queue per receiving node
//!                                   │
//!                                   ├─ receiver reachable, or this node is
//!                                   │  the controller ─► receiver node
//!                                   │                    (waits for reachability)
//!                                   │
//!                                   └─ otherwise ─────► controller node, and
//!                                                       every later datum too
//! ```
//!
//! Any delivery failure is reported to the controller of the sending
//! component, locally or through its node's controller service.

mod controller;
mod dispatcher;
mod error;
mod failure;
mod processor;
mod retry;
mod sender;

pub use controller::{
  ComponentExecutionController, InMemoryControllerRegistry, LocalControllerRegistry, NodeDirectory,
  RemoteEndpointDatumDispatcher, RemoteExecutionControllerService,
};
pub use dispatcher::EndpointDatumDispatcher;
pub use error::{DispatchError, RemoteOperationError};
pub use processor::EndpointDatumProcessor;
pub use retry::RetryPolicy;
