//! Rivulet Datum
//!
//! This crate contains the token model shared by every other rivulet crate.
//! A token ("endpoint datum") is one value or control signal travelling along
//! one edge of a workflow graph, from an output of one component instance to
//! an input of another.
//!
//! The model is split into:
//! - [`TypedDatum`] - the payload: an ordinary typed value, a "not a value"
//!   marker, or an [`InternalSignal`]
//! - [`InternalSignal`] - in-band control signals (finish, loop reset,
//!   failure in loop) with an optional [`HopPath`]
//! - [`EndpointDatum`] - the payload plus sender/receiver addressing
//!
//! Ordinary values are encoded by a pluggable [`TypedDatumSerializer`];
//! internal signals encode themselves (see [`InternalSignal::serialize`]).

mod codec;
mod convert;
mod datum;
mod error;
mod signal;
mod types;

pub use codec::{JsonTypedDatumSerializer, TypedDatumSerializer};
pub use convert::is_convertible;
pub use datum::{EndpointDatum, NodeId};
pub use error::DatumError;
pub use signal::{HopPath, InternalSignal, InternalSignalKind, WorkflowGraphHop};
pub use types::{
  DataType, DirectoryReference, FileReference, Matrix, NotAValue, NotAValueCause, SmallTable,
  TypedDatum,
};
