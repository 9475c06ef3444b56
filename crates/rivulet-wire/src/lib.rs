//! Rivulet Wire
//!
//! Text encoding of endpoint datums for transport between nodes.
//!
//! A datum is written as a single line of colon separated fields:
//!
//! ```text
//! inputName:value:inputsExecutionId:inputsInstanceName:inputsNodeId:outputsExecutionId:outputsNodeId:workflowExecutionId:workflowControllerNodeId:[dataManagementId]
//! ```
//!
//! Colons and backslashes inside a field are escaped with a backslash. The
//! last field is left empty when the datum has no data management id.
//! Ordinary values are encoded by a [`TypedDatumSerializer`]; internal
//! signals encode themselves.
//!
//! [`TypedDatumSerializer`]: rivulet_datum::TypedDatumSerializer

mod error;
mod escape;
mod serializer;

pub use error::WireError;
pub use escape::{escape_and_join, escape_separator, split_and_unescape, unescape_separator};
pub use serializer::EndpointDatumSerializer;
