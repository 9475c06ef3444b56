//! Rivulet Endpoint
//!
//! Static input declarations of a component and the readiness predicate
//! derived from them.
//!
//! A component describes its inputs with [`EndpointDefinition`]s and
//! optionally arranges them into a tree of AND/OR [`EndpointGroupDefinition`]s.
//! [`InputPolicy::build`] validates that description and compiles it into a
//! [`ReadinessPredicate`]: a boolean expression that the scheduler evaluates
//! against the current fill state of its input slots.
//!
//! # Example
//!
//! ```json
//! {
//!   "inputs": [
//!     { "name": "x", "input_datum_handling": "single" },
//!     { "name": "y", "input_datum_handling": "queue", "parent_group_name": "any" },
//!     { "name": "z", "input_datum_handling": "constant", "parent_group_name": "any" }
//!   ],
//!   "groups": [{ "name": "any", "logic_operation": "or" }]
//! }
//! ```
//!
//! fires when `x` holds a value and either `y` or `z` does.

mod definition;
mod error;
mod policy;
mod predicate;

pub use definition::{
  ComponentInterface, EndpointCharacter, EndpointDefinition, EndpointGroupDefinition,
  InputDatumHandling, InputExecutionConstraint, LogicOperation,
};
pub use error::EndpointError;
pub use policy::InputPolicy;
pub use predicate::{InputReadiness, Readiness, ReadinessPredicate};
