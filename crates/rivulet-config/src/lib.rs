//! Rivulet Config
//!
//! Serializable configuration of a node taking part in workflow execution.
//! Every field has a default, so a partial JSON file such as
//!
//! ```json
//! { "node_id": "node-a", "dispatch": { "retry": { "max_attempts": 5 } } }
//! ```
//!
//! is a valid configuration.

mod enums;
mod error;
mod node;
mod retry;

pub use enums::RetryBackoff;
pub use error::ConfigError;
pub use node::{DispatchConfig, NodeConfig, SchedulerConfig};
pub use retry::RetryConfig;
