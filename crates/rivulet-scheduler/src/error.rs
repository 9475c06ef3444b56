use rivulet_datum::DataType;
use rivulet_endpoint::EndpointError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
  #[error("invalid input configuration of '{instance_name}': {message}")]
  Configuration {
    instance_name: String,
    message: String,
  },

  #[error("received value for unknown input '{input}'")]
  UnknownInput { input: String },

  #[error(
    "value of type '{actual}' at input '{input}' received that is not convertible to expected data type '{expected}'"
  )]
  IncompatibleDataType {
    input: String,
    actual: DataType,
    expected: DataType,
  },

  #[error(
    "a second value at input '{input}' of type 'constant' received; only one value is allowed per loop run. First: {first}. Second: {second}"
  )]
  ConstantAlreadyHolding {
    input: String,
    first: String,
    second: String,
  },

  #[error(
    "a new value at input '{input}' of type 'single' received, but the current one was not consumed yet; use input type 'queue' if queuing is intended. Current: {current}. New: {new}"
  )]
  SingleNotConsumed {
    input: String,
    current: String,
    new: String,
  },

  #[error(
    "received input at '{input}' of type '{received}', but component is waiting for datums of type 'Internal (Reset)'; review the connections of the (nested) loops"
  )]
  WaitingForReset { input: String, received: String },

  #[error("received 'not a value' datum '{identifier}' at input '{input}' twice; no component handled it within the loop")]
  NotAValueReceivedTwice { input: String, identifier: String },

  #[error("received own 'not a value' datum '{identifier}' at input '{input}'; no component handled it within the loop")]
  OwnNotAValueReceived { input: String, identifier: String },

  #[error("received unexpected (wrong identifier) reset datum '{identifier}' at input '{input}'")]
  UnexpectedResetIdentifier { input: String, identifier: String },

  #[error("received reset datum at input '{input}' as final recipient, but no loop reset was requested")]
  ResetWithoutRequest { input: String },

  #[error("received {signal} at input '{input}', but component is not the recipient; hops left: {hops}")]
  NotRecipient {
    input: String,
    signal: String,
    hops: String,
  },

  #[error("component is finished or reset, but there are values for input '{input}' left that are not processed yet: {values}")]
  ValuesLeft { input: String, values: String },

  #[error("no input values ready to be processed")]
  NotProcessed,

  #[error("scheduler runner is closed")]
  RunnerClosed,
}

impl SchedulerError {
  pub(crate) fn configuration(instance_name: &str, error: EndpointError) -> Self {
    SchedulerError::Configuration {
      instance_name: instance_name.to_string(),
      message: error.to_string(),
    }
  }
}
