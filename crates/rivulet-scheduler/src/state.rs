use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a readiness evaluation.
///
/// `Idling` is the initial state and `Finished` is terminal. Every other
/// state is reported once and left again when the owner has collected its
/// payload and re-enabled the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulingState {
  #[default]
  Idling,
  ProcessInputData,
  /// Ready, and at least one handed out value is a "not a value" marker.
  ProcessInputDataWithNotAValueData,
  Reset,
  LoopReset,
  FailureForward,
  Finished,
}

impl SchedulingState {
  pub fn as_str(self) -> &'static str {
    match self {
      SchedulingState::Idling => "IDLING",
      SchedulingState::ProcessInputData => "PROCESS_INPUT_DATA",
      SchedulingState::ProcessInputDataWithNotAValueData => {
        "PROCESS_INPUT_DATA_WITH_NOT_A_VALUE_DATA"
      }
      SchedulingState::Reset => "RESET",
      SchedulingState::LoopReset => "LOOP_RESET",
      SchedulingState::FailureForward => "FAILURE_FORWARD",
      SchedulingState::Finished => "FINISHED",
    }
  }

  pub fn is_processing(self) -> bool {
    matches!(
      self,
      SchedulingState::ProcessInputData | SchedulingState::ProcessInputDataWithNotAValueData
    )
  }
}

impl fmt::Display for SchedulingState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
