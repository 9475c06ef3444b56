use std::collections::VecDeque;

use rivulet_datum::EndpointDatum;
use rivulet_endpoint::{InputDatumHandling, InputReadiness};

#[derive(Debug)]
enum Held {
  Single(Option<EndpointDatum>),
  Queue(VecDeque<EndpointDatum>),
  Constant {
    value: Option<EndpointDatum>,
    consumed: bool,
  },
}

/// Values held at one input plus its finish bookkeeping.
#[derive(Debug)]
pub(crate) struct InputSlot {
  held: Held,
  /// Set by a finish signal, cleared by the next ordinary value.
  pub(crate) finished: bool,
  consumed_any: bool,
  /// Description of the value occupying a single or constant input, tracked
  /// on arrival before the value reaches the slot.
  occupied_by: Option<String>,
}

impl InputSlot {
  pub(crate) fn new(handling: InputDatumHandling) -> Self {
    let held = match handling {
      InputDatumHandling::Single => Held::Single(None),
      InputDatumHandling::Queue => Held::Queue(VecDeque::new()),
      InputDatumHandling::Constant => Held::Constant {
        value: None,
        consumed: false,
      },
    };
    Self {
      held,
      finished: false,
      consumed_any: false,
      occupied_by: None,
    }
  }

  pub(crate) fn is_constant(&self) -> bool {
    matches!(self.held, Held::Constant { .. })
  }

  /// Marks the input occupied on arrival. Returns the description of the
  /// value already occupying it, if any. Queues are never occupied.
  pub(crate) fn occupy(&mut self, description: String) -> Result<(), String> {
    if matches!(self.held, Held::Queue(_)) {
      return Ok(());
    }
    match &self.occupied_by {
      Some(current) => Err(current.clone()),
      None => {
        self.occupied_by = Some(description);
        Ok(())
      }
    }
  }

  /// Stores an arrived value. A single or constant input already holding a
  /// value keeps it and returns the description of the held value.
  pub(crate) fn push(&mut self, datum: EndpointDatum) -> Result<(), String> {
    match &mut self.held {
      Held::Single(Some(current)) | Held::Constant {
        value: Some(current),
        ..
      } => return Err(current.describe()),
      Held::Single(value) => *value = Some(datum),
      Held::Queue(values) => values.push_back(datum),
      Held::Constant { value, consumed } => {
        *value = Some(datum);
        *consumed = false;
      }
    }
    Ok(())
  }

  pub(crate) fn head(&self) -> Option<&EndpointDatum> {
    match &self.held {
      Held::Single(value) | Held::Constant { value, .. } => value.as_ref(),
      Held::Queue(values) => values.front(),
    }
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.head().is_none()
  }

  pub(crate) fn readiness(&self) -> InputReadiness {
    match &self.held {
      Held::Constant {
        value: Some(_),
        consumed,
      } => InputReadiness::Available { fresh: !consumed },
      _ if !self.is_empty() => InputReadiness::Available { fresh: true },
      _ if self.finished && self.consumed_any => InputReadiness::Drained,
      _ => InputReadiness::Blocked,
    }
  }

  /// Hands out the current value. Constants keep theirs.
  pub(crate) fn take(&mut self) -> Option<EndpointDatum> {
    let taken = match &mut self.held {
      Held::Single(value) => {
        self.occupied_by = None;
        value.take()
      }
      Held::Queue(values) => values.pop_front(),
      Held::Constant { value, consumed } => {
        *consumed = true;
        value.clone()
      }
    };
    if taken.is_some() {
      self.consumed_any = true;
    }
    taken
  }

  /// Values still waiting at a consuming (single or queue) input.
  pub(crate) fn unconsumed(&self) -> Vec<&EndpointDatum> {
    match &self.held {
      Held::Single(value) => value.iter().collect(),
      Held::Queue(values) => values.iter().collect(),
      Held::Constant { .. } => Vec::new(),
    }
  }

  /// Clears a constant for the next loop run unless its input has finished.
  pub(crate) fn reset_constant(&mut self) {
    if self.finished {
      return;
    }
    if let Held::Constant { value, consumed } = &mut self.held {
      *value = None;
      *consumed = false;
      self.occupied_by = None;
    }
  }
}

#[cfg(test)]
mod tests {
  use rivulet_datum::{NodeId, TypedDatum};

  use super::*;

  fn datum(value: i64) -> EndpointDatum {
    EndpointDatum {
      input_name: "x".to_string(),
      value: TypedDatum::Integer(value),
      inputs_component_execution_id: "exe".to_string(),
      inputs_component_instance_name: "X".to_string(),
      inputs_node_id: NodeId::from("n"),
      outputs_component_execution_id: "src".to_string(),
      outputs_node_id: NodeId::from("n"),
      workflow_execution_id: "wf".to_string(),
      workflow_controller_node_id: NodeId::from("n"),
      data_management_id: None,
    }
  }

  #[test]
  fn test_queue_is_fifo_and_never_occupied() {
    let mut slot = InputSlot::new(InputDatumHandling::Queue);
    assert!(slot.occupy("a".to_string()).is_ok());
    assert!(slot.occupy("b".to_string()).is_ok());
    slot.push(datum(1)).unwrap();
    slot.push(datum(2)).unwrap();

    assert_eq!(slot.take().map(|d| d.value), Some(TypedDatum::Integer(1)));
    assert_eq!(slot.unconsumed().len(), 1);
    assert_eq!(slot.take().map(|d| d.value), Some(TypedDatum::Integer(2)));
    assert_eq!(slot.readiness(), InputReadiness::Blocked);

    slot.finished = true;
    assert_eq!(slot.readiness(), InputReadiness::Drained);
  }

  #[test]
  fn test_single_occupancy_released_on_take() {
    let mut slot = InputSlot::new(InputDatumHandling::Single);
    slot.occupy("first".to_string()).unwrap();
    assert_eq!(slot.occupy("second".to_string()), Err("first".to_string()));

    slot.push(datum(1)).unwrap();
    slot.take();
    assert!(slot.occupy("third".to_string()).is_ok());
  }

  #[test]
  fn test_constant_is_reused_until_reset() {
    let mut slot = InputSlot::new(InputDatumHandling::Constant);
    slot.occupy("c".to_string()).unwrap();
    slot.push(datum(7)).unwrap();

    assert_eq!(slot.readiness(), InputReadiness::Available { fresh: true });
    assert!(slot.take().is_some());
    assert_eq!(slot.readiness(), InputReadiness::Available { fresh: false });
    assert!(slot.take().is_some());
    assert!(slot.unconsumed().is_empty());

    slot.reset_constant();
    assert_eq!(slot.readiness(), InputReadiness::Blocked);
    assert!(slot.occupy("next run".to_string()).is_ok());
  }

  #[test]
  fn test_single_push_keeps_held_value() {
    let mut slot = InputSlot::new(InputDatumHandling::Single);
    slot.push(datum(1)).unwrap();

    assert!(slot.push(datum(2)).is_err());
    assert_eq!(slot.take().map(|d| d.value), Some(TypedDatum::Integer(1)));
    assert!(slot.push(datum(3)).is_ok());
  }

  #[test]
  fn test_constant_push_keeps_held_value_until_reset() {
    let mut slot = InputSlot::new(InputDatumHandling::Constant);
    slot.push(datum(1)).unwrap();
    slot.take();

    assert!(slot.push(datum(2)).is_err());
    slot.reset_constant();
    assert!(slot.push(datum(2)).is_ok());
  }

  #[test]
  fn test_finished_without_values_blocks() {
    let mut slot = InputSlot::new(InputDatumHandling::Single);
    slot.finished = true;
    assert_eq!(slot.readiness(), InputReadiness::Blocked);
  }
}
