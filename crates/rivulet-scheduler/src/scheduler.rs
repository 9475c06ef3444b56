use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::mem;
use std::sync::Arc;

use rivulet_datum::{
  EndpointDatum, InternalSignal, InternalSignalKind, NotAValue, NotAValueCause, TypedDatum,
  is_convertible,
};
use rivulet_endpoint::{ComponentInterface, InputPolicy, InputReadiness, Readiness};
use tracing::{debug, error, warn};

use crate::error::SchedulerError;
use crate::events::{SchedulingEvent, SchedulingNotifier};
use crate::slot::InputSlot;
use crate::state::SchedulingState;

/// Identity and input declarations of the component a scheduler serves.
#[derive(Debug, Clone)]
pub struct SchedulerContext {
  pub execution_id: String,
  pub instance_name: String,
  pub interface: ComponentInterface,
}

/// Readiness state machine of one component execution.
///
/// Arriving datums are validated immediately and queued. The queue is only
/// drained while the scheduler is enabled and idle, one datum at a time, so
/// each datum is evaluated against the state left by the previous firing.
/// Whenever a non-idle state is reached the scheduler posts one event and
/// disables itself until the owner calls [`enable`](Self::enable).
pub struct ExecutionScheduler {
  execution_id: String,
  instance_name: String,
  policy: InputPolicy,
  slots: HashMap<String, InputSlot>,
  notifier: Arc<dyn SchedulingNotifier>,
  validated: VecDeque<EndpointDatum>,
  state: SchedulingState,
  enabled: bool,
  failed: bool,
  /// Inputs satisfying the last executable evaluation.
  ready: Vec<String>,
  reset_datum: Option<InternalSignal>,
  failure_datum: Option<InternalSignal>,
  loop_reset_requested: bool,
  loop_reset: bool,
  reset_ids_sent: HashSet<String>,
  not_a_value_ids_sent: HashSet<String>,
  not_a_value_ids_received: HashMap<String, HashSet<String>>,
}

impl ExecutionScheduler {
  /// Compiles the component's input declarations. Fails if they are
  /// inconsistent, e.g. a required input is not connected. The scheduler
  /// starts disabled.
  pub fn initialize(
    context: SchedulerContext,
    notifier: Arc<dyn SchedulingNotifier>,
  ) -> Result<Self, SchedulerError> {
    let policy = InputPolicy::build(&context.interface)
      .map_err(|e| SchedulerError::configuration(&context.instance_name, e))?;
    let slots = policy
      .inputs()
      .iter()
      .map(|input| (input.name.clone(), InputSlot::new(input.input_datum_handling)))
      .collect();

    debug!(
      execution_id = %context.execution_id,
      instance_name = %context.instance_name,
      "execution scheduler initialized"
    );

    Ok(Self {
      execution_id: context.execution_id,
      instance_name: context.instance_name,
      policy,
      slots,
      notifier,
      validated: VecDeque::new(),
      state: SchedulingState::Idling,
      enabled: false,
      failed: false,
      ready: Vec::new(),
      reset_datum: None,
      failure_datum: None,
      loop_reset_requested: false,
      loop_reset: false,
      reset_ids_sent: HashSet::new(),
      not_a_value_ids_sent: HashSet::new(),
      not_a_value_ids_received: HashMap::new(),
    })
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn instance_name(&self) -> &str {
    &self.instance_name
  }

  pub fn policy(&self) -> &InputPolicy {
    &self.policy
  }

  pub fn scheduling_state(&self) -> SchedulingState {
    self.state
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn has_failed(&self) -> bool {
    self.failed
  }

  /// Validates an arriving datum and queues it for evaluation.
  pub fn validate_and_queue_endpoint_datum(&mut self, datum: EndpointDatum) {
    if self.failed {
      warn!(
        execution_id = %self.execution_id,
        datum = %datum.describe(),
        "scheduling already failed, dropping datum"
      );
      return;
    }
    if let Err(e) = self.validate(&datum) {
      self.post_failure(e);
      return;
    }
    self.validated.push_back(datum);
    if self.enabled {
      self.update_scheduling_state();
    }
  }

  /// Hands out the values of the last executable evaluation.
  ///
  /// Consumes single values, pops the head of queues and leaves constants in
  /// place. Non-required inputs holding a value are included. Fails if no
  /// evaluation is pending. Call it before [`enable`](Self::enable).
  /// Otherwise the same values fire again.
  pub fn fetch_endpoint_datums(
    &mut self,
  ) -> Result<BTreeMap<String, EndpointDatum>, SchedulerError> {
    if self.ready.is_empty() {
      return Err(SchedulerError::NotProcessed);
    }
    let mut datums = BTreeMap::new();
    for name in mem::take(&mut self.ready) {
      if let Some(datum) = self.slots.get_mut(&name).and_then(InputSlot::take) {
        datums.insert(name, datum);
      }
    }
    for name in self.policy.not_required_inputs() {
      if datums.contains_key(name) {
        continue;
      }
      if let Some(datum) = self.slots.get_mut(name).and_then(InputSlot::take) {
        datums.insert(name.clone(), datum);
      }
    }
    Ok(datums)
  }

  /// The reset signal behind the last `Reset` state, to be forwarded.
  ///
  /// The owner must take it before calling [`enable`](Self::enable);
  /// while it is held, every evaluation reports `Reset` again.
  pub fn take_reset_datum(&mut self) -> Option<InternalSignal> {
    self.reset_datum.take()
  }

  /// The failure signal behind the last `FailureForward` state. Like the
  /// reset signal it has to be taken before enabling again.
  pub fn take_failure_datum(&mut self) -> Option<InternalSignal> {
    self.failure_datum.take()
  }

  pub fn enable(&mut self) {
    if self.enabled {
      warn!(
        execution_id = %self.execution_id,
        "scheduler was requested to get enabled even if it is already enabled; ignored"
      );
      return;
    }
    if self.failed || self.state == SchedulingState::Finished {
      debug!(
        execution_id = %self.execution_id,
        state = %self.state,
        "scheduler not enabled"
      );
      return;
    }
    self.enabled = true;
    self.update_scheduling_state();
  }

  /// Suppresses notifications. Queued datums are kept.
  pub fn disable(&mut self) {
    self.enabled = false;
  }

  /// Registers a "not a value" marker emitted by this component; receiving
  /// it back is a violation.
  pub fn add_not_a_value_datum_sent(&mut self, identifier: impl Into<String>) {
    self.not_a_value_ids_sent.insert(identifier.into());
  }

  /// Registers a loop reset emitted by this (driver) component. Until all
  /// registered resets have come back, only reset datums are accepted.
  pub fn add_reset_data_id_sent(&mut self, identifier: impl Into<String>) {
    self.reset_ids_sent.insert(identifier.into());
    self.loop_reset_requested = true;
  }

  pub fn is_loop_reset_requested(&self) -> bool {
    self.loop_reset_requested
  }

  fn validate(&mut self, datum: &EndpointDatum) -> Result<(), SchedulerError> {
    let Some(input) = self.policy.input(&datum.input_name) else {
      return Err(SchedulerError::UnknownInput {
        input: datum.input_name.clone(),
      });
    };

    let actual = datum.value.data_type();
    if let Some(expected) = input.data_type {
      let exempt = matches!(
        datum.value,
        TypedDatum::Internal(_) | TypedDatum::NotAValue(_)
      );
      if !exempt && actual != expected && !is_convertible(actual, expected) {
        return Err(SchedulerError::IncompatibleDataType {
          input: datum.input_name.clone(),
          actual,
          expected,
        });
      }
    }

    // A failure that reached its final recipient is held like a value.
    let held_as_value = match datum.value.as_internal() {
      Some(signal) => {
        signal.kind() == InternalSignalKind::FailureInLoop && signal.hops().is_exhausted()
      }
      None => true,
    };
    if !held_as_value {
      return Ok(());
    }
    let Some(slot) = self.slots.get_mut(&datum.input_name) else {
      return Err(SchedulerError::UnknownInput {
        input: datum.input_name.clone(),
      });
    };
    let description = datum.describe();
    let is_constant = slot.is_constant();
    slot
      .occupy(description.clone())
      .map_err(|current| held_conflict(&datum.input_name, is_constant, current, description))
  }

  fn update_scheduling_state(&mut self) {
    match self.evaluate_queued() {
      Ok(state) => {
        self.state = state;
        if state != SchedulingState::Idling {
          debug!(
            execution_id = %self.execution_id,
            state = %state,
            "scheduling state changed"
          );
          self.enabled = false;
          self.notifier.notify(SchedulingEvent::NewSchedulingState {
            execution_id: self.execution_id.clone(),
            state,
          });
        }
      }
      Err(e) => self.post_failure(e),
    }
  }

  /// Feeds queued datums into the slots until a non-idle state is reached.
  fn evaluate_queued(&mut self) -> Result<SchedulingState, SchedulerError> {
    let mut state = self.calculate_scheduling_state()?;
    while state == SchedulingState::Idling {
      let Some(datum) = self.validated.pop_front() else {
        break;
      };
      self.add_endpoint_datum(datum)?;
      state = self.calculate_scheduling_state()?;
    }
    Ok(state)
  }

  fn post_failure(&mut self, e: SchedulerError) {
    if self.failed {
      return;
    }
    error!(
      execution_id = %self.execution_id,
      instance_name = %self.instance_name,
      error = %e,
      "scheduling failed"
    );
    self.failed = true;
    self.enabled = false;
    self.notifier.notify(SchedulingEvent::SchedulingFailed {
      execution_id: self.execution_id.clone(),
      error: e.to_string(),
    });
  }

  fn calculate_scheduling_state(&mut self) -> Result<SchedulingState, SchedulerError> {
    let slots = &self.slots;
    let readiness = self.policy.evaluate(&|name: &str| {
      slots
        .get(name)
        .map(InputSlot::readiness)
        .unwrap_or(InputReadiness::Blocked)
    });

    if let Readiness::Ready {
      inputs,
      fresh: true,
    } = readiness
    {
      self.ready = inputs;
      return Ok(self.processing_state());
    }
    self.ready.clear();

    let all_finished = self
      .policy
      .inputs_considered_for_finish()
      .iter()
      .all(|name| self.slots.get(name).is_some_and(|slot| slot.finished));

    if all_finished {
      self.check_values_left()?;
      Ok(SchedulingState::Finished)
    } else if self.reset_datum.is_some() {
      self.check_values_left()?;
      self.reset_constants();
      Ok(SchedulingState::Reset)
    } else if self.failure_datum.is_some() {
      Ok(SchedulingState::FailureForward)
    } else if self.loop_reset {
      self.loop_reset = false;
      self.loop_reset_requested = false;
      self.reset_constants();
      Ok(SchedulingState::LoopReset)
    } else {
      Ok(SchedulingState::Idling)
    }
  }

  fn processing_state(&self) -> SchedulingState {
    let handed_out = self
      .ready
      .iter()
      .chain(self.policy.not_required_inputs())
      .filter_map(|name| self.slots.get(name).and_then(InputSlot::head));
    for datum in handed_out {
      if matches!(datum.value, TypedDatum::NotAValue(_)) {
        return SchedulingState::ProcessInputDataWithNotAValueData;
      }
    }
    SchedulingState::ProcessInputData
  }

  fn check_values_left(&self) -> Result<(), SchedulerError> {
    let mut violation = None;
    for input in self.policy.inputs() {
      let Some(slot) = self.slots.get(&input.name) else {
        continue;
      };
      let left = slot.unconsumed();
      if left.is_empty() {
        continue;
      }
      let values = left
        .iter()
        .map(|datum| datum.value.to_string())
        .collect::<Vec<_>>()
        .join(", ");
      if self.policy.is_not_required(&input.name) {
        warn!(
          execution_id = %self.execution_id,
          input = %input.name,
          values = %values,
          "values left at not required input after finish or reset"
        );
      } else if violation.is_none() {
        violation = Some(SchedulerError::ValuesLeft {
          input: input.name.clone(),
          values,
        });
      }
    }
    violation.map_or(Ok(()), Err)
  }

  fn reset_constants(&mut self) {
    for slot in self.slots.values_mut() {
      slot.reset_constant();
    }
  }

  fn add_endpoint_datum(&mut self, datum: EndpointDatum) -> Result<(), SchedulerError> {
    if self.loop_reset_requested {
      let received = match datum.value.as_internal() {
        Some(signal) if signal.kind() == InternalSignalKind::NestedLoopReset => None,
        Some(signal) => Some(signal.kind().display_name().to_string()),
        None => Some(datum.value.data_type().display_name().to_string()),
      };
      if let Some(received) = received {
        return Err(SchedulerError::WaitingForReset {
          input: datum.input_name.clone(),
          received,
        });
      }
    }

    match datum.value.as_internal().cloned() {
      Some(signal) => self.add_internal_datum(datum, signal),
      None => self.add_value_datum(datum),
    }
  }

  fn add_internal_datum(
    &mut self,
    datum: EndpointDatum,
    signal: InternalSignal,
  ) -> Result<(), SchedulerError> {
    match signal.kind() {
      InternalSignalKind::WorkflowFinish => {
        if let Some(slot) = self.slots.get_mut(&datum.input_name) {
          slot.finished = true;
        }
        Ok(())
      }
      InternalSignalKind::FailureInLoop => {
        if signal.hops().is_exhausted() {
          let mut converted = datum.with_value(TypedDatum::NotAValue(NotAValue::new(
            signal.identifier(),
            NotAValueCause::Failure,
          )));
          converted.data_management_id = signal.payload().and_then(|p| p.trim().parse().ok());
          return self.add_value_datum(converted);
        }
        self.check_recipient(&datum, &signal)?;
        self.failure_datum = Some(signal);
        Ok(())
      }
      InternalSignalKind::NestedLoopReset => {
        if self.loop_reset_requested {
          if !signal.hops().is_exhausted() {
            warn!(
              execution_id = %self.execution_id,
              hops = ?signal.hops(),
              "received own reset datum, but component is not the final recipient"
            );
          }
          if !self.reset_ids_sent.remove(signal.identifier()) {
            return Err(SchedulerError::UnexpectedResetIdentifier {
              input: datum.input_name.clone(),
              identifier: signal.identifier().to_string(),
            });
          }
          if self.reset_ids_sent.is_empty() {
            self.loop_reset = true;
          }
          Ok(())
        } else if signal.hops().is_exhausted() {
          Err(SchedulerError::ResetWithoutRequest {
            input: datum.input_name.clone(),
          })
        } else {
          self.check_recipient(&datum, &signal)?;
          self.reset_datum = Some(signal);
          Ok(())
        }
      }
    }
  }

  /// The next hop must be emitted by this execution.
  fn check_recipient(
    &self,
    datum: &EndpointDatum,
    signal: &InternalSignal,
  ) -> Result<(), SchedulerError> {
    match signal.hops().current() {
      Some(hop) if hop.hop_execution_id == self.execution_id => Ok(()),
      _ => Err(SchedulerError::NotRecipient {
        input: datum.input_name.clone(),
        signal: signal.to_string(),
        hops: format!("{:?}", signal.hops()),
      }),
    }
  }

  fn add_value_datum(&mut self, datum: EndpointDatum) -> Result<(), SchedulerError> {
    if let Some(marker) = datum.value.as_not_a_value() {
      let received = self
        .not_a_value_ids_received
        .entry(datum.input_name.clone())
        .or_default();
      if received.contains(&marker.identifier) {
        return Err(SchedulerError::NotAValueReceivedTwice {
          input: datum.input_name.clone(),
          identifier: marker.identifier.clone(),
        });
      }
      if self.not_a_value_ids_sent.contains(&marker.identifier) {
        return Err(SchedulerError::OwnNotAValueReceived {
          input: datum.input_name.clone(),
          identifier: marker.identifier.clone(),
        });
      }
      received.insert(marker.identifier.clone());
    }

    let Some(slot) = self.slots.get_mut(&datum.input_name) else {
      return Err(SchedulerError::UnknownInput {
        input: datum.input_name,
      });
    };
    slot.finished = false;
    let is_constant = slot.is_constant();
    let input = datum.input_name.clone();
    let description = datum.describe();
    slot
      .push(datum)
      .map_err(|current| held_conflict(&input, is_constant, current, description))
  }
}

fn held_conflict(input: &str, is_constant: bool, current: String, new: String) -> SchedulerError {
  if is_constant {
    SchedulerError::ConstantAlreadyHolding {
      input: input.to_string(),
      first: current,
      second: new,
    }
  } else {
    SchedulerError::SingleNotConsumed {
      input: input.to_string(),
      current,
      new,
    }
  }
}
