use std::collections::{HashMap, HashSet};

use crate::definition::{
  ComponentInterface, EndpointCharacter, EndpointDefinition, EndpointGroupDefinition,
  InputExecutionConstraint, LogicOperation,
};
use crate::error::EndpointError;
use crate::predicate::{InputReadiness, Readiness, ReadinessPredicate};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Member {
  Input(String),
  Group(String),
}

/// Compiled input policy of one component.
///
/// Built once per component execution from its [`ComponentInterface`]; the
/// scheduler consults it for every readiness evaluation.
#[derive(Debug, Clone)]
pub struct InputPolicy {
  inputs: Vec<EndpointDefinition>,
  index: HashMap<String, usize>,
  predicate: Option<ReadinessPredicate>,
  not_required: Vec<String>,
  considered_for_finish: Vec<String>,
}

impl InputPolicy {
  pub fn build(interface: &ComponentInterface) -> Result<Self, EndpointError> {
    let groups = index_groups(&interface.groups)?;
    let mut index = HashMap::new();
    for (position, input) in interface.inputs.iter().enumerate() {
      if index.insert(input.name.clone(), position).is_some() {
        return Err(EndpointError::DuplicateInput(input.name.clone()));
      }
      if let Some(group) = &input.parent_group_name {
        if !groups.contains_key(group.as_str()) {
          return Err(EndpointError::UnknownGroup {
            member: input.name.clone(),
            group: group.clone(),
          });
        }
      }
    }

    let mut builder = PredicateBuilder::new(&groups);
    let mut not_required = Vec::new();
    let mut considered_for_finish = Vec::new();

    for input in &interface.inputs {
      let participates = match input.input_execution_constraint {
        InputExecutionConstraint::Required => {
          if !input.connected {
            return Err(EndpointError::RequiredInputNotConnected {
              input: input.name.clone(),
            });
          }
          true
        }
        InputExecutionConstraint::RequiredIfConnected => input.connected,
        InputExecutionConstraint::NotRequired => {
          if input.connected && input.parent_group_name.is_none() {
            not_required.push(input.name.clone());
            considered_for_finish.push(input.name.clone());
          }
          input.connected && input.parent_group_name.is_some()
        }
      };
      if participates {
        builder.add_input(input);
        considered_for_finish.push(input.name.clone());
      }
    }

    let outer_loop_count = interface
      .inputs
      .iter()
      .filter(|input| input.endpoint_character == EndpointCharacter::OuterLoop)
      .count();
    if (!interface.is_loop_driver && outer_loop_count > 0) || interface.is_nested_loop_driver {
      considered_for_finish.retain(|name| {
        interface.inputs[index[name]].endpoint_character != EndpointCharacter::SameLoop
      });
    }

    Ok(Self {
      inputs: interface.inputs.clone(),
      index,
      predicate: builder.finish(),
      not_required,
      considered_for_finish,
    })
  }

  /// Evaluates the readiness predicate. A component without any
  /// participating input is never ready.
  pub fn evaluate<F>(&self, probe: &F) -> Readiness
  where
    F: Fn(&str) -> InputReadiness,
  {
    match &self.predicate {
      Some(predicate) => predicate.evaluate(probe),
      None => Readiness::Blocked,
    }
  }

  pub fn predicate(&self) -> Option<&ReadinessPredicate> {
    self.predicate.as_ref()
  }

  pub fn inputs(&self) -> &[EndpointDefinition] {
    &self.inputs
  }

  pub fn input(&self, name: &str) -> Option<&EndpointDefinition> {
    self.index.get(name).map(|position| &self.inputs[*position])
  }

  /// Connected, ungrouped inputs that never gate firing but are handed out
  /// whenever they hold a value.
  pub fn not_required_inputs(&self) -> &[String] {
    &self.not_required
  }

  pub fn is_not_required(&self, name: &str) -> bool {
    self.not_required.iter().any(|input| input == name)
  }

  /// Inputs that must all have signalled finish before the component is
  /// finished.
  pub fn inputs_considered_for_finish(&self) -> &[String] {
    &self.considered_for_finish
  }
}

fn index_groups(
  groups: &[EndpointGroupDefinition],
) -> Result<HashMap<&str, &EndpointGroupDefinition>, EndpointError> {
  let mut index = HashMap::new();
  for group in groups {
    if index.insert(group.name.as_str(), group).is_some() {
      return Err(EndpointError::DuplicateGroup(group.name.clone()));
    }
  }

  for group in groups {
    let mut seen = HashSet::from([group.name.as_str()]);
    let mut current = group;
    while let Some(parent) = &current.parent_group_name {
      let Some(&next) = index.get(parent.as_str()) else {
        return Err(EndpointError::UnknownGroup {
          member: current.name.clone(),
          group: parent.clone(),
        });
      };
      if !seen.insert(next.name.as_str()) {
        return Err(EndpointError::GroupCycle(group.name.clone()));
      }
      current = next;
    }
  }

  Ok(index)
}

/// Collects participating members per group in order of first appearance.
struct PredicateBuilder<'a> {
  groups: &'a HashMap<&'a str, &'a EndpointGroupDefinition>,
  children: HashMap<String, Vec<Member>>,
  top_level: Vec<Member>,
}

impl<'a> PredicateBuilder<'a> {
  fn new(groups: &'a HashMap<&'a str, &'a EndpointGroupDefinition>) -> Self {
    Self {
      groups,
      children: HashMap::new(),
      top_level: Vec::new(),
    }
  }

  fn add_input(&mut self, input: &EndpointDefinition) {
    let mut member = Member::Input(input.name.clone());
    let mut parent = input.parent_group_name.clone();
    while let Some(group_name) = parent {
      let children = self.children.entry(group_name.clone()).or_default();
      if !children.contains(&member) {
        children.push(member);
      }
      parent = self
        .groups
        .get(group_name.as_str())
        .and_then(|group| group.parent_group_name.clone());
      member = Member::Group(group_name);
    }
    if !self.top_level.contains(&member) {
      self.top_level.push(member);
    }
  }

  fn finish(self) -> Option<ReadinessPredicate> {
    if self.top_level.is_empty() {
      return None;
    }
    let terms = self
      .top_level
      .iter()
      .map(|member| self.compile(member))
      .collect();
    Some(ReadinessPredicate::And(terms))
  }

  fn compile(&self, member: &Member) -> ReadinessPredicate {
    match member {
      Member::Input(name) => ReadinessPredicate::Input(name.clone()),
      Member::Group(name) => {
        let terms = self
          .children
          .get(name)
          .map(|children| children.iter().map(|child| self.compile(child)).collect())
          .unwrap_or_default();
        match self.groups.get(name.as_str()).map(|group| group.logic_operation) {
          Some(LogicOperation::Or) => ReadinessPredicate::Or(terms),
          _ => ReadinessPredicate::And(terms),
        }
      }
    }
  }
}
