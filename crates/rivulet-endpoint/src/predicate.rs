//! Readiness predicate over input slots.
//!
//! Each input reports one of three states:
//! - `Available` - it holds a value; `fresh` is false only for a constant
//!   whose value was already handed out once
//! - `Drained` - it signalled finish, holds nothing, and delivered values
//!   before; it no longer takes part in firing decisions
//! - `Blocked` - it is still waiting for a value
//!
//! AND nodes are ready when no child is blocked and at least one child is
//! ready; they return the union of their ready children. OR nodes pick the
//! first child (in declaration order) holding a fresh value; a constant that
//! was already handed out never satisfies an OR on its own. A predicate
//! result is only worth firing for when it contains at least one fresh value.

/// Fill state of a single input slot as seen by the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReadiness {
  Available { fresh: bool },
  Drained,
  Blocked,
}

/// Outcome of evaluating a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
  /// Inputs whose values would be handed out if the component fired now.
  Ready { inputs: Vec<String>, fresh: bool },
  Drained,
  Blocked,
}

impl Readiness {
  /// Whether this result should trigger a firing.
  pub fn is_executable(&self) -> bool {
    matches!(self, Readiness::Ready { fresh: true, .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessPredicate {
  Input(String),
  And(Vec<ReadinessPredicate>),
  Or(Vec<ReadinessPredicate>),
}

impl ReadinessPredicate {
  pub fn evaluate<F>(&self, probe: &F) -> Readiness
  where
    F: Fn(&str) -> InputReadiness,
  {
    match self {
      ReadinessPredicate::Input(name) => match probe(name) {
        InputReadiness::Available { fresh } => Readiness::Ready {
          inputs: vec![name.clone()],
          fresh,
        },
        InputReadiness::Drained => Readiness::Drained,
        InputReadiness::Blocked => Readiness::Blocked,
      },
      ReadinessPredicate::And(children) => {
        let mut inputs = Vec::new();
        let mut fresh = false;
        let mut any_ready = false;
        for child in children {
          match child.evaluate(probe) {
            Readiness::Blocked => return Readiness::Blocked,
            Readiness::Drained => {}
            Readiness::Ready {
              inputs: child_inputs,
              fresh: child_fresh,
            } => {
              any_ready = true;
              fresh |= child_fresh;
              inputs.extend(child_inputs);
            }
          }
        }
        if any_ready {
          Readiness::Ready { inputs, fresh }
        } else {
          Readiness::Drained
        }
      }
      ReadinessPredicate::Or(children) => {
        let mut all_drained = true;
        for child in children {
          match child.evaluate(probe) {
            ready @ Readiness::Ready { fresh: true, .. } => return ready,
            Readiness::Drained => {}
            Readiness::Ready { .. } | Readiness::Blocked => all_drained = false,
          }
        }
        if all_drained {
          Readiness::Drained
        } else {
          Readiness::Blocked
        }
      }
    }
  }

  /// All input names referenced by this predicate, in declaration order.
  pub fn inputs(&self) -> Vec<&str> {
    let mut names = Vec::new();
    self.collect_inputs(&mut names);
    names
  }

  fn collect_inputs<'a>(&'a self, names: &mut Vec<&'a str>) {
    match self {
      ReadinessPredicate::Input(name) => names.push(name),
      ReadinessPredicate::And(children) | ReadinessPredicate::Or(children) => {
        for child in children {
          child.collect_inputs(names);
        }
      }
    }
  }
}
