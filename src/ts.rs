//! Interfaces to transition systems.
//!
//! The tableau builder only reads a system through [`TransitionSystem`]. The realization
//! search additionally copies systems and extends the copies through
//! [`TransitionSystemMut`]; a candidate handed out by the search is never modified.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

use crate::types::Label;

pub trait TransitionSystem {
    type State: Copy + Eq + Ord + Hash + Debug + 'static;

    fn initial_state(&self) -> Self::State;

    /// All states, in a stable order.
    fn states(&self) -> Vec<Self::State>;

    /// States reachable from `state` by one `label`-arc.
    fn successors(&self, state: Self::State, label: &Label) -> Vec<Self::State>;

    /// Labels along a fixed spanning-tree path from the initial state to `state`,
    /// or `None` if `state` is unreachable.
    fn path_from_initial(&self, state: Self::State) -> Option<Vec<Label>>;

    fn alphabet(&self) -> BTreeSet<Label>;

    /// A state without any outgoing arc.
    fn is_deadlock(&self, state: Self::State) -> bool {
        self.alphabet()
            .iter()
            .all(|label| self.successors(state, label).is_empty())
    }

    /// Follow `path` from the initial state.
    ///
    /// Returns the state reached, or an error at the first step whose successor is
    /// missing or not unique.
    fn replay(&self, path: &[Label]) -> Result<Self::State, ReplayError<Self::State>> {
        let mut state = self.initial_state();
        for (i, label) in path.iter().enumerate() {
            let next = self.successors(state, label);
            match next.as_slice() {
                [s] => state = *s,
                _ => {
                    return Err(ReplayError {
                        position: i,
                        state,
                        successors: next.len(),
                    })
                }
            }
        }
        Ok(state)
    }
}

/// Failure of [`TransitionSystem::replay`]: at `path[position]`, `state` had
/// `successors` successors instead of one.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReplayError<S> {
    pub position: usize,
    pub state: S,
    pub successors: usize,
}

/// Copyable, extensible transition systems. `Clone` is the copy constructor.
pub trait TransitionSystemMut: TransitionSystem + Clone {
    fn add_state(&mut self) -> Self::State;

    fn add_arc(&mut self, from: Self::State, label: Label, to: Self::State);
}
