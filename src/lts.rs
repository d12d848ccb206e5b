//! Explicit labeled transition systems.
//!
//! ```
//! use mucalc_rs::lts::Lts;
//! use mucalc_rs::ts::{TransitionSystem, TransitionSystemMut};
//! use mucalc_rs::types::Label;
//!
//! let mut lts = Lts::new(["a", "b"]);
//! let s0 = lts.initial_state();
//! let s1 = lts.add_state();
//! lts.add_arc(s0, Label::new("a"), s1);
//!
//! assert_eq!(lts.successors(s0, &Label::new("a")), vec![s1]);
//! assert!(lts.is_deadlock(s1));
//! assert_eq!(lts.path_from_initial(s1), Some(vec![Label::new("a")]));
//! ```

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::ts::{TransitionSystem, TransitionSystemMut};
use crate::types::{Label, StateId};

#[derive(Debug, Clone)]
pub struct Lts {
    /// Declared alphabet. Arcs may carry other labels; oracles are free to reject them.
    alphabet: BTreeSet<Label>,
    /// Outgoing arcs of every state, in insertion order.
    arcs: Vec<Vec<(Label, StateId)>>,
    initial: StateId,
}

impl Lts {
    /// A system with a single state (the initial one) and no arcs.
    pub fn new<L>(alphabet: impl IntoIterator<Item = L>) -> Self
    where
        L: Into<Label>,
    {
        Self {
            alphabet: alphabet.into_iter().map(Into::into).collect(),
            arcs: vec![Vec::new()],
            initial: StateId::new(0),
        }
    }

    pub fn num_states(&self) -> usize {
        self.arcs.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.iter().map(|out| out.len()).sum()
    }

    /// Outgoing arcs of a state.
    pub fn outgoing(&self, state: StateId) -> &[(Label, StateId)] {
        &self.arcs[state.index()]
    }

    /// All arcs as `(from, label, to)`.
    pub fn arcs(&self) -> impl Iterator<Item = (StateId, &Label, StateId)> + '_ {
        self.arcs
            .iter()
            .enumerate()
            .flat_map(|(i, out)| out.iter().map(move |(a, t)| (StateId::new(i as u32), a, *t)))
    }

    /// No state has two outgoing arcs with the same label.
    pub fn is_deterministic(&self) -> bool {
        self.arcs.iter().all(|out| {
            let labels: BTreeSet<&Label> = out.iter().map(|(a, _)| a).collect();
            labels.len() == out.len()
        })
    }

    /// Breadth-first spanning tree: for every reachable state, the parent state and the
    /// label of the tree arc into it.
    fn spanning_tree(&self) -> HashMap<StateId, Option<(StateId, Label)>> {
        let mut parent = HashMap::new();
        let mut queue = VecDeque::new();
        parent.insert(self.initial, None);
        queue.push_back(self.initial);

        while let Some(s) = queue.pop_front() {
            for (a, t) in self.outgoing(s) {
                if !parent.contains_key(t) {
                    parent.insert(*t, Some((s, a.clone())));
                    queue.push_back(*t);
                }
            }
        }

        parent
    }

    /// Check whether the reachable parts of two deterministic systems are equal up to
    /// renaming of states.
    ///
    /// Systems that are not deterministic are never reported as isomorphic.
    pub fn is_isomorphic(&self, other: &Lts) -> bool {
        if !self.is_deterministic() || !other.is_deterministic() {
            return false;
        }

        let mut forward: HashMap<StateId, StateId> = HashMap::new();
        let mut backward: HashMap<StateId, StateId> = HashMap::new();
        let mut queue = VecDeque::new();
        forward.insert(self.initial, other.initial);
        backward.insert(other.initial, self.initial);
        queue.push_back((self.initial, other.initial));

        while let Some((s, t)) = queue.pop_front() {
            let mut out_s: Vec<&(Label, StateId)> = self.outgoing(s).iter().collect();
            let mut out_t: Vec<&(Label, StateId)> = other.outgoing(t).iter().collect();
            if out_s.len() != out_t.len() {
                return false;
            }
            out_s.sort_by(|x, y| x.0.cmp(&y.0));
            out_t.sort_by(|x, y| x.0.cmp(&y.0));

            for ((a, s2), (b, t2)) in out_s.into_iter().zip(out_t) {
                if a != b {
                    return false;
                }
                match (forward.get(s2), backward.get(t2)) {
                    (None, None) => {
                        forward.insert(*s2, *t2);
                        backward.insert(*t2, *s2);
                        queue.push_back((*s2, *t2));
                    }
                    (Some(x), Some(y)) if x == t2 && y == s2 => {}
                    _ => return false,
                }
            }
        }

        true
    }
}

impl TransitionSystem for Lts {
    type State = StateId;

    fn initial_state(&self) -> StateId {
        self.initial
    }

    fn states(&self) -> Vec<StateId> {
        (0..self.arcs.len()).map(|i| StateId::new(i as u32)).collect()
    }

    fn successors(&self, state: StateId, label: &Label) -> Vec<StateId> {
        self.outgoing(state)
            .iter()
            .filter(|(a, _)| a == label)
            .map(|(_, t)| *t)
            .collect()
    }

    fn path_from_initial(&self, state: StateId) -> Option<Vec<Label>> {
        let tree = self.spanning_tree();
        let mut path = Vec::new();
        let mut current = state;
        loop {
            match tree.get(&current)? {
                None => break,
                Some((parent, label)) => {
                    path.push(label.clone());
                    current = *parent;
                }
            }
        }
        path.reverse();
        Some(path)
    }

    fn alphabet(&self) -> BTreeSet<Label> {
        self.alphabet.clone()
    }

    fn is_deadlock(&self, state: StateId) -> bool {
        self.outgoing(state).is_empty()
    }
}

impl TransitionSystemMut for Lts {
    fn add_state(&mut self) -> StateId {
        self.arcs.push(Vec::new());
        StateId::new((self.arcs.len() - 1) as u32)
    }

    fn add_arc(&mut self, from: StateId, label: Label, to: StateId) {
        assert!(from.index() < self.arcs.len(), "No such state: {}", from);
        assert!(to.index() < self.arcs.len(), "No such state: {}", to);
        self.arcs[from.index()].push((label, to));
    }
}
