//! Bounded Petri-net over-approximation by region enumeration.
//!
//! A *region* of a transition system with labels `t1..tn` and bound `k` is a tuple
//! `(r0, pre[t], post[t])` with all values in `0..=k` that assigns every reachable state
//! `s` a token count `r(s)` in `0..=k` such that `r(initial) = r0` and every arc
//! `s -t-> s'` satisfies `r(s) >= pre[t]` and `r(s') = r(s) - pre[t] + post[t]`.
//! Every region is a place of a net whose transitions are the labels. The reachability
//! graph of the net with all regions as places is the smallest k-bounded net behaviour
//! that contains the system.
//!
//! Enumeration is exhaustive over `(k + 1)^(2n + 1)` candidates, so this oracle is meant
//! for small alphabets and bounds.

use std::collections::{BTreeMap, HashMap, VecDeque};

use log::debug;

use crate::error::OracleError;
use crate::lts::Lts;
use crate::oracle::Overapproximation;
use crate::ts::{TransitionSystem, TransitionSystemMut};
use crate::types::{Label, StateId};

/// Configuration of the [`BoundedNet`] oracle.
#[derive(Debug, Clone)]
pub struct NetProperties {
    /// Maximal number of tokens on a place.
    pub bound: u32,
    /// Fail with [`OracleError::TooManyRegions`] above this many regions.
    pub max_regions: usize,
    /// Fail with [`OracleError::TooManyStates`] above this many reachable markings.
    pub max_states: usize,
}

impl Default for NetProperties {
    fn default() -> Self {
        Self {
            bound: 1,
            max_regions: 100_000,
            max_states: 10_000,
        }
    }
}

impl NetProperties {
    pub fn with_bound(mut self, bound: u32) -> Self {
        self.bound = bound;
        self
    }
    pub fn with_max_regions(mut self, max_regions: usize) -> Self {
        self.max_regions = max_regions;
        self
    }
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }
}

/// A place of the synthesized net. `pre` and `post` are indexed like the sorted alphabet.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Region {
    pub initial: u32,
    pub pre: Vec<u32>,
    pub post: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedNet;

impl BoundedNet {
    /// All regions of `ts` under the bound of `properties`.
    pub fn regions(&self, ts: &Lts, properties: &NetProperties) -> Result<Vec<Region>, OracleError> {
        let labels: BTreeMap<Label, usize> = ts
            .alphabet()
            .into_iter()
            .enumerate()
            .map(|(i, a)| (a, i))
            .collect();

        // Arcs as label indices; labels outside the alphabet cannot become transitions.
        let mut arcs: Vec<Vec<(usize, StateId)>> = vec![Vec::new(); ts.num_states()];
        for (s, a, t) in ts.arcs() {
            let i = *labels
                .get(a)
                .ok_or_else(|| OracleError::UnknownLabel { label: a.to_string() })?;
            arcs[s.index()].push((i, t));
        }

        let n = labels.len();
        let k = properties.bound;
        let mut regions = Vec::new();

        // Odometer over (r0, pre[0], post[0], pre[1], post[1], ...).
        let mut digits = vec![0u32; 2 * n + 1];
        loop {
            let pre: Vec<u32> = (0..n).map(|i| digits[1 + 2 * i]).collect();
            let post: Vec<u32> = (0..n).map(|i| digits[2 + 2 * i]).collect();
            if is_region(&arcs, ts.initial_state(), digits[0], &pre, &post, k) {
                if regions.len() == properties.max_regions {
                    return Err(OracleError::TooManyRegions {
                        limit: properties.max_regions,
                    });
                }
                regions.push(Region {
                    initial: digits[0],
                    pre,
                    post,
                });
            }

            match digits.iter().position(|&d| d < k) {
                Some(i) => {
                    digits[i] += 1;
                    digits[..i].iter_mut().for_each(|d| *d = 0);
                }
                None => break,
            }
        }

        debug!("{} regions for {} states and {} labels", regions.len(), ts.num_states(), n);
        Ok(regions)
    }
}

fn is_region(arcs: &[Vec<(usize, StateId)>], initial: StateId, r0: u32, pre: &[u32], post: &[u32], k: u32) -> bool {
    let mut value: Vec<Option<u32>> = vec![None; arcs.len()];
    value[initial.index()] = Some(r0);
    let mut stack = vec![initial];

    while let Some(s) = stack.pop() {
        let r = match value[s.index()] {
            Some(r) => r,
            None => unreachable!("only valued states are stacked"),
        };
        for &(i, t) in &arcs[s.index()] {
            if r < pre[i] {
                return false;
            }
            let v = r - pre[i] + post[i];
            if v > k {
                return false;
            }
            match value[t.index()] {
                Some(w) if w != v => return false,
                Some(_) => {}
                None => {
                    value[t.index()] = Some(v);
                    stack.push(t);
                }
            }
        }
    }

    true
}

impl Overapproximation<Lts> for BoundedNet {
    type Properties = NetProperties;

    /// Reachability graph of the net of all regions, with states numbered breadth-first.
    ///
    /// Places have capacity `bound`: a transition that would overfill a place is disabled.
    fn overapproximate(&self, ts: &Lts, properties: &NetProperties) -> Result<Lts, OracleError> {
        let regions = self.regions(ts, properties)?;
        let labels: Vec<Label> = ts.alphabet().into_iter().collect();
        let k = properties.bound;

        let mut result = Lts::new(labels.iter().cloned());
        let initial: Vec<u32> = regions.iter().map(|r| r.initial).collect();
        let mut index: HashMap<Vec<u32>, StateId> = HashMap::new();
        index.insert(initial.clone(), result.initial_state());
        let mut queue = VecDeque::from([initial]);

        while let Some(marking) = queue.pop_front() {
            let from = index[&marking];
            for (i, label) in labels.iter().enumerate() {
                let enabled = regions
                    .iter()
                    .zip(&marking)
                    .all(|(r, &m)| m >= r.pre[i] && m - r.pre[i] + r.post[i] <= k);
                if !enabled {
                    continue;
                }
                let next: Vec<u32> = regions
                    .iter()
                    .zip(&marking)
                    .map(|(r, &m)| m - r.pre[i] + r.post[i])
                    .collect();
                let to = match index.get(&next) {
                    Some(&to) => to,
                    None => {
                        if index.len() == properties.max_states {
                            return Err(OracleError::TooManyStates {
                                limit: properties.max_states,
                            });
                        }
                        let to = result.add_state();
                        index.insert(next.clone(), to);
                        queue.push_back(next);
                        to
                    }
                };
                result.add_arc(from, label.clone(), to);
            }
        }

        debug!(
            "overapproximate: {} states, {} arcs -> {} states, {} arcs (bound {})",
            ts.num_states(),
            ts.num_arcs(),
            result.num_states(),
            result.num_arcs(),
            k
        );
        Ok(result)
    }
}
