//! The realization search.
//!
//! Starting from an initial transition system, the search repeatedly builds a tableau for
//! the formula at the initial state. A successful candidate is reported. A failed one is
//! split into one branch per [repair](crate::repair): the arcs of the repair are added
//! to a copy of the candidate (each leading to a new state), the copy is generalized by
//! an [oracle](crate::oracle::Overapproximation), and the result is checked again.
//!
//! Branches run on a [`Trampoline`], most recent first. The search terminates only when
//! every branch ends in a realization or a dead end, which requires the oracle to keep
//! the candidates finite (e.g. by a token bound). Callers that want to stop earlier use
//! [`Search::run_for`] or [`SearchConfig::max_candidates`].
//!
//! The oracle may renumber states. Each repaired state is located in its result by
//! replaying the candidate's spanning-tree path to that state, which must be
//! deterministic ([`Error::NonDeterministic`] otherwise). The tableau is not carried
//! over node by node: it is built again on the result from its initial state, which
//! yields the same verdict as remapping every node along the same paths.
//!
//! Tableau builds allocate formulas in the pool. A long-running search should call
//! [`Search::collect_garbage`] between [`Search::run_for`] batches.
//!
//! ```
//! use mucalc_rs::lts::Lts;
//! use mucalc_rs::pool::TermPool;
//! use mucalc_rs::regions::{BoundedNet, NetProperties};
//! use mucalc_rs::search::{realize, SearchConfig};
//! use mucalc_rs::walk::alphabet;
//!
//! let pool = TermPool::new();
//! let f = pool.mk_or([
//!     pool.mk_diamond("a", pool.mk_true()),
//!     pool.mk_diamond("b", pool.mk_true()),
//! ]);
//! let initial = Lts::new(alphabet(&pool, f));
//! let found = realize(&pool, &BoundedNet, &NetProperties::default(), SearchConfig::default(), f, initial).unwrap();
//! assert_eq!(found.len(), 2);
//! ```

use log::{debug, info, warn};

use crate::error::{Error, OracleError, Result};
use crate::oracle::Overapproximation;
use crate::pool::TermPool;
use crate::reference::FormulaId;
use crate::repair::find_repairs;
use crate::tableau::{Tableau, TableauBuilder};
use crate::trampoline::Trampoline;
use crate::ts::{TransitionSystem, TransitionSystemMut};
use crate::types::Label;

/// How a candidate is extended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ExpansionPolicy {
    /// Only failed tableaux are repaired; successful candidates are reported as they are.
    #[default]
    Repair,
    /// Like [`ExpansionPolicy::Repair`], but a successful candidate with a deadlock state is
    /// not reported. Instead, the first deadlock state gets one new outgoing arc per label
    /// of the alphabet, each in its own branch.
    AvoidDeadlocks,
}

#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub policy: ExpansionPolicy,
    /// Stop after this many candidates have been examined.
    pub max_candidates: Option<usize>,
}

impl SearchConfig {
    pub fn with_policy(mut self, policy: ExpansionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = Some(max_candidates);
        self
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SearchStats {
    /// Candidates examined.
    pub candidates: usize,
    /// Candidates reported as realizations.
    pub realized: usize,
    /// Failed candidates without any repair.
    pub dead_ends: usize,
    /// Branches dropped because the oracle failed.
    pub oracle_failures: usize,
}

/// A reported transition system together with its successful tableau.
#[derive(Debug, Clone)]
pub struct Realization<T: TransitionSystem> {
    pub system: T,
    pub tableau: Tableau<T::State>,
}

/// One branch of the search. Children are built from copies; a candidate is never modified.
struct Candidate<T: TransitionSystem> {
    system: T,
    tableau: Tableau<T::State>,
}

struct Context<'a, T, O, F>
where
    T: TransitionSystem,
    O: Overapproximation<T>,
{
    pool: &'a TermPool,
    oracle: &'a O,
    properties: &'a O::Properties,
    formula: FormulaId,
    config: SearchConfig,
    on_realized: F,
    stats: SearchStats,
    error: Option<Error>,
    /// Candidates waiting to be explored, one per scheduled step.
    frontier: Vec<Candidate<T>>,
}

impl<'a, T, O, F> Context<'a, T, O, F>
where
    T: TransitionSystemMut + 'a,
    O: Overapproximation<T> + 'a,
    O::Properties: 'a,
    F: FnMut(&T, &Tableau<T::State>) + 'a,
{
    fn schedule(&mut self, t: &mut Trampoline<'a, Self>, candidate: Candidate<T>) {
        self.frontier.push(candidate);
        t.push(|ctx: &mut Self, t: &mut Trampoline<'a, Self>| match ctx.frontier.pop() {
            Some(candidate) => ctx.explore(t, candidate),
            None => panic!("Search step scheduled without a candidate"),
        });
    }

    fn stop(&mut self, t: &mut Trampoline<'a, Self>) {
        t.abort();
        self.frontier.clear();
    }

    fn build(&self, system: T) -> Result<Candidate<T>> {
        let tableau = TableauBuilder::new(self.pool, &system).build(system.initial_state(), self.formula)?;
        Ok(Candidate {
            system,
            tableau,
        })
    }

    fn explore(&mut self, t: &mut Trampoline<'a, Self>, candidate: Candidate<T>) {
        if self.error.is_some() {
            return;
        }
        if let Some(max) = self.config.max_candidates {
            if self.stats.candidates >= max {
                info!("Stopping after {} candidates", max);
                self.stop(t);
                return;
            }
        }
        self.stats.candidates += 1;

        let system = &candidate.system;
        let branches: Vec<Vec<(T::State, Label)>> = if candidate.tableau.success() {
            let deadlock = match self.config.policy {
                ExpansionPolicy::Repair => None,
                ExpansionPolicy::AvoidDeadlocks => system.states().into_iter().find(|&s| system.is_deadlock(s)),
            };
            match deadlock {
                None => {
                    self.stats.realized += 1;
                    info!(
                        "Realized candidate #{} ({} realizations so far)",
                        self.stats.candidates, self.stats.realized
                    );
                    (self.on_realized)(system, &candidate.tableau);
                    return;
                }
                Some(s) => {
                    debug!("Candidate #{}: deadlock at {:?}", self.stats.candidates, s);
                    system.alphabet().into_iter().map(|a| vec![(s, a)]).collect()
                }
            }
        } else {
            let repairs = find_repairs(&candidate.tableau);
            if repairs.is_empty() {
                debug!("Candidate #{}: dead end", self.stats.candidates);
                self.stats.dead_ends += 1;
                return;
            }
            debug!("Candidate #{}: {} repairs", self.stats.candidates, repairs.len());
            repairs.into_iter().map(|r| r.into_iter().collect()).collect()
        };

        let mut children = Vec::with_capacity(branches.len());
        for arcs in &branches {
            match self.extend(system, arcs) {
                Ok(Some(child)) => children.push(child),
                Ok(None) => {}
                Err(e) => {
                    self.error = Some(e);
                    self.stop(t);
                    return;
                }
            }
        }
        for child in children {
            self.schedule(t, child);
        }
    }

    /// Add `arcs` to a copy of `system`, generalize the copy and check the result.
    ///
    /// Returns `None` if the branch is dropped because of an oracle failure.
    fn extend(&mut self, system: &T, arcs: &[(T::State, Label)]) -> Result<Option<Candidate<T>>> {
        let mut copy = system.clone();
        for (s, a) in arcs {
            let n = copy.add_state();
            copy.add_arc(*s, a.clone(), n);
        }

        let result = match self.oracle.overapproximate(&copy, self.properties) {
            Ok(result) => result,
            Err(e) => return Ok(self.oracle_failed(e)),
        };

        // Locate every repaired state in the result by its spanning-tree path.
        for (s, a) in arcs {
            let path = system
                .path_from_initial(*s)
                .ok_or_else(|| Error::MissingPath { state: format!("{:?}", s) })?;
            let target = match result.replay(&path) {
                Ok(target) => target,
                Err(e) if e.successors == 0 => {
                    return Ok(self.oracle_failed(OracleError::LostArc {
                        state: format!("{:?}", e.state),
                        label: path[e.position].to_string(),
                    }))
                }
                Err(e) => {
                    return Err(Error::NonDeterministic {
                        state: format!("{:?}", e.state),
                        label: path[e.position].to_string(),
                        successors: e.successors,
                    })
                }
            };
            if result.successors(target, a).is_empty() {
                return Ok(self.oracle_failed(OracleError::LostArc {
                    state: format!("{:?}", target),
                    label: a.to_string(),
                }));
            }
        }

        self.build(result).map(Some)
    }

    fn oracle_failed(&mut self, e: OracleError) -> Option<Candidate<T>> {
        warn!("Dropping branch: {}", e);
        self.stats.oracle_failures += 1;
        None
    }
}

/// A resumable realization search.
pub struct Search<'a, T, O, F>
where
    T: TransitionSystem,
    O: Overapproximation<T>,
{
    trampoline: Trampoline<'a, Context<'a, T, O, F>>,
    context: Context<'a, T, O, F>,
}

impl<'a, T, O, F> Search<'a, T, O, F>
where
    T: TransitionSystemMut + 'a,
    O: Overapproximation<T> + 'a,
    O::Properties: 'a,
    F: FnMut(&T, &Tableau<T::State>) + 'a,
{
    /// Prepare a search for realizations of `formula`, starting from `initial`.
    ///
    /// `formula` must be ready for the tableau builder (see [`prepare`][crate::walk::prepare]).
    /// `on_realized` is called once per realization, in no particular order.
    pub fn new(
        pool: &'a TermPool,
        oracle: &'a O,
        properties: &'a O::Properties,
        config: SearchConfig,
        formula: FormulaId,
        initial: T,
        on_realized: F,
    ) -> Result<Self> {
        let mut context = Context {
            pool,
            oracle,
            properties,
            formula,
            config,
            on_realized,
            stats: SearchStats::default(),
            error: None,
            frontier: Vec::new(),
        };
        let root = context.build(initial)?;
        let mut trampoline = Trampoline::new();
        context.schedule(&mut trampoline, root);
        Ok(Self { trampoline, context })
    }

    fn take_error(&mut self) -> Result<()> {
        match self.context.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Examine one candidate. Returns `false` once the search is exhausted.
    pub fn step(&mut self) -> Result<bool> {
        let stepped = self.trampoline.step(&mut self.context);
        self.take_error()?;
        Ok(stepped)
    }

    /// Run until the search is exhausted or stopped.
    pub fn run(&mut self) -> Result<()> {
        self.trampoline.run(&mut self.context);
        self.take_error()?;
        info!("Search finished: {:?}", self.context.stats);
        Ok(())
    }

    /// Examine at most `limit` candidates. Returns the number examined.
    pub fn run_for(&mut self, limit: usize) -> Result<usize> {
        let n = self.trampoline.run_for(&mut self.context, limit);
        self.take_error()?;
        Ok(n)
    }

    /// Number of branches waiting to be examined.
    pub fn pending(&self) -> usize {
        self.context.frontier.len()
    }

    /// Reclaim pool formulas that the search no longer needs.
    ///
    /// Every tableau build adds placeholders and unfolded fixed-point bodies to the pool.
    /// This keeps the searched formula, the tableaux of all pending candidates and
    /// everything reachable from `keep`, and drops the rest. Tableaux already passed to
    /// the callback are not tracked: pass their [`Tableau::formulas`] in `keep` while they
    /// are still in use. Returns the number of dropped formulas.
    pub fn collect_garbage(&self, keep: &[FormulaId]) -> usize {
        let mut roots = keep.to_vec();
        roots.push(self.context.formula);
        for candidate in &self.context.frontier {
            roots.extend(candidate.tableau.formulas());
        }
        self.context.pool.collect_garbage(&roots)
    }

    pub fn is_finished(&self) -> bool {
        self.trampoline.is_empty()
    }

    pub fn stats(&self) -> &SearchStats {
        &self.context.stats
    }
}

/// Run a search to the end and collect all realizations.
pub fn realize<T, O>(
    pool: &TermPool,
    oracle: &O,
    properties: &O::Properties,
    config: SearchConfig,
    formula: FormulaId,
    initial: T,
) -> Result<Vec<Realization<T>>>
where
    T: TransitionSystemMut,
    O: Overapproximation<T>,
{
    let mut found = Vec::new();
    {
        let mut search = Search::new(pool, oracle, properties, config, formula, initial, |ts: &T, tableau: &Tableau<T::State>| {
            found.push(Realization {
                system: ts.clone(),
                tableau: tableau.clone(),
            })
        })?;
        search.run()?;
    }
    Ok(found)
}
