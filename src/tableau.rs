//! Tableau construction.
//!
//! A tableau proves or refutes a closed, negation-free formula at a state of a
//! [`TransitionSystem`]. It is built by structural decomposition of the formula, one node
//! per *sequent* `(state, formula, environment)`, and every sequent is decomposed at most
//! once per [`TableauBuilder::build`] call.
//!
//! Fixed points are handled with placeholders. At `sigma X.f` the builder allocates a
//! fresh variable `P`, binds `P` to `sigma X.f` in the environment and continues with
//! `P`. Reaching `P` at state `s` unfolds it to `f[X := P]` and records `(s, P)` as
//! unfolded; reaching `P` at `s` again on the same branch stops with the default verdict
//! of the fixed point (`false` for `mu`, `true` for `nu`). Since environments only grow
//! along a branch, and only finitely many `(s, P)` can be recorded, construction
//! terminates on finite systems.
//!
//! ```
//! use mucalc_rs::lts::Lts;
//! use mucalc_rs::pool::TermPool;
//! use mucalc_rs::tableau::TableauBuilder;
//! use mucalc_rs::ts::{TransitionSystem, TransitionSystemMut};
//! use mucalc_rs::types::Label;
//!
//! let pool = TermPool::new();
//! let mut lts = Lts::new(["a"]);
//! let s0 = lts.initial_state();
//! lts.add_arc(s0, Label::new("a"), s0);
//!
//! // nu X.<a>X: an infinite a-path exists.
//! let f = pool.mk_nu("X", pool.mk_diamond("a", pool.mk_var("X")));
//! let tableau = TableauBuilder::new(&pool, &lts).build(s0, f).unwrap();
//! assert!(tableau.success());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use log::debug;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::pool::TermPool;
use crate::reference::FormulaId;
use crate::trampoline::Trampoline;
use crate::ts::TransitionSystem;
use crate::types::{Label, Modality};
use crate::walk::substitute;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableauId(u32);

impl TableauId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TableauId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeKind {
    /// Terminal success.
    True,
    /// Terminal failure.
    False,
    /// Succeeds iff all children succeed.
    And,
    /// Succeeds iff some child succeeds.
    Or,
    /// Fixed point replaced by its placeholder; one child.
    Unfold,
    /// Placeholder replaced by the body of its fixed point; one child.
    Expand,
}

#[derive(Debug, Clone)]
pub struct TableauNode<S> {
    pub kind: NodeKind,
    pub state: S,
    pub formula: FormulaId,
    pub children: Vec<TableauId>,
    pub success: bool,
    /// Set on a failed diamond whose state has no successor with this label.
    pub missing: Option<Label>,
}

/// A finished tableau. Children always have smaller ids than their parents.
#[derive(Debug, Clone)]
pub struct Tableau<S> {
    nodes: Vec<TableauNode<S>>,
    root: TableauId,
}

impl<S> Tableau<S> {
    pub fn root(&self) -> TableauId {
        self.root
    }

    pub fn node(&self, id: TableauId) -> &TableauNode<S> {
        &self.nodes[id.index()]
    }

    /// Verdict of the whole tableau.
    pub fn success(&self) -> bool {
        self.node(self.root).success
    }

    /// Number of nodes, i.e. of distinct sequents.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The formula of every node, in node order. Shared formulas repeat.
    pub fn formulas(&self) -> impl Iterator<Item = FormulaId> + '_ {
        self.nodes.iter().map(|node| node.formula)
    }

    /// All nodes in id order, children before parents.
    pub fn nodes(&self) -> impl Iterator<Item = (TableauId, &TableauNode<S>)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (TableauId(i as u32), node))
    }
}

/// Placeholder bindings and unfolding history of one proof branch.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct Env<S: Ord> {
    /// Placeholder variable to the fixed point it stands for.
    bindings: BTreeMap<FormulaId, FormulaId>,
    /// Placeholders already unfolded at a state on this branch.
    unfolded: BTreeSet<(S, FormulaId)>,
}

type Sequent<S> = (S, FormulaId, usize);

enum Expansion<S> {
    Leaf { success: bool, missing: Option<Label> },
    Need { kind: NodeKind, children: Vec<Sequent<S>> },
}

struct Build<'a, T: TransitionSystem> {
    pool: &'a TermPool,
    ts: &'a T,
    envs: Vec<Env<T::State>>,
    env_ids: HashMap<Env<T::State>, usize>,
    /// `body[X := P]` for every (fixed point, placeholder) pair unfolded so far.
    unfoldings: HashMap<(FormulaId, FormulaId), FormulaId>,
    memo: Cache<Sequent<T::State>, TableauId>,
    pending: HashMap<Sequent<T::State>, (NodeKind, Vec<Sequent<T::State>>)>,
    nodes: Vec<TableauNode<T::State>>,
    error: Option<Error>,
}

impl<'a, T> Build<'a, T>
where
    T: TransitionSystem + 'a,
{
    fn intern_env(&mut self, env: Env<T::State>) -> usize {
        if let Some(&i) = self.env_ids.get(&env) {
            return i;
        }
        let i = self.envs.len();
        self.envs.push(env.clone());
        self.env_ids.insert(env, i);
        i
    }

    fn add_node(&mut self, sequent: Sequent<T::State>, node: TableauNode<T::State>) {
        let id = TableauId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.memo.insert(sequent, id);
    }

    fn schedule(t: &mut Trampoline<'a, Self>, sequent: Sequent<T::State>) {
        t.push(move |b: &mut Self, t: &mut Trampoline<'a, Self>| b.process(t, sequent));
    }

    fn process(&mut self, t: &mut Trampoline<'a, Self>, sequent: Sequent<T::State>) {
        if self.error.is_some() || self.memo.get(&sequent).is_some() {
            return;
        }
        let (state, formula, _) = sequent;

        if let Some((kind, children)) = self.pending.remove(&sequent) {
            let children: Vec<TableauId> = children
                .iter()
                .map(|c| match self.memo.peek(c) {
                    Some(&id) => id,
                    None => panic!("Sequent finished before its children"),
                })
                .collect();
            let verdict = |id: &TableauId| self.nodes[id.index()].success;
            let success = match kind {
                NodeKind::And => children.iter().all(verdict),
                NodeKind::Or => children.iter().any(verdict),
                NodeKind::Unfold | NodeKind::Expand => verdict(&children[0]),
                NodeKind::True | NodeKind::False => unreachable!("terminal nodes have no children"),
            };
            self.add_node(
                sequent,
                TableauNode {
                    kind,
                    state,
                    formula,
                    children,
                    success,
                    missing: None,
                },
            );
            return;
        }

        match self.expand(sequent) {
            Ok(Expansion::Leaf { success, missing }) => {
                let kind = if success { NodeKind::True } else { NodeKind::False };
                self.add_node(
                    sequent,
                    TableauNode {
                        kind,
                        state,
                        formula,
                        children: Vec::new(),
                        success,
                        missing,
                    },
                );
            }
            Ok(Expansion::Need { kind, children }) => {
                Self::schedule(t, sequent);
                for &c in children.iter().rev() {
                    Self::schedule(t, c);
                }
                self.pending.insert(sequent, (kind, children));
            }
            Err(e) => {
                self.error = Some(e);
                t.abort();
            }
        }
    }

    fn expand(&mut self, (state, formula, env): Sequent<T::State>) -> Result<Expansion<T::State>> {
        let leaf = |success| Expansion::Leaf { success, missing: None };
        let each = |fs: &[FormulaId]| -> Vec<Sequent<T::State>> { fs.iter().map(|&g| (state, g, env)).collect() };

        Ok(match self.pool.node(formula) {
            Formula::True => leaf(true),
            Formula::False => leaf(false),
            Formula::And(fs) => Expansion::Need {
                kind: NodeKind::And,
                children: each(&fs),
            },
            Formula::Or(fs) => Expansion::Need {
                kind: NodeKind::Or,
                children: each(&fs),
            },
            Formula::Modal(modality, label, g) => {
                let successors = self.ts.successors(state, &label);
                match (modality, successors.is_empty()) {
                    (Modality::Exists, true) => Expansion::Leaf {
                        success: false,
                        missing: Some(label),
                    },
                    (Modality::Forall, true) => leaf(true),
                    (Modality::Exists, false) => Expansion::Need {
                        kind: NodeKind::Or,
                        children: successors.into_iter().map(|s| (s, g, env)).collect(),
                    },
                    (Modality::Forall, false) => Expansion::Need {
                        kind: NodeKind::And,
                        children: successors.into_iter().map(|s| (s, g, env)).collect(),
                    },
                }
            }
            Formula::Fix(_, v, _) => {
                let placeholder = self.pool.fresh_variable(v.as_str());
                let mut extended = self.envs[env].clone();
                extended.bindings.insert(placeholder, formula);
                let extended = self.intern_env(extended);
                Expansion::Need {
                    kind: NodeKind::Unfold,
                    children: vec![(state, placeholder, extended)],
                }
            }
            Formula::Var(v) => {
                let fix = match self.envs[env].bindings.get(&formula) {
                    Some(&fix) => fix,
                    None => return Err(Error::FreeVariable { name: v.to_string() }),
                };
                let (polarity, x, body) = match self.pool.node(fix) {
                    Formula::Fix(polarity, x, body) => (polarity, x, body),
                    other => unreachable!("placeholder bound to a {}", other.kind()),
                };
                if self.envs[env].unfolded.contains(&(state, formula)) {
                    leaf(polarity.regress_value())
                } else {
                    let pool = self.pool;
                    let unfolded = *self
                        .unfoldings
                        .entry((fix, formula))
                        .or_insert_with(|| substitute(pool, body, &x, formula));
                    let mut extended = self.envs[env].clone();
                    extended.unfolded.insert((state, formula));
                    let extended = self.intern_env(extended);
                    Expansion::Need {
                        kind: NodeKind::Expand,
                        children: vec![(state, unfolded, extended)],
                    }
                }
            }
            node @ (Formula::Not(_) | Formula::Let(..) | Formula::Call(..)) => {
                return Err(Error::UnexpectedNode {
                    kind: node.kind(),
                    formula,
                })
            }
        })
    }
}

/// Builds tableaux for one transition system.
pub struct TableauBuilder<'a, T> {
    pool: &'a TermPool,
    ts: &'a T,
}

impl<'a, T> TableauBuilder<'a, T>
where
    T: TransitionSystem + 'a,
{
    pub fn new(pool: &'a TermPool, ts: &'a T) -> Self {
        Self { pool, ts }
    }

    /// Prove or refute `formula` at `state`.
    ///
    /// The formula must be closed and free of negations, lets and calls (see
    /// [`prepare`][crate::walk::prepare]); otherwise construction stops with
    /// [`Error::FreeVariable`] or [`Error::UnexpectedNode`].
    pub fn build(&self, state: T::State, formula: FormulaId) -> Result<Tableau<T::State>> {
        let mut b = Build {
            pool: self.pool,
            ts: self.ts,
            envs: Vec::new(),
            env_ids: HashMap::new(),
            unfoldings: HashMap::new(),
            memo: Cache::default(),
            pending: HashMap::new(),
            nodes: Vec::new(),
            error: None,
        };
        let empty = b.intern_env(Env {
            bindings: BTreeMap::new(),
            unfolded: BTreeSet::new(),
        });
        let root = (state, formula, empty);

        let mut trampoline = Trampoline::new();
        Build::schedule(&mut trampoline, root);
        trampoline.run(&mut b);

        if let Some(e) = b.error {
            debug!("build({:?}, {}) failed: {}", state, formula, e);
            return Err(e);
        }
        let root = match b.memo.peek(&root) {
            Some(&id) => id,
            None => panic!("Tableau construction finished without a root"),
        };
        let tableau = Tableau { nodes: b.nodes, root };
        debug!(
            "build({:?}, {}) = {} with {} nodes, {} environments, {} steps",
            state,
            formula,
            tableau.success(),
            tableau.len(),
            b.envs.len(),
            trampoline.executed()
        );
        Ok(tableau)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::lts::Lts;
    use crate::ts::TransitionSystemMut;
    use crate::types::StateId;

    fn l(a: &str) -> Label {
        Label::new(a)
    }

    /// s0 -a-> s1 -a-> s2, s2 -b-> s2
    fn chain() -> Lts {
        let mut lts = Lts::new(["a", "b"]);
        let s0 = lts.initial_state();
        let s1 = lts.add_state();
        let s2 = lts.add_state();
        lts.add_arc(s0, l("a"), s1);
        lts.add_arc(s1, l("a"), s2);
        lts.add_arc(s2, l("b"), s2);
        lts
    }

    fn check(pool: &TermPool, lts: &Lts, state: StateId, f: FormulaId) -> bool {
        TableauBuilder::new(pool, lts).build(state, f).unwrap().success()
    }

    #[test]
    fn test_constants() {
        let pool = TermPool::new();
        let lts = chain();
        for s in lts.states() {
            assert!(check(&pool, &lts, s, pool.mk_true()));
            assert!(!check(&pool, &lts, s, pool.mk_false()));
        }
    }

    #[test]
    fn test_and_or_laws() {
        let pool = TermPool::new();
        let lts = chain();
        let s0 = lts.initial_state();
        let atoms = [
            pool.mk_true(),
            pool.mk_false(),
            pool.mk_diamond("a", pool.mk_true()),
            pool.mk_diamond("b", pool.mk_true()),
        ];
        for &x in &atoms {
            for &y in &atoms {
                let (vx, vy) = (check(&pool, &lts, s0, x), check(&pool, &lts, s0, y));
                assert_eq!(check(&pool, &lts, s0, pool.mk_and([x, y])), vx && vy);
                assert_eq!(check(&pool, &lts, s0, pool.mk_or([x, y])), vx || vy);
            }
        }
    }

    #[test]
    fn test_modalities_without_successors() {
        let pool = TermPool::new();
        let lts = chain();
        let s0 = lts.initial_state();
        let builder = TableauBuilder::new(&pool, &lts);

        // [b]false holds vacuously.
        let t = builder.build(s0, pool.mk_box("b", pool.mk_false())).unwrap();
        assert!(t.success());
        assert_eq!(t.node(t.root()).kind, NodeKind::True);
        assert_eq!(t.node(t.root()).missing, None);

        // <b>true fails and names the missing arc.
        let t = builder.build(s0, pool.mk_diamond("b", pool.mk_true())).unwrap();
        assert!(!t.success());
        let root = t.node(t.root());
        assert_eq!(root.kind, NodeKind::False);
        assert_eq!(root.state, s0);
        assert_eq!(root.missing, Some(l("b")));
    }

    #[test]
    fn test_modalities_with_successors() {
        let pool = TermPool::new();
        let lts = chain();
        let s0 = lts.initial_state();
        // <a><a><b>true
        let f = pool.mk_diamond("a", pool.mk_diamond("a", pool.mk_diamond("b", pool.mk_true())));
        assert!(check(&pool, &lts, s0, f));
        // [a][a][b]false
        let g = pool.mk_box("a", pool.mk_box("a", pool.mk_box("b", pool.mk_false())));
        assert!(!check(&pool, &lts, s0, g));
    }

    #[test]
    fn test_trivial_fixed_points() {
        let pool = TermPool::new();
        let lts = chain();
        let nu = pool.mk_nu("X", pool.mk_var("X"));
        let mu = pool.mk_mu("X", pool.mk_var("X"));
        for s in lts.states() {
            let t = TableauBuilder::new(&pool, &lts).build(s, nu).unwrap();
            assert!(t.success());
            assert_eq!(t.node(t.root()).kind, NodeKind::Unfold);
            assert!(!check(&pool, &lts, s, mu));
        }
    }

    #[test]
    fn test_reachability_and_invariance() {
        let pool = TermPool::new();
        let lts = chain();
        let s0 = lts.initial_state();
        let x = pool.mk_var("X");

        // mu X.(<b>true || <a>X): a b-arc is reachable through a-arcs.
        let reach_b = pool.mk_mu("X", pool.mk_or([pool.mk_diamond("b", pool.mk_true()), pool.mk_diamond("a", x)]));
        assert!(check(&pool, &lts, s0, reach_b));

        // mu X.<a>X: there is no infinite a-path, and mu refuses the regress.
        let inf_a = pool.mk_mu("X", pool.mk_diamond("a", x));
        assert!(!check(&pool, &lts, s0, inf_a));

        // nu X.(<b>true || <a>X) accepts the same as the mu version here.
        let nu_b = pool.mk_nu("X", pool.mk_or([pool.mk_diamond("b", pool.mk_true()), pool.mk_diamond("a", x)]));
        assert!(check(&pool, &lts, s0, nu_b));

        // nu X.<b>X holds at the b-loop only.
        let loop_b = pool.mk_nu("X", pool.mk_diamond("b", x));
        assert!(check(&pool, &lts, StateId::new(2), loop_b));
        assert!(!check(&pool, &lts, s0, loop_b));
    }

    #[test]
    fn test_nested_fixed_points() {
        let pool = TermPool::new();
        let lts = chain();
        let s0 = lts.initial_state();
        // nu X.mu Y.(([b]X && <b>true) || <a>Y): eventually b, and infinitely often b.
        let (x, y) = (pool.mk_var("X"), pool.mk_var("Y"));
        let f = pool.mk_nu(
            "X",
            pool.mk_mu(
                "Y",
                pool.mk_or([
                    pool.mk_and([pool.mk_box("b", x), pool.mk_diamond("b", pool.mk_true())]),
                    pool.mk_diamond("a", y),
                ]),
            ),
        );
        assert!(check(&pool, &lts, s0, f));
    }

    #[test]
    fn test_identical_sequents_are_shared() {
        let pool = TermPool::new();
        let lts = chain();
        let a = pool.mk_diamond("a", pool.mk_true());
        let f = pool.intern(Formula::And(vec![a, a].into()));
        let t = TableauBuilder::new(&pool, &lts).build(lts.initial_state(), f).unwrap();
        let root = t.node(t.root());
        assert_eq!(root.children[0], root.children[1]);
        // And, <a>true, and true at s1.
        assert_eq!(t.len(), 3);
        for (id, node) in t.nodes() {
            for &c in &node.children {
                assert!(c < id);
            }
        }
    }

    #[test]
    fn test_usage_defects() {
        let pool = TermPool::new();
        let lts = chain();
        let s0 = lts.initial_state();
        let builder = TableauBuilder::new(&pool, &lts);

        let r = builder.build(s0, pool.mk_diamond("a", pool.mk_var("Z")));
        assert!(matches!(r, Err(Error::FreeVariable { .. })));

        let r = builder.build(s0, pool.mk_nu("X", pool.mk_not(pool.mk_var("X"))));
        assert!(matches!(r, Err(Error::UnexpectedNode { kind: "negation", .. })));

        let r = builder.build(s0, pool.mk_call("f", []));
        assert!(matches!(r, Err(Error::UnexpectedNode { kind: "call", .. })));

        let y = pool.mk_var("Y");
        let let_y = pool.mk_let("Y", pool.mk_true(), y);
        let r = builder.build(s0, pool.mk_box("a", let_y));
        assert!(matches!(r, Err(Error::UnexpectedNode { kind: "let", formula }) if formula == let_y));
    }

    /// A single state with an a-loop.
    fn a_loop() -> Lts {
        let mut lts = Lts::new(["a"]);
        let s0 = lts.initial_state();
        lts.add_arc(s0, l("a"), s0);
        lts
    }

    #[test]
    fn test_deep_formula() {
        let pool = TermPool::new();
        let lts = a_loop();
        let s0 = lts.initial_state();
        let builder = TableauBuilder::new(&pool, &lts);

        let mut f = pool.mk_true();
        for _ in 0..100_000 {
            f = pool.mk_box("a", f);
        }
        let t = builder.build(s0, f).unwrap();
        assert!(t.success());
        assert_eq!(t.len(), 100_001);

        // The defect sits at the bottom of a deep formula.
        let not_true = pool.mk_not(pool.mk_true());
        let mut g = not_true;
        for _ in 0..200_000 {
            g = pool.mk_diamond("a", g);
        }
        let r = builder.build(s0, g);
        assert!(matches!(r, Err(Error::UnexpectedNode { kind: "negation", formula }) if formula == not_true));

        let r = builder.build(s0, pool.mk_not(g));
        assert!(matches!(r, Err(Error::UnexpectedNode { kind: "negation", .. })));
    }

    #[test]
    fn test_shared_formula() {
        let pool = TermPool::new();
        let lts = a_loop();
        let s0 = lts.initial_state();
        let builder = TableauBuilder::new(&pool, &lts);

        // f(i+1) = <a>f(i) && [a]f(i): exponential as a tree, linear as a DAG.
        let mut f = pool.mk_diamond("a", pool.mk_true());
        for _ in 0..64 {
            f = pool.mk_and([pool.mk_diamond("a", f), pool.mk_box("a", f)]);
        }
        let t = builder.build(s0, f).unwrap();
        assert!(t.success());
        // <a>true and true, then the conjunction and both modalities per level.
        assert_eq!(t.len(), 2 + 64 * 3);

        let call = pool.mk_call("g", [f]);
        let r = builder.build(s0, call);
        assert!(matches!(r, Err(Error::UnexpectedNode { kind: "call", formula }) if formula == call));
    }
}
