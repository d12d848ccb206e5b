//! Missing-arc analysis.
//!
//! A failed tableau is turned into a disjunction of conjunctions of arc additions: every
//! [`Repair`] in the returned [`Repairs`] is one alternative, and adding all of its
//! `(state, label)` arcs removes one combination of failures. Only failed diamonds
//! without successors produce obligations; a failed box never does.

use std::collections::BTreeSet;

use log::debug;

use crate::tableau::{NodeKind, Tableau};
use crate::types::Label;

/// Arcs that must be added together.
pub type Repair<S> = BTreeSet<(S, Label)>;

/// Alternative repairs. Empty means no arc addition can fix the tableau.
pub type Repairs<S> = BTreeSet<Repair<S>>;

/// Drop every repair that is a strict superset of another one.
pub fn minimize<S: Ord + Clone>(repairs: Repairs<S>) -> Repairs<S> {
    repairs
        .iter()
        .filter(|r| !repairs.iter().any(|q| q != *r && q.is_subset(r)))
        .cloned()
        .collect()
}

/// Compute the minimal repairs of a tableau. A successful tableau has none.
pub fn find_repairs<S: Ord + Clone>(tableau: &Tableau<S>) -> Repairs<S> {
    // Children come before parents, so one pass in id order suffices.
    let mut repairs: Vec<Repairs<S>> = Vec::with_capacity(tableau.len());

    for (_, node) in tableau.nodes() {
        let r = if node.success {
            Repairs::new()
        } else {
            match node.kind {
                NodeKind::True => Repairs::new(),
                NodeKind::False => match &node.missing {
                    Some(label) => Repairs::from([Repair::from([(node.state.clone(), label.clone())])]),
                    None => Repairs::new(),
                },
                NodeKind::Or => {
                    let all = node
                        .children
                        .iter()
                        .flat_map(|c| repairs[c.index()].iter().cloned())
                        .collect();
                    minimize(all)
                }
                NodeKind::And | NodeKind::Unfold | NodeKind::Expand => {
                    let mut acc = Repairs::from([Repair::new()]);
                    for c in &node.children {
                        if tableau.node(*c).success {
                            continue;
                        }
                        let rc = &repairs[c.index()];
                        if rc.is_empty() {
                            acc.clear();
                            break;
                        }
                        acc = acc
                            .iter()
                            .flat_map(|a| rc.iter().map(move |b| a.union(b).cloned().collect::<Repair<S>>()))
                            .collect();
                        acc = minimize(acc);
                    }
                    acc
                }
            }
        };
        repairs.push(r);
    }

    let result = repairs.swap_remove(tableau.root().index());
    debug!("find_repairs: {} alternatives", result.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::lts::Lts;
    use crate::pool::TermPool;
    use crate::tableau::TableauBuilder;
    use crate::ts::{TransitionSystem, TransitionSystemMut};
    use crate::types::StateId;

    fn l(a: &str) -> Label {
        Label::new(a)
    }

    fn repairs_of(pool: &TermPool, lts: &Lts, f: crate::reference::FormulaId) -> Repairs<StateId> {
        let t = TableauBuilder::new(pool, lts).build(lts.initial_state(), f).unwrap();
        find_repairs(&t)
    }

    #[test]
    fn test_minimize() {
        let a: Repair<u32> = Repair::from([(0, l("a"))]);
        let ab: Repair<u32> = Repair::from([(0, l("a")), (0, l("b"))]);
        let c: Repair<u32> = Repair::from([(1, l("c"))]);
        let m = minimize(Repairs::from([a.clone(), ab, c.clone()]));
        assert_eq!(m, Repairs::from([a, c]));
    }

    #[test]
    fn test_satisfied_has_no_repairs() {
        let pool = TermPool::new();
        let lts = Lts::new(["a"]);
        assert!(repairs_of(&pool, &lts, pool.mk_true()).is_empty());
        assert!(repairs_of(&pool, &lts, pool.mk_box("a", pool.mk_false())).is_empty());
    }

    #[test]
    fn test_unrepairable() {
        let pool = TermPool::new();
        let lts = Lts::new(["a"]);
        assert!(repairs_of(&pool, &lts, pool.mk_false()).is_empty());
        // One conjunct is beyond repair, so the conjunction is too.
        let f = pool.mk_and([pool.mk_diamond("a", pool.mk_true()), pool.mk_false()]);
        assert!(repairs_of(&pool, &lts, f).is_empty());
    }

    #[test]
    fn test_diamond_without_successor() {
        let pool = TermPool::new();
        let lts = Lts::new(["a"]);
        let s0 = lts.initial_state();
        let r = repairs_of(&pool, &lts, pool.mk_diamond("a", pool.mk_var("anything")));
        assert_eq!(r, Repairs::from([Repair::from([(s0, l("a"))])]));
    }

    #[test]
    fn test_combination_laws() {
        let pool = TermPool::new();
        let lts = Lts::new(["a", "b"]);
        let s0 = lts.initial_state();
        let a = pool.mk_diamond("a", pool.mk_true());
        let b = pool.mk_diamond("b", pool.mk_true());

        let both = repairs_of(&pool, &lts, pool.mk_and([a, b]));
        assert_eq!(both, Repairs::from([Repair::from([(s0, l("a")), (s0, l("b"))])]));

        let either = repairs_of(&pool, &lts, pool.mk_or([a, b]));
        assert_eq!(
            either,
            Repairs::from([Repair::from([(s0, l("a"))]), Repair::from([(s0, l("b"))])])
        );
    }

    #[test]
    fn test_satisfied_conjuncts_are_skipped() {
        let pool = TermPool::new();
        let mut lts = Lts::new(["a", "b"]);
        let s0 = lts.initial_state();
        let s1 = lts.add_state();
        lts.add_arc(s0, l("a"), s1);

        // <a><b>true && <a>true: only the arc at s1 is missing.
        let f = pool.mk_and([
            pool.mk_diamond("a", pool.mk_diamond("b", pool.mk_true())),
            pool.mk_diamond("a", pool.mk_true()),
        ]);
        let r = repairs_of(&pool, &lts, f);
        assert_eq!(r, Repairs::from([Repair::from([(s1, l("b"))])]));
    }

    #[test]
    fn test_distribution() {
        let pool = TermPool::new();
        let lts = Lts::new(["a", "b", "c"]);
        let s0 = lts.initial_state();
        let d = |x: &str| pool.mk_diamond(x, pool.mk_true());

        // (<a> || <b>) && (<a> || <c>)  =>  {a}, {b, c}; {a, c} and {a, b} are subsumed.
        let f = pool.mk_and([pool.mk_or([d("a"), d("b")]), pool.mk_or([d("a"), d("c")])]);
        let r = repairs_of(&pool, &lts, f);
        assert_eq!(
            r,
            Repairs::from([
                Repair::from([(s0, l("a"))]),
                Repair::from([(s0, l("b")), (s0, l("c"))]),
            ])
        );
    }

    #[test]
    fn test_repairs_through_fixed_points() {
        let pool = TermPool::new();
        let lts = Lts::new(["a"]);
        let s0 = lts.initial_state();
        // nu X.<a>X fails at a deadlock, repaired by an a-arc.
        let f = pool.mk_nu("X", pool.mk_diamond("a", pool.mk_var("X")));
        let r = repairs_of(&pool, &lts, f);
        assert_eq!(r, Repairs::from([Repair::from([(s0, l("a"))])]));
    }
}
