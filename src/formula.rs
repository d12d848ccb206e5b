//! Formula node kinds.
//!
//! A [`Formula`] is one layer of syntax whose children are [`FormulaId`] handles into a
//! [`TermPool`][crate::pool::TermPool]. Because children are handles and not boxes, the
//! whole graph is a hash-consed DAG: equal subterms are stored once.
//!
//! Fixed points do not point back to themselves. The cycle introduced by a fixed point
//! only ever exists in the binding environment of a tableau.

use crate::reference::FormulaId;
use crate::types::{Label, Modality, Name, Polarity};
use crate::utils::{pairing2, pairing3, pairing_many, MyHash};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Formula {
    True,
    False,
    And(Box<[FormulaId]>),
    Or(Box<[FormulaId]>),
    Not(FormulaId),
    Var(Name),
    Modal(Modality, Label, FormulaId),
    Fix(Polarity, Name, FormulaId),
    /// `let var = expansion in body`; eliminated before model checking.
    Let(Name, FormulaId, FormulaId),
    /// Call of a named function; eliminated before model checking.
    Call(Name, Box<[FormulaId]>),
}

impl Default for Formula {
    fn default() -> Self {
        Formula::False
    }
}

impl Formula {
    /// Short human-readable name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Formula::True => "true",
            Formula::False => "false",
            Formula::And(_) => "conjunction",
            Formula::Or(_) => "disjunction",
            Formula::Not(_) => "negation",
            Formula::Var(_) => "variable",
            Formula::Modal(Modality::Exists, _, _) => "diamond",
            Formula::Modal(Modality::Forall, _, _) => "box",
            Formula::Fix(Polarity::Least, _, _) => "least fixed point",
            Formula::Fix(Polarity::Greatest, _, _) => "greatest fixed point",
            Formula::Let(..) => "let",
            Formula::Call(..) => "call",
        }
    }

    /// Direct children, in syntactic order.
    pub fn children(&self) -> Vec<FormulaId> {
        match self {
            Formula::True | Formula::False | Formula::Var(_) => Vec::new(),
            Formula::And(fs) | Formula::Or(fs) | Formula::Call(_, fs) => fs.to_vec(),
            Formula::Not(f) | Formula::Modal(_, _, f) | Formula::Fix(_, _, f) => vec![*f],
            Formula::Let(_, e, b) => vec![*e, *b],
        }
    }

    /// Rebuild this node with every child replaced by `f(child)`.
    pub fn fmap<F>(&self, mut f: F) -> Formula
    where
        F: FnMut(FormulaId) -> FormulaId,
    {
        match self {
            Formula::True => Formula::True,
            Formula::False => Formula::False,
            Formula::And(fs) => Formula::And(fs.iter().map(|&x| f(x)).collect()),
            Formula::Or(fs) => Formula::Or(fs.iter().map(|&x| f(x)).collect()),
            Formula::Not(x) => Formula::Not(f(*x)),
            Formula::Var(v) => Formula::Var(v.clone()),
            Formula::Modal(m, a, x) => Formula::Modal(*m, a.clone(), f(*x)),
            Formula::Fix(p, v, x) => Formula::Fix(*p, v.clone(), f(*x)),
            Formula::Let(v, e, b) => {
                let e = f(*e);
                Formula::Let(v.clone(), e, f(*b))
            }
            Formula::Call(g, args) => Formula::Call(g.clone(), args.iter().map(|&x| f(x)).collect()),
        }
    }

    /// Rebuild this node with the given children, in the order returned by [`Formula::children`].
    pub fn with_children(&self, children: &[FormulaId]) -> Formula {
        let arity = match self {
            Formula::True | Formula::False | Formula::Var(_) => 0,
            Formula::And(fs) | Formula::Or(fs) | Formula::Call(_, fs) => fs.len(),
            Formula::Not(_) | Formula::Modal(..) | Formula::Fix(..) => 1,
            Formula::Let(..) => 2,
        };
        assert_eq!(arity, children.len(), "wrong number of children");
        let mut i = 0;
        self.fmap(|_| {
            i += 1;
            children[i - 1]
        })
    }
}

fn hash_ids(tag: u64, ids: &[FormulaId]) -> u64 {
    pairing_many(tag, ids.iter().map(|id| id.raw() as u64))
}

impl MyHash for Formula {
    fn hash(&self) -> u64 {
        match self {
            Formula::True => 1,
            Formula::False => 2,
            Formula::And(fs) => hash_ids(3, fs),
            Formula::Or(fs) => hash_ids(4, fs),
            Formula::Not(f) => pairing2(5, f.raw() as u64),
            Formula::Var(v) => pairing2(6, v.my_hash()),
            Formula::Modal(m, a, f) => pairing3(7 + *m as u64, a.my_hash(), f.raw() as u64),
            Formula::Fix(p, v, f) => pairing3(9 + *p as u64, v.my_hash(), f.raw() as u64),
            Formula::Let(v, e, b) => pairing3(pairing2(11, v.my_hash()), e.raw() as u64, b.raw() as u64),
            Formula::Call(g, args) => hash_ids(pairing2(12, g.my_hash()), args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: u32) -> FormulaId {
        FormulaId::new(i)
    }

    #[test]
    fn test_children_and_with_children() {
        let f = Formula::Let(Name::new("X"), id(3), id(4));
        assert_eq!(f.children(), vec![id(3), id(4)]);
        let g = f.with_children(&[id(5), id(6)]);
        assert_eq!(g, Formula::Let(Name::new("X"), id(5), id(6)));

        let h = Formula::And(vec![id(3), id(4), id(5)].into());
        assert_eq!(h.with_children(&h.children()), h);
        assert!(Formula::Var(Name::new("X")).children().is_empty());
    }

    #[test]
    #[should_panic(expected = "wrong number of children")]
    fn test_with_children_arity() {
        Formula::Not(id(3)).with_children(&[id(3), id(4)]);
    }

    #[test]
    fn test_fmap() {
        let f = Formula::Modal(Modality::Exists, Label::new("a"), id(3));
        let g = f.fmap(|x| FormulaId::new(x.raw() + 1));
        assert_eq!(g, Formula::Modal(Modality::Exists, Label::new("a"), id(4)));
    }

    #[test]
    fn test_hash_distinguishes_kinds() {
        let a = Formula::And(vec![id(3), id(4)].into());
        let o = Formula::Or(vec![id(3), id(4)].into());
        assert_ne!(MyHash::hash(&a), MyHash::hash(&o));
        let d = Formula::Modal(Modality::Exists, Label::new("a"), id(3));
        let b = Formula::Modal(Modality::Forall, Label::new("a"), id(3));
        assert_ne!(MyHash::hash(&d), MyHash::hash(&b));
        assert_eq!(MyHash::hash(&d), MyHash::hash(&d.clone()));
    }

    #[test]
    fn test_kind() {
        let mu = Formula::Fix(Polarity::Least, Name::new("X"), id(3));
        assert_eq!(mu.kind(), "least fixed point");
        assert_eq!(Formula::Call(Name::new("f"), Vec::new().into_boxed_slice()).kind(), "call");
    }
}
