//! The term pool: hash-consed storage for formulas.
//!
//! All formulas are created through a [`TermPool`], which guarantees that structurally
//! equal formulas get the same [`FormulaId`]. Comparing formulas is therefore a
//! comparison of two integers, and memo tables keyed by `FormulaId` are sound.
//!
//! # Quick Start
//!
//! ```
//! use mucalc_rs::pool::TermPool;
//!
//! let pool = TermPool::new();
//!
//! // nu X. <a>X
//! let x = pool.mk_var("X");
//! let f = pool.mk_nu("X", pool.mk_diamond("a", x));
//!
//! // Building the same formula again yields the same handle.
//! let g = pool.mk_nu("X", pool.mk_diamond("a", pool.mk_var("X")));
//! assert_eq!(f, g);
//! assert_eq!(pool.display(f).to_string(), "nu X.<a>X");
//! ```
//!
//! # Reclaiming Formulas
//!
//! The pool never frees anything on its own. [`TermPool::collect_garbage`] takes the set
//! of formulas the caller still holds, keeps everything reachable from them and reuses the
//! remaining cells. Handles to reachable formulas stay valid; handles to anything else
//! must not be used afterwards.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use log::debug;
use num_bigint::BigUint;

use crate::formula::Formula;
use crate::reference::FormulaId;
use crate::table::Table;
use crate::types::{Label, Modality, Name, Polarity};

/// Configuration for a [`TermPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Initial capacity of the node storage is `2^storage_bits`.
    pub storage_bits: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { storage_bits: 12 }
    }
}

impl PoolConfig {
    pub fn with_storage_bits(mut self, storage_bits: usize) -> Self {
        self.storage_bits = storage_bits;
        self
    }
}

pub struct TermPool {
    storage: RefCell<Table<Formula>>,
    /// Counter behind [`TermPool::fresh_variable`]. Owned by the pool, so independent
    /// pools never influence each other's fresh names.
    fresh: Cell<u64>,
}

impl TermPool {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let mut storage = Table::new(config.storage_bits);

        // Allocate the constants:
        let t = storage.put(Formula::True);
        assert_eq!(t, FormulaId::TRUE.index());
        let f = storage.put(Formula::False);
        assert_eq!(f, FormulaId::FALSE.index());

        Self {
            storage: RefCell::new(storage),
            fresh: Cell::new(0),
        }
    }
}

impl Default for TermPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TermPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("TermPool")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .field("real_size", &storage.real_size())
            .field("fresh", &self.fresh.get())
            .finish()
    }
}

impl TermPool {
    /// Return the unique formula with the given shape, creating it if necessary.
    ///
    /// All children of `node` must be live formulas of this pool.
    pub fn intern(&self, node: Formula) -> FormulaId {
        {
            let storage = self.storage.borrow();
            for child in node.children() {
                assert!(
                    storage.is_occupied(child.index()),
                    "Child {} of {} is not a live formula",
                    child,
                    node.kind()
                );
            }
        }
        let i = self.storage.borrow_mut().put(node);
        FormulaId::new(i as u32)
    }

    /// Look up a formula without creating it.
    pub fn find(&self, node: &Formula) -> Option<FormulaId> {
        self.storage
            .borrow()
            .find(node)
            .map(|i| FormulaId::new(i as u32))
    }

    /// Access the node behind a handle.
    pub fn node(&self, id: FormulaId) -> Formula {
        self.storage.borrow().value(id.index()).clone()
    }

    /// Check whether the handle refers to a live formula.
    pub fn is_live(&self, id: FormulaId) -> bool {
        id.index() != 0 && self.storage.borrow().is_occupied(id.index())
    }

    pub fn is_true(&self, id: FormulaId) -> bool {
        id == FormulaId::TRUE
    }
    pub fn is_false(&self, id: FormulaId) -> bool {
        id == FormulaId::FALSE
    }

    /// Number of live formulas, including the two constants.
    pub fn size(&self) -> usize {
        self.storage.borrow().real_size()
    }
}

// Constructors
impl TermPool {
    pub fn mk_true(&self) -> FormulaId {
        FormulaId::TRUE
    }

    pub fn mk_false(&self) -> FormulaId {
        FormulaId::FALSE
    }

    pub fn mk_bool(&self, value: bool) -> FormulaId {
        if value {
            FormulaId::TRUE
        } else {
            FormulaId::FALSE
        }
    }

    /// Conjunction of the given formulas. Empty is `true`, a single formula is itself.
    pub fn mk_and(&self, fs: impl IntoIterator<Item = FormulaId>) -> FormulaId {
        let fs: Vec<FormulaId> = fs.into_iter().collect();
        match fs.len() {
            0 => FormulaId::TRUE,
            1 => fs[0],
            _ => self.intern(Formula::And(fs.into())),
        }
    }

    /// Disjunction of the given formulas. Empty is `false`, a single formula is itself.
    pub fn mk_or(&self, fs: impl IntoIterator<Item = FormulaId>) -> FormulaId {
        let fs: Vec<FormulaId> = fs.into_iter().collect();
        match fs.len() {
            0 => FormulaId::FALSE,
            1 => fs[0],
            _ => self.intern(Formula::Or(fs.into())),
        }
    }

    pub fn mk_not(&self, f: FormulaId) -> FormulaId {
        self.intern(Formula::Not(f))
    }

    pub fn mk_var(&self, name: impl Into<Name>) -> FormulaId {
        self.intern(Formula::Var(name.into()))
    }

    pub fn mk_modal(&self, modality: Modality, label: impl Into<Label>, f: FormulaId) -> FormulaId {
        self.intern(Formula::Modal(modality, label.into(), f))
    }

    /// `<label>f`
    pub fn mk_diamond(&self, label: impl Into<Label>, f: FormulaId) -> FormulaId {
        self.mk_modal(Modality::Exists, label, f)
    }

    /// `[label]f`
    pub fn mk_box(&self, label: impl Into<Label>, f: FormulaId) -> FormulaId {
        self.mk_modal(Modality::Forall, label, f)
    }

    pub fn mk_fix(&self, polarity: Polarity, var: impl Into<Name>, body: FormulaId) -> FormulaId {
        self.intern(Formula::Fix(polarity, var.into(), body))
    }

    pub fn mk_mu(&self, var: impl Into<Name>, body: FormulaId) -> FormulaId {
        self.mk_fix(Polarity::Least, var, body)
    }

    pub fn mk_nu(&self, var: impl Into<Name>, body: FormulaId) -> FormulaId {
        self.mk_fix(Polarity::Greatest, var, body)
    }

    pub fn mk_let(&self, var: impl Into<Name>, expansion: FormulaId, body: FormulaId) -> FormulaId {
        self.intern(Formula::Let(var.into(), expansion, body))
    }

    pub fn mk_call(&self, function: impl Into<Name>, args: impl IntoIterator<Item = FormulaId>) -> FormulaId {
        let args: Vec<FormulaId> = args.into_iter().collect();
        self.intern(Formula::Call(function.into(), args.into()))
    }

    /// Create a variable distinct from every variable this pool has issued or interned.
    ///
    /// The name has the form `{prefix7}`; braces cannot appear in parsed identifiers.
    pub fn fresh_variable(&self, prefix: &str) -> FormulaId {
        loop {
            let n = self.fresh.get() + 1;
            self.fresh.set(n);
            let node = Formula::Var(Name::new(format!("{{{}{}}}", prefix, n)));
            if self.find(&node).is_none() {
                debug!("fresh_variable(prefix = {}) -> {{{}{}}}", prefix, prefix, n);
                return self.intern(node);
            }
        }
    }

    /// Name of a variable formula, or `None` for other kinds.
    pub fn var_name(&self, id: FormulaId) -> Option<Name> {
        match self.node(id) {
            Formula::Var(v) => Some(v),
            _ => None,
        }
    }
}

// Size and garbage collection
impl TermPool {
    /// All formulas reachable from `roots`, the roots included.
    pub fn descendants(&self, roots: impl IntoIterator<Item = FormulaId>) -> HashSet<FormulaId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(roots);

        while let Some(f) = queue.pop_front() {
            if visited.insert(f) {
                queue.extend(self.node(f).children());
            }
        }

        visited
    }

    /// Number of distinct formulas reachable from `f`.
    pub fn dag_size(&self, f: FormulaId) -> usize {
        self.descendants([f]).len()
    }

    /// Number of nodes of `f` as a syntax tree, i.e. with all sharing undone.
    ///
    /// This can be exponential in [`TermPool::dag_size`].
    pub fn tree_size(&self, f: FormulaId) -> BigUint {
        let mut sizes: HashMap<FormulaId, BigUint> = HashMap::new();
        let mut stack = vec![(f, false)];

        while let Some((g, expanded)) = stack.pop() {
            if sizes.contains_key(&g) {
                continue;
            }
            let children = self.node(g).children();
            if expanded {
                let size = children
                    .iter()
                    .fold(BigUint::from(1u32), |acc, c| acc + &sizes[c]);
                sizes.insert(g, size);
            } else {
                stack.push((g, true));
                stack.extend(children.into_iter().map(|c| (c, false)));
            }
        }

        sizes.remove(&f).unwrap_or_default()
    }

    /// Drop every formula that is not reachable from `roots`.
    ///
    /// The constants are always kept. Returns the number of dropped formulas.
    pub fn collect_garbage(&self, roots: &[FormulaId]) -> usize {
        debug!("Collecting garbage...");

        let mut alive = self.descendants(roots.iter().copied());
        alive.insert(FormulaId::TRUE);
        alive.insert(FormulaId::FALSE);
        debug!("Alive formulas: {}", alive.len());

        let dropped = self
            .storage
            .borrow_mut()
            .sweep(|i, _| alive.contains(&FormulaId::new(i as u32)));
        debug!("Dropped {} formulas", dropped);
        dropped
    }
}

// Printing
impl TermPool {
    /// Plain textual rendering of a formula, cut off after [`DISPLAY_LIMIT`] nodes.
    pub fn display(&self, f: FormulaId) -> FormulaDisplay<'_> {
        self.display_with_limit(f, DISPLAY_LIMIT)
    }

    /// Rendering of a formula that writes at most `limit` nodes and then `…`.
    ///
    /// The text of a shared formula repeats every shared subformula, so its length can be
    /// exponential in [`TermPool::dag_size`].
    pub fn display_with_limit(&self, f: FormulaId, limit: usize) -> FormulaDisplay<'_> {
        FormulaDisplay {
            pool: self,
            root: f,
            limit,
        }
    }

    fn write_formula(&self, out: &mut fmt::Formatter<'_>, root: FormulaId, limit: usize) -> fmt::Result {
        enum Piece {
            Formula(FormulaId),
            Text(&'static str),
        }

        fn push_list(stack: &mut Vec<Piece>, fs: &[FormulaId], sep: &'static str, close: &'static str) {
            stack.push(Piece::Text(close));
            for (i, &g) in fs.iter().enumerate().rev() {
                stack.push(Piece::Formula(g));
                if i > 0 {
                    stack.push(Piece::Text(sep));
                }
            }
        }

        let mut stack = vec![Piece::Formula(root)];
        let mut written = 0;

        while let Some(piece) = stack.pop() {
            let f = match piece {
                Piece::Text(text) => {
                    out.write_str(text)?;
                    continue;
                }
                Piece::Formula(f) => f,
            };
            if written == limit {
                return out.write_str("…");
            }
            written += 1;

            match self.node(f) {
                Formula::True => out.write_str("true")?,
                Formula::False => out.write_str("false")?,
                Formula::And(fs) => {
                    out.write_str("(")?;
                    push_list(&mut stack, &fs, " && ", ")");
                }
                Formula::Or(fs) => {
                    out.write_str("(")?;
                    push_list(&mut stack, &fs, " || ", ")");
                }
                Formula::Not(g) => {
                    out.write_str("!")?;
                    stack.push(Piece::Formula(g));
                }
                Formula::Var(v) => write!(out, "{}", v)?,
                Formula::Modal(Modality::Exists, a, g) => {
                    write!(out, "<{}>", a)?;
                    stack.push(Piece::Formula(g));
                }
                Formula::Modal(Modality::Forall, a, g) => {
                    write!(out, "[{}]", a)?;
                    stack.push(Piece::Formula(g));
                }
                Formula::Fix(p, v, g) => {
                    write!(out, "{} {}.", p, v)?;
                    stack.push(Piece::Formula(g));
                }
                Formula::Let(v, e, b) => {
                    write!(out, "let {} = ", v)?;
                    stack.push(Piece::Formula(b));
                    stack.push(Piece::Text(" in "));
                    stack.push(Piece::Formula(e));
                }
                Formula::Call(g, args) => {
                    write!(out, "{}(", g)?;
                    push_list(&mut stack, &args, ", ", ")");
                }
            }
        }

        Ok(())
    }
}

/// Default number of nodes written by [`TermPool::display`].
pub const DISPLAY_LIMIT: usize = 1000;

pub struct FormulaDisplay<'a> {
    pool: &'a TermPool,
    root: FormulaId,
    limit: usize,
}

impl fmt::Display for FormulaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pool.write_formula(f, self.root, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_constants() {
        let pool = TermPool::new();
        assert!(pool.is_true(pool.mk_true()));
        assert!(pool.is_false(pool.mk_false()));
        assert_eq!(pool.intern(Formula::True), FormulaId::TRUE);
        assert_eq!(pool.intern(Formula::False), FormulaId::FALSE);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_interning_is_identity() {
        let pool = TermPool::new();
        let a1 = pool.mk_diamond("a", pool.mk_true());
        let a2 = pool.mk_diamond("a", pool.mk_true());
        assert_eq!(a1, a2);

        let b = pool.mk_box("a", pool.mk_true());
        assert_ne!(a1, b);

        let c1 = pool.mk_and([a1, b]);
        let c2 = pool.intern(Formula::And(vec![a2, b].into()));
        assert_eq!(c1, c2);

        // Order matters: structural equality is syntactic.
        assert_ne!(pool.mk_and([b, a1]), c1);
        assert_eq!(pool.size(), 6);
    }

    #[test]
    fn test_smart_constructors() {
        let pool = TermPool::new();
        let x = pool.mk_var("X");
        assert_eq!(pool.mk_and([]), FormulaId::TRUE);
        assert_eq!(pool.mk_or([]), FormulaId::FALSE);
        assert_eq!(pool.mk_and([x]), x);
        assert_eq!(pool.mk_or([x]), x);
        assert_eq!(pool.mk_bool(true), FormulaId::TRUE);
        assert_eq!(pool.var_name(x), Some(Name::new("X")));
        assert_eq!(pool.var_name(FormulaId::TRUE), None);
    }

    #[test]
    fn test_fresh_variables_are_distinct() {
        let pool = TermPool::new();
        // Occupy the name the counter would produce first.
        let taken = pool.mk_var("{X1}");
        let v1 = pool.fresh_variable("X");
        let v2 = pool.fresh_variable("X");
        assert_ne!(v1, taken);
        assert_ne!(v1, v2);
        assert_eq!(pool.var_name(v1), Some(Name::new("{X2}")));
        assert_eq!(pool.var_name(v2), Some(Name::new("{X3}")));
    }

    #[test]
    fn test_independent_pools_have_independent_counters() {
        let p1 = TermPool::new();
        let p2 = TermPool::new();
        let a = p1.fresh_variable("Y");
        let b = p2.fresh_variable("Y");
        assert_eq!(p1.var_name(a), p2.var_name(b));
    }

    #[test]
    fn test_tree_size_is_exponential_in_dag_size() {
        let pool = TermPool::new();
        let mut f = pool.mk_var("X");
        for i in 0..40 {
            let label = format!("a{}", i);
            f = pool.mk_and([pool.mk_diamond(label.as_str(), f), pool.mk_box(label.as_str(), f)]);
        }
        assert_eq!(pool.dag_size(f), 1 + 40 * 3);
        // t(0) = 1, t(n+1) = 1 + 2 * (1 + t(n))  =>  t(n) = 2^(n+2) - 3
        let expected = (BigUint::from(1u32) << 42usize) - BigUint::from(3u32);
        assert_eq!(pool.tree_size(f), expected);
    }

    #[test]
    fn test_collect_garbage() {
        let pool = TermPool::new();
        let keep = pool.mk_nu("X", pool.mk_diamond("a", pool.mk_var("X")));
        let drop = pool.mk_mu("Y", pool.mk_box("b", pool.mk_var("Y")));
        assert_eq!(pool.size(), 2 + 3 + 3);

        let dropped = pool.collect_garbage(&[keep]);
        assert_eq!(dropped, 3);
        assert_eq!(pool.size(), 2 + 3);
        assert!(pool.is_live(keep));
        assert!(!pool.is_live(drop));

        // Surviving handles are unchanged, and rebuilding them is still an identity.
        assert_eq!(pool.mk_nu("X", pool.mk_diamond("a", pool.mk_var("X"))), keep);
        assert_eq!(pool.display(keep).to_string(), "nu X.<a>X");

        // Dropped shapes can be rebuilt.
        let again = pool.mk_mu("Y", pool.mk_box("b", pool.mk_var("Y")));
        assert!(pool.is_live(again));
        assert_eq!(pool.size(), 2 + 3 + 3);
    }

    #[test]
    #[should_panic(expected = "is not a live formula")]
    fn test_intern_dangling_child() {
        let pool = TermPool::new();
        pool.intern(Formula::Not(FormulaId::new(1000)));
    }

    #[test]
    fn test_display() {
        let pool = TermPool::new();
        let f = pool.mk_or([
            pool.mk_and([pool.mk_diamond("a", pool.mk_true()), pool.mk_not(pool.mk_var("X"))]),
            pool.mk_let("Z", pool.mk_false(), pool.mk_call("f", [pool.mk_var("Z"), pool.mk_true()])),
        ]);
        assert_eq!(
            pool.display(f).to_string(),
            "((<a>true && !X) || let Z = false in f(Z, true))"
        );
        let g = pool.mk_mu("X", pool.mk_box("b", pool.mk_var("X")));
        assert_eq!(pool.display(g).to_string(), "mu X.[b]X");
    }

    #[test]
    fn test_display_with_limit() {
        let pool = TermPool::new();
        let f = pool.mk_and([pool.mk_diamond("a", pool.mk_true()), pool.mk_var("X")]);
        assert_eq!(pool.display_with_limit(f, 2).to_string(), "(<a>…");
        assert_eq!(pool.display_with_limit(f, 4).to_string(), "(<a>true && X)");
    }

    #[test]
    fn test_display_deep_formula() {
        let pool = TermPool::new();
        let mut f = pool.mk_true();
        for _ in 0..200_000 {
            f = pool.mk_box("a", f);
        }
        let text = pool.display(f).to_string();
        assert!(text.starts_with("[a][a]"));
        assert!(text.ends_with("…"));
        assert_eq!(text.matches("[a]").count(), DISPLAY_LIMIT);

        let text = pool.display_with_limit(f, usize::MAX).to_string();
        assert!(text.ends_with("[a]true"));
    }

    #[test]
    fn test_display_shared_formula() {
        let pool = TermPool::new();
        let mut f = pool.mk_var("X");
        for _ in 0..64 {
            f = pool.mk_and([pool.mk_diamond("a", f), pool.mk_box("a", f)]);
        }
        // The unshared text would have more than 2^64 nodes.
        let text = pool.display(f).to_string();
        assert!(text.ends_with("…"));
    }
}
