//! Generic walks over formula DAGs.
//!
//! [`transform`] is the workhorse: a [`Transformer`] says, for every key, either what
//! the result is right away or which sub-keys it needs first, and how to combine their
//! results. Results are memoized per key for the duration of one call, so every shared
//! subterm is processed once, and the walk runs on a [`Trampoline`], so deeply nested
//! formulas do not exhaust the native stack.
//!
//! The passes in this module ([`substitute`], [`positive_normal_form`], [`expand_lets`],
//! [`expand_calls`]) are all transformers, and [`prepare`] chains them into the form the
//! tableau builder accepts.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::convert::Infallible;
use std::hash::Hash;
use std::rc::Rc;

use log::debug;

use crate::cache::Cache;
use crate::error::Error;
use crate::formula::Formula;
use crate::pool::TermPool;
use crate::reference::FormulaId;
use crate::trampoline::Trampoline;
use crate::types::{Label, Name};

/// Outcome of [`Transformer::expand`].
#[derive(Debug)]
pub enum Expand<K, O> {
    /// The result is known without looking at sub-keys.
    Done(O),
    /// The results of these keys are needed; [`Transformer::combine`] receives them in order.
    Need(Vec<K>),
}

pub trait Transformer {
    /// Keys must not depend on themselves, directly or through other keys.
    type Key: Clone + Eq + Hash + 'static;
    type Output: Clone;
    type Error;

    fn expand(&mut self, pool: &TermPool, key: &Self::Key) -> Result<Expand<Self::Key, Self::Output>, Self::Error>;

    fn combine(
        &mut self,
        pool: &TermPool,
        key: &Self::Key,
        children: Vec<Self::Output>,
    ) -> Result<Self::Output, Self::Error>;
}

struct Walk<'p, T: Transformer> {
    pool: &'p TermPool,
    transformer: &'p mut T,
    cache: Cache<T::Key, T::Output>,
    /// Keys that were expanded and wait for their children.
    pending: HashMap<T::Key, Vec<T::Key>>,
    error: Option<T::Error>,
}

impl<'p, T> Walk<'p, T>
where
    T: Transformer + 'p,
{
    fn schedule(t: &mut Trampoline<'p, Self>, key: T::Key) {
        t.push(move |walk: &mut Self, t: &mut Trampoline<'p, Self>| walk.process(t, key));
    }

    fn process(&mut self, t: &mut Trampoline<'p, Self>, key: T::Key) {
        if self.error.is_some() || self.cache.get(&key).is_some() {
            return;
        }

        let result = match self.pending.remove(&key) {
            Some(children) => {
                let outputs: Vec<T::Output> = children
                    .iter()
                    .map(|c| match self.cache.peek(c) {
                        Some(o) => o.clone(),
                        None => panic!("Child was not finished before its parent; keys must be acyclic"),
                    })
                    .collect();
                self.transformer.combine(self.pool, &key, outputs).map(Some)
            }
            None => match self.transformer.expand(self.pool, &key) {
                Ok(Expand::Done(o)) => Ok(Some(o)),
                Ok(Expand::Need(children)) => {
                    // Re-visit this key after all children are done.
                    Self::schedule(t, key.clone());
                    for c in children.iter().rev() {
                        Self::schedule(t, c.clone());
                    }
                    self.pending.insert(key.clone(), children);
                    Ok(None)
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(Some(o)) => self.cache.insert(key, o),
            Ok(None) => {}
            Err(e) => {
                self.error = Some(e);
                t.abort();
            }
        }
    }
}

/// Run a transformer from `root` and return the result for `root`.
///
/// The first error returned by the transformer aborts the walk.
pub fn transform<'p, T>(pool: &'p TermPool, transformer: &'p mut T, root: T::Key) -> Result<T::Output, T::Error>
where
    T: Transformer + 'p,
{
    let mut walk = Walk {
        pool,
        transformer,
        cache: Cache::default(),
        pending: HashMap::new(),
        error: None,
    };
    let mut trampoline = Trampoline::new();
    Walk::schedule(&mut trampoline, root.clone());
    trampoline.run(&mut walk);
    debug!(
        "transform: {} steps, cache hits = {}, misses = {}",
        trampoline.executed(),
        walk.cache.hits(),
        walk.cache.misses()
    );

    if let Some(e) = walk.error {
        return Err(e);
    }
    match walk.cache.peek(&root) {
        Some(o) => Ok(o.clone()),
        None => panic!("Walk finished without a result for the root"),
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(x) => x,
        Err(never) => match never {},
    }
}

/// Call `f` once for every distinct formula reachable from `root`, parents before children.
pub fn visit<F>(pool: &TermPool, root: FormulaId, mut f: F)
where
    F: FnMut(FormulaId, &Formula),
{
    let mut visited = HashSet::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let node = pool.node(id);
        f(id, &node);
        stack.extend(node.children().into_iter().rev());
    }
}

/// Labels of all modalities in `f`.
pub fn alphabet(pool: &TermPool, f: FormulaId) -> BTreeSet<Label> {
    let mut labels = BTreeSet::new();
    visit(pool, f, |_, node| {
        if let Formula::Modal(_, a, _) = node {
            labels.insert(a.clone());
        }
    });
    labels
}

struct FreeVariables;

impl Transformer for FreeVariables {
    type Key = FormulaId;
    type Output = Rc<BTreeSet<Name>>;
    type Error = Infallible;

    fn expand(&mut self, pool: &TermPool, f: &FormulaId) -> Result<Expand<FormulaId, Self::Output>, Infallible> {
        Ok(match pool.node(*f) {
            Formula::Var(v) => Expand::Done(Rc::new(BTreeSet::from([v]))),
            node => {
                let children = node.children();
                if children.is_empty() {
                    Expand::Done(Rc::default())
                } else {
                    Expand::Need(children)
                }
            }
        })
    }

    fn combine(&mut self, pool: &TermPool, f: &FormulaId, children: Vec<Self::Output>) -> Result<Self::Output, Infallible> {
        let mut vars = BTreeSet::new();
        match pool.node(*f) {
            Formula::Fix(_, v, _) => {
                vars.extend(children[0].iter().cloned());
                vars.remove(&v);
            }
            Formula::Let(v, _, _) => {
                vars.extend(children[1].iter().cloned());
                vars.remove(&v);
                vars.extend(children[0].iter().cloned());
            }
            _ => {
                for c in &children {
                    vars.extend(c.iter().cloned());
                }
            }
        }
        Ok(Rc::new(vars))
    }
}

/// Variables occurring in `f` outside the scope of a binder for them.
pub fn free_variables(pool: &TermPool, f: FormulaId) -> BTreeSet<Name> {
    let vars = infallible(transform(pool, &mut FreeVariables, f));
    (*vars).clone()
}

pub fn is_closed(pool: &TermPool, f: FormulaId) -> bool {
    free_variables(pool, f).is_empty()
}

/// Substitution under a family of maps, each the original map minus shadowed variables.
struct Substitute {
    maps: Vec<BTreeMap<Name, FormulaId>>,
    ids: HashMap<BTreeMap<Name, FormulaId>, usize>,
}

impl Substitute {
    fn new(map: BTreeMap<Name, FormulaId>) -> Self {
        let mut s = Self {
            maps: Vec::new(),
            ids: HashMap::new(),
        };
        s.intern_map(map);
        s
    }

    fn intern_map(&mut self, map: BTreeMap<Name, FormulaId>) -> usize {
        if let Some(&i) = self.ids.get(&map) {
            return i;
        }
        let i = self.maps.len();
        self.maps.push(map.clone());
        self.ids.insert(map, i);
        i
    }

    fn without(&mut self, m: usize, v: &Name) -> usize {
        if !self.maps[m].contains_key(v) {
            return m;
        }
        let mut map = self.maps[m].clone();
        map.remove(v);
        self.intern_map(map)
    }
}

impl Transformer for Substitute {
    type Key = (FormulaId, usize);
    type Output = FormulaId;
    type Error = Infallible;

    fn expand(&mut self, pool: &TermPool, &(f, m): &(FormulaId, usize)) -> Result<Expand<Self::Key, FormulaId>, Infallible> {
        if self.maps[m].is_empty() {
            return Ok(Expand::Done(f));
        }
        Ok(match pool.node(f) {
            Formula::Var(v) => Expand::Done(self.maps[m].get(&v).copied().unwrap_or(f)),
            Formula::Fix(_, v, body) => Expand::Need(vec![(body, self.without(m, &v))]),
            Formula::Let(v, e, b) => Expand::Need(vec![(e, m), (b, self.without(m, &v))]),
            node => {
                let children = node.children();
                if children.is_empty() {
                    Expand::Done(f)
                } else {
                    Expand::Need(children.into_iter().map(|c| (c, m)).collect())
                }
            }
        })
    }

    fn combine(&mut self, pool: &TermPool, &(f, _): &(FormulaId, usize), children: Vec<FormulaId>) -> Result<FormulaId, Infallible> {
        Ok(pool.intern(pool.node(f).with_children(&children)))
    }
}

/// Simultaneously replace the free occurrences of every variable in `map`.
///
/// Binders shadow: a fixed point or let binding `X` stops the replacement of `X` in its
/// scope. Replacements are not renamed apart, so they must not contain variables that
/// a binder in `f` would capture. Fresh placeholders never are.
pub fn substitute_many(pool: &TermPool, f: FormulaId, map: BTreeMap<Name, FormulaId>) -> FormulaId {
    infallible(transform(pool, &mut Substitute::new(map), (f, 0)))
}

/// `f[var := replacement]`, see [`substitute_many`].
pub fn substitute(pool: &TermPool, f: FormulaId, var: &Name, replacement: FormulaId) -> FormulaId {
    substitute_many(pool, f, BTreeMap::from([(var.clone(), replacement)]))
}

struct PositiveNormalForm;

impl Transformer for PositiveNormalForm {
    /// A formula and whether it occurs under an odd number of negations.
    type Key = (FormulaId, bool);
    type Output = FormulaId;
    type Error = Infallible;

    fn expand(&mut self, pool: &TermPool, &(f, negated): &(FormulaId, bool)) -> Result<Expand<Self::Key, FormulaId>, Infallible> {
        Ok(match pool.node(f) {
            Formula::True => Expand::Done(pool.mk_bool(!negated)),
            Formula::False => Expand::Done(pool.mk_bool(negated)),
            Formula::Var(_) if negated => Expand::Done(pool.mk_not(f)),
            Formula::Var(_) => Expand::Done(f),
            Formula::Not(g) => Expand::Need(vec![(g, !negated)]),
            Formula::Fix(_, v, body) if negated => {
                // !sigma X.f = dual(sigma) X.!f[X := !X]
                let not_v = pool.mk_not(pool.mk_var(v.clone()));
                Expand::Need(vec![(substitute(pool, body, &v, not_v), true)])
            }
            Formula::Let(v, e, b) => Expand::Need(vec![(substitute(pool, b, &v, e), negated)]),
            Formula::Call(_, args) => Expand::Need(args.iter().map(|&a| (a, false)).collect()),
            node => Expand::Need(node.children().into_iter().map(|c| (c, negated)).collect()),
        })
    }

    fn combine(&mut self, pool: &TermPool, &(f, negated): &(FormulaId, bool), children: Vec<FormulaId>) -> Result<FormulaId, Infallible> {
        Ok(match pool.node(f) {
            Formula::Not(_) | Formula::Let(..) => children[0],
            Formula::And(_) if negated => pool.intern(Formula::Or(children.into())),
            Formula::Or(_) if negated => pool.intern(Formula::And(children.into())),
            Formula::Modal(m, a, _) if negated => pool.mk_modal(m.dual(), a, children[0]),
            Formula::Fix(p, v, _) if negated => pool.mk_fix(p.dual(), v, children[0]),
            Formula::Call(g, _) => {
                let call = pool.intern(Formula::Call(g, children.into()));
                if negated {
                    pool.mk_not(call)
                } else {
                    call
                }
            }
            node => pool.intern(node.with_children(&children)),
        })
    }
}

/// Push all negations down to variables.
///
/// Negated variables remain only where a variable is negated without being bound by a
/// negated fixed point, which makes the formula non-monotone.
pub fn positive_normal_form(pool: &TermPool, f: FormulaId) -> FormulaId {
    infallible(transform(pool, &mut PositiveNormalForm, (f, false)))
}

struct ExpandLets;

impl Transformer for ExpandLets {
    type Key = FormulaId;
    type Output = FormulaId;
    type Error = Infallible;

    fn expand(&mut self, pool: &TermPool, &f: &FormulaId) -> Result<Expand<FormulaId, FormulaId>, Infallible> {
        let children = pool.node(f).children();
        Ok(if children.is_empty() {
            Expand::Done(f)
        } else {
            Expand::Need(children)
        })
    }

    fn combine(&mut self, pool: &TermPool, &f: &FormulaId, children: Vec<FormulaId>) -> Result<FormulaId, Infallible> {
        Ok(match pool.node(f) {
            Formula::Let(v, _, _) => substitute(pool, children[1], &v, children[0]),
            node => pool.intern(node.with_children(&children)),
        })
    }
}

/// Replace every `let X = e in b` by `b[X := e]`.
pub fn expand_lets(pool: &TermPool, f: FormulaId) -> FormulaId {
    infallible(transform(pool, &mut ExpandLets, f))
}

#[derive(Debug, Clone)]
pub struct Definition {
    pub params: Vec<Name>,
    pub body: FormulaId,
}

/// Named formula functions, usable through call nodes.
///
/// A definition may only call functions defined before it, so definitions are never
/// recursive and call expansion always terminates.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    defs: BTreeMap<Name, Definition>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        pool: &TermPool,
        name: impl Into<Name>,
        params: impl IntoIterator<Item = Name>,
        body: FormulaId,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.defs.contains_key(&name) {
            return Err(Error::DuplicateDefinition { name: name.to_string() });
        }

        let mut error = None;
        visit(pool, body, |_, node| {
            if let Formula::Call(g, args) = node {
                if error.is_none() {
                    error = self.check_call(g, args.len()).err();
                }
            }
        });
        if let Some(e) = error {
            return Err(e);
        }

        debug!("define {}", name);
        self.defs.insert(
            name,
            Definition {
                params: params.into_iter().collect(),
                body,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &Name) -> Option<&Definition> {
        self.defs.get(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    fn check_call(&self, name: &Name, arity: usize) -> Result<&Definition, Error> {
        let def = self
            .defs
            .get(name)
            .ok_or_else(|| Error::UnknownFunction { name: name.to_string() })?;
        if def.params.len() != arity {
            return Err(Error::ArityMismatch {
                name: name.to_string(),
                expected: def.params.len(),
                found: arity,
            });
        }
        Ok(def)
    }
}

struct ExpandCalls<'d> {
    defs: &'d Definitions,
    /// Function bodies with their own calls already expanded.
    bodies: HashMap<Name, FormulaId>,
}

impl Transformer for ExpandCalls<'_> {
    type Key = FormulaId;
    type Output = FormulaId;
    type Error = Error;

    fn expand(&mut self, pool: &TermPool, &f: &FormulaId) -> Result<Expand<FormulaId, FormulaId>, Error> {
        Ok(match pool.node(f) {
            Formula::Call(g, args) => {
                self.defs.check_call(&g, args.len())?;
                Expand::Need(args.to_vec())
            }
            node => {
                let children = node.children();
                if children.is_empty() {
                    Expand::Done(f)
                } else {
                    Expand::Need(children)
                }
            }
        })
    }

    fn combine(&mut self, pool: &TermPool, &f: &FormulaId, children: Vec<FormulaId>) -> Result<FormulaId, Error> {
        match pool.node(f) {
            Formula::Call(g, _) => {
                let def = self.defs.check_call(&g, children.len())?;
                let body = match self.bodies.get(&g) {
                    Some(&body) => body,
                    None => {
                        let body = expand_calls(pool, self.defs, def.body)?;
                        self.bodies.insert(g.clone(), body);
                        body
                    }
                };
                let map = def.params.iter().cloned().zip(children).collect();
                Ok(substitute_many(pool, body, map))
            }
            node => Ok(pool.intern(node.with_children(&children))),
        }
    }
}

/// Replace every call by the body of the called function with the arguments substituted
/// for its parameters.
pub fn expand_calls(pool: &TermPool, defs: &Definitions, f: FormulaId) -> Result<FormulaId, Error> {
    let mut expander = ExpandCalls {
        defs,
        bodies: HashMap::new(),
    };
    transform(pool, &mut expander, f)
}

/// Bring a formula into the form accepted by the tableau builder: calls and lets
/// expanded, negations eliminated, no free variables.
pub fn prepare(pool: &TermPool, defs: &Definitions, f: FormulaId) -> Result<FormulaId, Error> {
    let g = expand_calls(pool, defs, f)?;
    let g = expand_lets(pool, g);
    let g = positive_normal_form(pool, g);

    if let Some(name) = free_variables(pool, g).into_iter().next() {
        return Err(Error::FreeVariable { name: name.to_string() });
    }

    let mut unexpected = None;
    visit(pool, g, |id, node| {
        if unexpected.is_none() && matches!(node, Formula::Not(_) | Formula::Let(..) | Formula::Call(..)) {
            unexpected = Some((node.kind(), id));
        }
    });
    if let Some((kind, id)) = unexpected {
        return Err(Error::UnexpectedNode {
            kind,
            formula: id,
        });
    }

    debug!("prepare({}) = {} with {} nodes", f, g, pool.dag_size(g));
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn names(vs: &[&str]) -> BTreeSet<Name> {
        vs.iter().map(|&v| Name::new(v)).collect()
    }

    #[test]
    fn test_visit_each_node_once() {
        let pool = TermPool::new();
        let x = pool.mk_var("X");
        let f = pool.mk_and([pool.mk_diamond("a", x), pool.mk_box("a", x)]);
        let mut seen = Vec::new();
        visit(&pool, f, |id, _| seen.push(id));
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], f);
        assert_eq!(seen.iter().filter(|&&id| id == x).count(), 1);
    }

    #[test]
    fn test_free_variables() {
        let pool = TermPool::new();
        let f = pool.mk_nu("X", pool.mk_and([pool.mk_diamond("a", pool.mk_var("X")), pool.mk_var("Y")]));
        assert_eq!(free_variables(&pool, f), names(&["Y"]));
        assert!(!is_closed(&pool, f));

        // The let variable is bound in the body only.
        let g = pool.mk_let("Z", pool.mk_var("Z"), pool.mk_and([pool.mk_var("Z"), pool.mk_var("W")]));
        assert_eq!(free_variables(&pool, g), names(&["W", "Z"]));

        let h = pool.mk_mu("X", pool.mk_box("b", pool.mk_var("X")));
        assert!(is_closed(&pool, h));
        assert!(is_closed(&pool, pool.mk_true()));
    }

    #[test]
    fn test_alphabet() {
        let pool = TermPool::new();
        let f = pool.mk_or([
            pool.mk_diamond("b", pool.mk_box("a", pool.mk_true())),
            pool.mk_diamond("c", pool.mk_false()),
        ]);
        let labels: Vec<String> = alphabet(&pool, f).iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_substitute_respects_shadowing() {
        let pool = TermPool::new();
        let x = pool.mk_var("X");
        let f = pool.mk_and([x, pool.mk_mu("X", x)]);
        let g = substitute(&pool, f, &Name::new("X"), pool.mk_true());
        assert_eq!(pool.display(g).to_string(), "(true && mu X.X)");

        // Unchanged formulas come back as the same handle.
        assert_eq!(substitute(&pool, g, &Name::new("X"), pool.mk_false()), g);
    }

    #[test]
    fn test_substitute_many_is_simultaneous() {
        let pool = TermPool::new();
        let (x, y) = (pool.mk_var("X"), pool.mk_var("Y"));
        let f = pool.mk_and([x, y]);
        let map = BTreeMap::from([(Name::new("X"), y), (Name::new("Y"), x)]);
        assert_eq!(substitute_many(&pool, f, map), pool.mk_and([y, x]));
    }

    #[test]
    fn test_positive_normal_form() {
        let pool = TermPool::new();
        let f = pool.mk_not(pool.mk_and([
            pool.mk_diamond("a", pool.mk_true()),
            pool.mk_box("b", pool.mk_false()),
        ]));
        let g = positive_normal_form(&pool, f);
        assert_eq!(pool.display(g).to_string(), "([a]false || <b>true)");

        // !mu X.<a>X = nu X.[a]!!X = nu X.[a]X
        let f = pool.mk_not(pool.mk_mu("X", pool.mk_diamond("a", pool.mk_var("X"))));
        let g = positive_normal_form(&pool, f);
        assert_eq!(g, pool.mk_nu("X", pool.mk_box("a", pool.mk_var("X"))));

        // A free variable keeps its negation.
        let f = pool.mk_not(pool.mk_not(pool.mk_not(pool.mk_var("Y"))));
        assert_eq!(positive_normal_form(&pool, f), pool.mk_not(pool.mk_var("Y")));
    }

    #[test]
    fn test_expand_lets() {
        let pool = TermPool::new();
        let z = pool.mk_var("Z");
        let f = pool.mk_let("Z", pool.mk_diamond("a", pool.mk_true()), pool.mk_and([z, pool.mk_box("b", z)]));
        let g = expand_lets(&pool, f);
        assert_eq!(pool.display(g).to_string(), "(<a>true && [b]<a>true)");
    }

    #[test]
    fn test_expand_calls() {
        let pool = TermPool::new();
        let mut defs = Definitions::new();
        let x = Name::new("x");
        defs.define(&pool, "f", [x.clone()], pool.mk_diamond("a", pool.mk_var(x.clone())))
            .unwrap();
        // g(y) = f(f(y))
        let y = Name::new("y");
        let inner = pool.mk_call("f", [pool.mk_var(y.clone())]);
        defs.define(&pool, "g", [y], pool.mk_call("f", [inner])).unwrap();
        assert_eq!(defs.len(), 2);

        let f = pool.mk_call("g", [pool.mk_true()]);
        let g = expand_calls(&pool, &defs, f).unwrap();
        assert_eq!(pool.display(g).to_string(), "<a><a>true");
    }

    #[test]
    fn test_call_errors() {
        let pool = TermPool::new();
        let mut defs = Definitions::new();
        defs.define(&pool, "f", [Name::new("x")], pool.mk_var("x")).unwrap();

        let r = defs.define(&pool, "f", [], pool.mk_true());
        assert!(matches!(r, Err(Error::DuplicateDefinition { .. })));

        // Recursion is impossible: h is not yet defined inside its own body.
        let r = defs.define(&pool, "h", [], pool.mk_call("h", []));
        assert!(matches!(r, Err(Error::UnknownFunction { .. })));

        let r = expand_calls(&pool, &defs, pool.mk_call("f", []));
        assert!(matches!(r, Err(Error::ArityMismatch { expected: 1, found: 0, .. })));

        let r = expand_calls(&pool, &defs, pool.mk_diamond("a", pool.mk_call("nope", [])));
        assert!(matches!(r, Err(Error::UnknownFunction { .. })));
    }

    #[test]
    fn test_prepare() {
        let pool = TermPool::new();
        let mut defs = Definitions::new();
        defs.define(&pool, "live", [Name::new("p")], pool.mk_diamond("a", pool.mk_var("p")))
            .unwrap();

        // let T = true in !live(!T)
        let f = pool.mk_let(
            "T",
            pool.mk_true(),
            pool.mk_not(pool.mk_call("live", [pool.mk_not(pool.mk_var("T"))])),
        );
        let g = prepare(&pool, &defs, f).unwrap();
        assert_eq!(g, pool.mk_box("a", pool.mk_true()));

        let r = prepare(&pool, &defs, pool.mk_diamond("a", pool.mk_var("X")));
        assert!(matches!(r, Err(Error::FreeVariable { .. })));

        // nu X.!X is closed but not monotone.
        let r = prepare(&pool, &defs, pool.mk_nu("X", pool.mk_not(pool.mk_var("X"))));
        assert!(matches!(r, Err(Error::UnexpectedNode { kind: "negation", .. })));
    }

    #[test]
    fn test_deep_formula() {
        let pool = TermPool::new();
        let mut f = pool.mk_var("X");
        for _ in 0..100_000 {
            f = pool.mk_diamond("a", f);
        }
        let f = pool.mk_mu("X", pool.mk_not(pool.mk_not(f)));
        assert!(is_closed(&pool, f));
        let g = positive_normal_form(&pool, f);
        assert_eq!(pool.dag_size(g), 100_002);
    }

    #[test]
    fn test_shared_formula_is_walked_once() {
        let pool = TermPool::new();
        let mut f = pool.mk_var("X");
        for _ in 0..64 {
            f = pool.mk_and([pool.mk_diamond("a", f), pool.mk_box("a", f)]);
        }
        // The unshared tree has more than 2^64 nodes.
        let g = substitute(&pool, f, &Name::new("X"), pool.mk_true());
        assert!(is_closed(&pool, g));
        assert_eq!(pool.dag_size(g), 1 + 64 * 3);
    }
}
