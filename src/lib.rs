//! # mucalc-rs: modal mu-calculus tableaux and realization search
//!
//! **`mucalc-rs`** checks modal mu-calculus formulas on labeled transition systems with
//! memoized tableaux, and searches for transition systems that satisfy a formula by
//! repeatedly adding the arcs a failed tableau asks for.
//!
//! ## Key Features
//!
//! - **Hash-consed formulas**: All formulas are created through the [`TermPool`][crate::pool::TermPool]
//!   manager. Structurally equal formulas share one [`FormulaId`][crate::reference::FormulaId] handle.
//! - **No native recursion**: Walks over formulas and tableaux run on an explicit
//!   [`Trampoline`][crate::trampoline::Trampoline], so deep formulas cannot overflow the stack.
//! - **Fixed points without cycles**: Formula nodes stay acyclic; fixed-point unfolding is
//!   tracked in a per-branch environment of the [tableau builder][crate::tableau::TableauBuilder].
//! - **Repairs**: A failed tableau yields the minimal alternative sets of missing arcs
//!   ([`find_repairs`][crate::repair::find_repairs]).
//! - **Realization**: The [`Search`][crate::search::Search] extends candidates with repairs and
//!   generalizes them with an [oracle][crate::oracle::Overapproximation], e.g. the k-bounded
//!   Petri-net oracle [`BoundedNet`][crate::regions::BoundedNet].
//!
//! ## Basic Usage
//!
//! ```rust
//! use mucalc_rs::lts::Lts;
//! use mucalc_rs::pool::TermPool;
//! use mucalc_rs::regions::{BoundedNet, NetProperties};
//! use mucalc_rs::search::{realize, SearchConfig};
//! use mucalc_rs::walk::{alphabet, prepare, Definitions};
//!
//! // 1. Initialize the manager
//! let pool = TermPool::new();
//!
//! // 2. Build a formula: nu X.(<a><b><c>true && <b><a>[c]X)
//! let x = pool.mk_var("X");
//! let abc = pool.mk_diamond("a", pool.mk_diamond("b", pool.mk_diamond("c", pool.mk_true())));
//! let bacx = pool.mk_diamond("b", pool.mk_diamond("a", pool.mk_box("c", x)));
//! let f = pool.mk_nu("X", pool.mk_and([abc, bacx]));
//!
//! // 3. Bring it into the form the tableau builder accepts
//! let f = prepare(&pool, &Definitions::new(), f).unwrap();
//!
//! // 4. Search for 2-bounded realizations, starting from a single state
//! let initial = Lts::new(alphabet(&pool, f));
//! let properties = NetProperties::default().with_bound(2);
//! let found = realize(&pool, &BoundedNet, &properties, SearchConfig::default(), f, initial).unwrap();
//!
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].system.num_states(), 4);
//! assert!(found[0].tableau.success());
//! ```
//!
//! ## Core Components
//!
//! - **[`pool`]** and **[`formula`]**: Formula storage and node kinds.
//! - **[`walk`]**: Generic memoized transformations, substitution and normal forms.
//! - **[`tableau`]** and **[`repair`]**: Model checking and missing-arc analysis.
//! - **[`search`]**: The realization loop, with [`oracle`] and [`regions`] for generalization.
//! - **[`lts`]** and **[`dot`]**: Explicit transition systems and their Graphviz export.

pub mod cache;
pub mod dot;
pub mod error;
pub mod formula;
pub mod lts;
pub mod oracle;
pub mod pool;
pub mod reference;
pub mod regions;
pub mod repair;
pub mod search;
pub mod table;
pub mod tableau;
pub mod trampoline;
pub mod ts;
pub mod types;
pub mod utils;
pub mod walk;
