//! Memo tables for formula transformations and tableau construction.
//!
//! Every memoizing algorithm in this crate keeps its own cache for the duration of one
//! top-level call and drops it afterwards, so results are never shared across calls.
//!
//! # Example
//!
//! ```
//! use mucalc_rs::cache::Cache;
//!
//! let mut cache = Cache::<(u32, u32), i32>::new(4);
//! cache.insert((1, 2), 42);
//! assert_eq!(cache.get(&(1, 2)), Some(&42));
//! assert_eq!(cache.hits(), 1);
//! ```

mod hashmap;

pub use hashmap::HashMapCache;

/// Default cache implementation.
pub type Cache<K, V> = HashMapCache<K, V>;
