//! HashMap-based memo table.
//!
//! Keys of the memo tables in this crate are small `Copy` tuples of handles
//! (sequents, formula ids, tableau node ids), so a plain `HashMap` with hit/miss
//! counters is all that is needed. The counters are reported in debug logs.

use std::collections::HashMap;
use std::hash::Hash;

/// A cache backed by [HashMap].
///
/// Never evicts: a memo table must remember every result it was given until cleared.
pub struct HashMapCache<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for HashMapCache<K, V> {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<K, V> HashMapCache<K, V> {
    /// Creates a new cache with room for `2^bits` entries before reallocating.
    pub fn new(bits: usize) -> Self {
        Self {
            map: HashMap::with_capacity(1 << bits),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Clears all entries and resets the counters.
    pub fn clear(&mut self) {
        self.map.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

impl<K, V> HashMapCache<K, V>
where
    K: Hash + Eq,
{
    /// Looks up a key in the cache, counting a hit or a miss.
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.map.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Looks up a key without touching the counters.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Returns true if the key has a cached result.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts a key-value pair into the cache.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}
