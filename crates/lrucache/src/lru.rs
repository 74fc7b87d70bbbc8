//! LRU (Least Recently Used) cache implementation
//!
//! Entries live in an arena of nodes linked into a ring. Two permanent
//! boundary nodes mark the least and most recently used ends, so linking and
//! unlinking never special-case an empty list or the first/last entry. The
//! index maps keys to arena handles and never owns an entry.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use ahash::RandomState;
use tracing::trace;

use crate::error::{Error, Result};
use crate::stats::CacheStats;

/// Handle of the boundary on the least recently used side
const LRU: usize = 0;

/// Handle of the boundary on the most recently used side
const MRU: usize = 1;

/// Upper bound on entries reserved up front; larger caches grow on demand
const PREALLOC_LIMIT: usize = 1024;

/// Cached key-value pair
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Slot in the arena. Boundaries and vacant slots carry no entry.
struct Node<K, V> {
    entry: Option<Entry<K, V>>,
    prev: usize,
    next: usize,
}

/// LRU cache with fixed capacity
///
/// Keys must be `Clone`: each key is stored once in the index and once in its
/// arena entry so eviction can deregister it.
pub struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Node<K, V>>,
    free_list: Vec<usize>,
    capacity: usize,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache holding at most `capacity` entries
    ///
    /// # Errors
    /// Returns [`Error::InvalidCapacity`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        // One spare slot: a new key is linked before the LRU entry is evicted.
        let reserved = capacity.min(PREALLOC_LIMIT) + 1;
        let mut nodes = Vec::with_capacity(reserved + 2);
        nodes.push(Node {
            entry: None,
            prev: MRU,
            next: MRU,
        });
        nodes.push(Node {
            entry: None,
            prev: LRU,
            next: LRU,
        });

        Ok(Self {
            map: HashMap::with_capacity_and_hasher(reserved, RandomState::new()),
            nodes,
            free_list: Vec::new(),
            capacity,
            stats: CacheStats::new(),
        })
    }

    /// Get a value from the cache, marking it as most recently used
    ///
    /// Returns `None` if the key is not cached.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&idx) = self.map.get(key) else {
            self.stats.record_miss();
            return None;
        };

        self.stats.record_hit();
        self.move_to_most_recent(idx);
        self.nodes[idx].entry.as_ref().map(|entry| &entry.value)
    }

    /// Get a value without touching its recency or the statistics
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let &idx = self.map.get(key)?;
        self.nodes[idx].entry.as_ref().map(|entry| &entry.value)
    }

    /// Check whether a key is cached without touching its recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert or overwrite a key-value pair and mark it as most recently used
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            debug_assert!(self.nodes[idx].entry.is_some(), "indexed slot {} is vacant", idx);
            if let Some(entry) = &mut self.nodes[idx].entry {
                entry.value = value;
            }
            self.move_to_most_recent(idx);
            self.stats.record_update();
            return;
        }

        let idx = self.alloc_node(Entry {
            key: key.clone(),
            value,
        });
        self.link_at_most_recent(idx);
        self.map.insert(key, idx);
        self.stats.record_insert();

        if self.map.len() > self.capacity {
            self.evict();
        }
    }

    /// Remove a key from the cache, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.stats.record_removal();
        self.release(idx).map(|entry| entry.value)
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.map.clear();
        self.free_list.clear();
        self.nodes.truncate(2);
        self.nodes[LRU].prev = MRU;
        self.nodes[LRU].next = MRU;
        self.nodes[MRU].prev = LRU;
        self.nodes[MRU].next = LRU;
    }

    /// Get the current number of cached entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Reset cache statistics
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Collect every cached pair for inspection
    ///
    /// The order is unspecified and does not reflect recency.
    pub fn snapshot(&self) -> Vec<(&K, &V)> {
        self.map
            .values()
            .filter_map(|&idx| self.nodes[idx].entry.as_ref())
            .map(|entry| (&entry.key, &entry.value))
            .collect()
    }

    fn move_to_most_recent(&mut self, idx: usize) {
        if self.nodes[MRU].prev == idx {
            return;
        }

        self.unlink(idx);
        self.link_at_most_recent(idx);
    }

    fn link_at_most_recent(&mut self, idx: usize) {
        let prev = self.nodes[MRU].prev;
        self.nodes[prev].next = idx;
        self.nodes[idx].prev = prev;
        self.nodes[idx].next = MRU;
        self.nodes[MRU].prev = idx;
    }

    /// Detach a node from the ring. A detached node links to itself.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[idx].prev = idx;
        self.nodes[idx].next = idx;
    }

    fn evict(&mut self) {
        let idx = self.nodes[LRU].next;
        debug_assert_ne!(idx, MRU, "evict on an empty cache");

        if let Some(entry) = self.release(idx) {
            self.map.remove(&entry.key);
            self.stats.record_eviction();
            trace!(slot = idx, len = self.map.len(), "evicted least recently used entry");
        }
    }

    /// Unlink a node and hand its slot to the free list
    fn release(&mut self, idx: usize) -> Option<Entry<K, V>> {
        self.unlink(idx);
        self.free_list.push(idx);
        self.nodes[idx].entry.take()
    }

    fn alloc_node(&mut self, entry: Entry<K, V>) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx].entry = Some(entry);
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(Node {
                entry: Some(entry),
                prev: idx,
                next: idx,
            });
            idx
        }
    }

    /// Keys walked from the least to the most recently used boundary
    #[cfg(test)]
    fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::new();
        let mut idx = self.nodes[LRU].next;
        while idx != MRU {
            let entry = self.nodes[idx].entry.as_ref().expect("linked node without entry");
            keys.push(entry.key.clone());
            idx = self.nodes[idx].next;
        }
        keys
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        assert!(self.nodes[LRU].entry.is_none());
        assert!(self.nodes[MRU].entry.is_none());
        assert_eq!(self.nodes[self.nodes[LRU].prev].next, LRU);
        assert_eq!(self.nodes[self.nodes[MRU].next].prev, MRU);

        let mut linked = 0;
        let mut prev = LRU;
        let mut idx = self.nodes[LRU].next;
        while idx != MRU {
            assert_eq!(self.nodes[idx].prev, prev, "broken back link at slot {}", idx);
            let entry = self.nodes[idx].entry.as_ref().expect("linked node without entry");
            assert_eq!(self.map.get(&entry.key), Some(&idx));
            assert!(!self.free_list.contains(&idx));
            linked += 1;
            prev = idx;
            idx = self.nodes[idx].next;
        }

        assert_eq!(self.nodes[MRU].prev, prev);
        assert_eq!(linked, self.map.len());
        assert!(self.map.len() <= self.capacity);
        for &idx in &self.free_list {
            assert!(self.nodes[idx].entry.is_none());
            assert_eq!((self.nodes[idx].prev, self.nodes[idx].next), (idx, idx));
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.map.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// One `key: value` line per entry, in unspecified order
impl<K, V> fmt::Display for LruCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.snapshot() {
            writeln!(f, "{}: {}", key, value)?;
        }
        Ok(())
    }
}
