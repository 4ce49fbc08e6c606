//! Adaptive replacement cache.
//!
//! An [`ArcCache`] splits its capacity between two parts:
//!
//! - the **LRU part** admits every new key and counts hits per entry;
//! - the **LFU part** receives a copy of each new key, and a copy of any LRU
//!   part entry whose hit count reaches the transform threshold.
//!
//! Both parts are recency lists of their own, each with a ghost list holding
//! the keys it recently evicted. A lookup or write of a key found in a ghost
//! list means that part was too small: the other part gives up one slot and
//! this part takes it. The two capacities always add up to at most the
//! configured total.
//!
//! ```text
//!            ┌──────── total capacity ────────┐
//!  ghost ◄── │ LRU part main │ LFU part main  │ ──► ghost
//!            └───────────────┴────────────────┘
//!                     ◄── boundary moves ──►
//! ```
//!
//! The parts are locked independently. Ghost checks and rebalancing always
//! take the LRU part's lock before the LFU part's, and no operation holds
//! both locks at once.

mod node;
mod part;

use std::collections::hash_map::RandomState;
use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};

use log::debug;

use crate::cache_policy::CachePolicy;
use crate::config::ArcConfig;
use crate::error::ConfigError;
use part::{ArcPart, Hit, PartKind};

/// Default number of LRU part hits before an entry is promoted.
pub const DEFAULT_TRANSFORM_THRESHOLD: usize = 2;

/// A thread-safe adaptive replacement cache.
///
/// # Examples
///
/// ```rust
/// use policy_cache::ArcCache;
///
/// let cache = ArcCache::new(4, 2);
/// cache.put("a", 1);
/// assert_eq!(cache.get(&"a"), Some(1));
/// assert_eq!(cache.lru_part_capacity() + cache.lfu_part_capacity(), 4);
/// ```
pub struct ArcCache<K, V, S = RandomState>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    capacity: usize,
    transform_threshold: usize,
    lru_part: ArcPart<K, V, S>,
    lfu_part: ArcPart<K, V, S>,
}

impl<K, V> ArcCache<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// The LRU part starts with the larger half of an odd capacity.
    pub fn new(capacity: usize, transform_threshold: usize) -> Self {
        Self::with_hasher(capacity, transform_threshold, RandomState::new())
    }

    pub fn from_config(config: ArcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.capacity, config.transform_threshold))
    }
}

impl<K, V, S> ArcCache<K, V, S>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub fn with_hasher(capacity: usize, transform_threshold: usize, hash_builder: S) -> Self {
        let (lru_capacity, lfu_capacity) = split_capacity(capacity);
        Self {
            capacity,
            transform_threshold,
            lru_part: ArcPart::new(
                PartKind::Recency,
                lru_capacity,
                capacity,
                transform_threshold,
                hash_builder.clone(),
            ),
            lfu_part: ArcPart::new(
                PartKind::Frequency,
                lfu_capacity,
                capacity,
                transform_threshold,
                hash_builder,
            ),
        }
    }

    // Returns whether `key` was a ghost in either part, shifting one slot of
    // capacity towards the part that remembered it.
    fn check_ghost_caches(&self, key: &K) -> bool {
        if self.lru_part.check_ghost(key) {
            if self.lfu_part.decrease_capacity() {
                self.lru_part.increase_capacity();
                debug!("arc: ghost hit on {:?} grew the lru part", key);
            }
            true
        } else if self.lfu_part.check_ghost(key) {
            if self.lru_part.decrease_capacity() {
                self.lfu_part.increase_capacity();
                debug!("arc: ghost hit on {:?} grew the lfu part", key);
            }
            true
        } else {
            false
        }
    }

    /// Inserts or overwrites `key`.
    ///
    /// A key neither part remembers is written to both parts. A key found in
    /// a ghost list only goes to the LRU part; a stale copy still resident in
    /// the LFU part gets the new value.
    pub fn put(&self, key: K, value: V) {
        if self.check_ghost_caches(&key) {
            self.lfu_part.update_value(&key, value.clone());
            self.lru_part.put(key, value);
        } else if self.lru_part.put(key.clone(), value.clone()) {
            self.lfu_part.put(key, value);
        }
    }

    /// Looks `key` up in the LRU part first, then in the LFU part.
    ///
    /// A hit that brings an LRU part entry to the transform threshold copies
    /// it into the LFU part.
    pub fn get(&self, key: &K) -> Option<V> {
        self.check_ghost_caches(key);
        match self.lru_part.get(key) {
            Some(Hit { value, promote }) => {
                if promote {
                    self.lfu_part.put(key.clone(), value.clone());
                }
                Some(value)
            }
            None => self.lfu_part.get(key).map(|hit| hit.value),
        }
    }

    /// Removes `key` from both parts and their ghost lists.
    pub fn remove(&self, key: &K) -> Option<V> {
        let from_lru = self.lru_part.remove(key);
        let from_lfu = self.lfu_part.remove(key);
        from_lru.or(from_lfu)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lru_part.contains(key) || self.lfu_part.contains(key)
    }

    /// Occupied slots summed over both parts.
    ///
    /// A key that sits in both parts takes a slot in each and counts twice,
    /// so this is what is bounded by [`capacity`](Self::capacity). See
    /// [`resident_keys`](Self::resident_keys) for distinct keys.
    pub fn len(&self) -> usize {
        self.lru_part.len() + self.lfu_part.len()
    }

    /// Number of distinct keys resident in either part.
    ///
    /// Walks the LFU part's keys, so it is O(n) unlike [`len`](Self::len).
    pub fn resident_keys(&self) -> usize {
        let only_lfu = self
            .lfu_part
            .keys()
            .into_iter()
            .filter(|key| !self.lru_part.contains(key))
            .count();
        self.lru_part.len() + only_lfu
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn transform_threshold(&self) -> usize {
        self.transform_threshold
    }

    pub fn lru_part_capacity(&self) -> usize {
        self.lru_part.capacity()
    }

    pub fn lfu_part_capacity(&self) -> usize {
        self.lfu_part.capacity()
    }

    pub fn lru_ghost_len(&self) -> usize {
        self.lru_part.ghost_len()
    }

    pub fn lfu_ghost_len(&self) -> usize {
        self.lfu_part.ghost_len()
    }

    /// LRU part hits recorded for `key`, counting its admission as one.
    pub fn access_count(&self, key: &K) -> Option<usize> {
        self.lru_part.access_count(key)
    }

    /// Drops every entry and ghost and restores the initial capacity split.
    pub fn clear(&self) {
        let (lru_capacity, lfu_capacity) = split_capacity(self.capacity);
        self.lru_part.reset(lru_capacity);
        self.lfu_part.reset(lfu_capacity);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.lru_part.debug_validate_invariants();
        self.lfu_part.debug_validate_invariants();
        assert!(self.lru_part_capacity() + self.lfu_part_capacity() <= self.capacity);
        assert!(self.len() <= self.capacity);
    }
}

fn split_capacity(capacity: usize) -> (usize, usize) {
    let lfu = capacity / 2;
    (capacity - lfu, lfu)
}

impl<K, V, S> CachePolicy<K, V> for ArcCache<K, V, S>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    fn put(&self, key: K, value: V) {
        self.put(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.get(key)
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn capacity(&self) -> usize {
        self.capacity()
    }
}
