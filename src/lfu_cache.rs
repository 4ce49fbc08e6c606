//! LFU cache with per-frequency recency buckets and average-frequency decay.
//!
//! ```text
//!   buckets
//!   ┌──────┬──────────────────────────────────┐
//!   │ freq │ head ◄──► ... ◄──► tail           │
//!   ├──────┼──────────────────────────────────┤
//!   │  1   │ head ◄──► [d] ◄──► [e] ◄──► tail  │  ◄── min_freq
//!   │  3   │ head ◄──► [b] ◄──► tail           │
//!   │  6   │ head ◄──► [a] ◄──► [c] ◄──► tail  │
//!   └──────┴──────────────────────────────────┘
//! ```
//!
//! Every entry sits in the bucket of its exact frequency; within a bucket the
//! node after `head` is the least recently touched. Eviction takes that node
//! from the `min_freq` bucket, so ties on frequency fall back to recency.
//!
//! The cache also keeps the sum of all entry frequencies. When the integer
//! average `total / len` rises above `max_average_num`, every frequency is
//! lowered by `max_average_num / 2` (never below 1) and the buckets are
//! rebuilt, so entries that were hot long ago can be evicted again.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::cache_policy::CachePolicy;
use crate::config::LfuConfig;
use crate::error::ConfigError;
use crate::linked_list::{preallocation, List, NodeArena, NodeId};

struct Entry<K, V> {
    key: K,
    value: V,
    freq: u64,
}

struct LfuState<K, V, S> {
    map: HashMap<K, NodeId, S>,
    arena: NodeArena<Entry<K, V>>,
    buckets: HashMap<u64, List>,
    min_freq: u64,
    total_freq: u64,
}

impl<K, V, S> LfuState<K, V, S>
where
    K: Clone + Debug + Hash + Eq,
    S: BuildHasher,
{
    fn new(capacity: usize, hash_builder: S) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(preallocation(capacity), hash_builder),
            arena: NodeArena::with_capacity(capacity),
            buckets: HashMap::new(),
            min_freq: 1,
            total_freq: 0,
        }
    }

    fn average(&self) -> u64 {
        match self.map.len() as u64 {
            0 => 0,
            len => self.total_freq / len,
        }
    }

    fn link(&mut self, id: NodeId, freq: u64) {
        let arena = &mut self.arena;
        let bucket = self.buckets.entry(freq).or_insert_with(|| arena.new_list());
        arena.push_back(bucket, id);
    }

    // Unlinks `id` from its bucket, dropping the bucket once it is empty.
    // Returns whether the bucket was emptied.
    fn unlink(&mut self, id: NodeId, freq: u64) -> bool {
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return false;
        };
        self.arena.unlink(bucket, id);
        if !bucket.is_empty() {
            return false;
        }
        if let Some(bucket) = self.buckets.remove(&freq) {
            self.arena.release_list(bucket);
        }
        true
    }

    fn recompute_min_freq(&mut self) {
        self.min_freq = self.buckets.keys().copied().min().unwrap_or(1);
    }

    /// Moves `id` one frequency up and records the access.
    fn touch(&mut self, id: NodeId, max_average: u64) {
        let Some(freq) = self.arena.get(id).map(|entry| entry.freq) else {
            return;
        };
        let emptied = self.unlink(id, freq);
        if emptied && freq == self.min_freq {
            self.min_freq = freq + 1;
        }
        if let Some(entry) = self.arena.get_mut(id) {
            entry.freq = freq + 1;
        }
        self.link(id, freq + 1);
        self.record_access(max_average);
    }

    // A ceiling below 2 would lower frequencies by zero, so it never decays.
    fn record_access(&mut self, max_average: u64) {
        self.total_freq += 1;
        let step = max_average / 2;
        if step > 0 && self.average() > max_average {
            self.decay(step);
        }
    }

    fn decay(&mut self, step: u64) {
        let average = self.average();
        let mut freqs: Vec<u64> = self.buckets.keys().copied().collect();
        freqs.sort_unstable();

        // Ascending order keeps lower-frequency entries ahead of (older than)
        // higher ones when several old buckets collapse into one.
        for freq in freqs {
            let Some(mut bucket) = self.buckets.remove(&freq) else {
                continue;
            };
            let ids: Vec<NodeId> = self.arena.iter(&bucket).map(|(id, _)| id).collect();
            let lowered = freq.saturating_sub(step).max(1);
            for id in ids {
                self.arena.unlink(&mut bucket, id);
                if let Some(entry) = self.arena.get_mut(id) {
                    entry.freq = lowered;
                }
                self.link(id, lowered);
            }
            self.arena.release_list(bucket);
        }

        self.total_freq = self
            .buckets
            .iter()
            .map(|(freq, bucket)| freq * bucket.len() as u64)
            .sum();
        self.recompute_min_freq();
        debug!(
            "lfu: average frequency {} exceeded limit, lowered all frequencies by {} (new average {}, min {})",
            average,
            step,
            self.average(),
            self.min_freq
        );
    }

    fn evict(&mut self) -> bool {
        if !self.buckets.contains_key(&self.min_freq) {
            self.recompute_min_freq();
        }
        let min_freq = self.min_freq;
        let Some(id) = self
            .buckets
            .get(&min_freq)
            .and_then(|bucket| self.arena.front(bucket))
        else {
            return false;
        };
        self.unlink(id, min_freq);
        let Some(entry) = self.arena.free(id) else {
            return false;
        };
        trace!("lfu: evicting {:?} (freq {})", entry.key, entry.freq);
        self.map.remove(&entry.key);
        self.total_freq -= entry.freq;
        true
    }

    fn insert_new(&mut self, key: K, value: V, capacity: usize, max_average: u64) {
        while self.map.len() >= capacity {
            if !self.evict() {
                break;
            }
        }
        let id = self.arena.insert(Entry {
            key: key.clone(),
            value,
            freq: 1,
        });
        self.link(id, 1);
        self.map.insert(key, id);
        self.min_freq = 1;
        self.record_access(max_average);
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.map.remove(key)?;
        let freq = self.arena.get(id)?.freq;
        let emptied = self.unlink(id, freq);
        let entry = self.arena.free(id)?;
        self.total_freq -= entry.freq;
        if emptied && freq == self.min_freq {
            self.recompute_min_freq();
        }
        Some(entry.value)
    }
}

/// A thread-safe LFU cache.
///
/// Hits move an entry into the next frequency bucket in O(1); misses that
/// find the cache full evict the least recently touched entry of the lowest
/// frequency. See the [module docs](self) for the decay rule.
///
/// # Examples
///
/// ```rust
/// use policy_cache::LfuCache;
///
/// let cache = LfuCache::new(2);
/// cache.put(1, "a");
/// cache.put(2, "b");
/// for _ in 0..5 {
///     cache.get(&1);
/// }
/// cache.put(3, "c");
/// assert_eq!(cache.get(&2), None);
/// assert_eq!(cache.frequency(&1), Some(6));
/// ```
pub struct LfuCache<K, V, S = RandomState>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    cap: usize,
    max_average_num: u64,
    state: Mutex<LfuState<K, V, S>>,
}

impl<K, V> LfuCache<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Creates a cache with the default decay ceiling of 10.
    pub fn new(capacity: usize) -> Self {
        Self::with_max_average(capacity, LfuConfig::default().max_average_num)
    }

    pub fn with_max_average(capacity: usize, max_average_num: u64) -> Self {
        Self::with_hasher(capacity, max_average_num, RandomState::new())
    }

    pub fn from_config(config: LfuConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_max_average(config.capacity, config.max_average_num))
    }
}

impl<K, V, S> LfuCache<K, V, S>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub fn with_hasher(capacity: usize, max_average_num: u64, hash_builder: S) -> Self {
        Self {
            cap: capacity,
            max_average_num,
            state: Mutex::new(LfuState::new(capacity, hash_builder)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn max_average_num(&self) -> u64 {
        self.max_average_num
    }

    /// Retrieves a value and bumps the entry's frequency.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let id = *state.map.get(key)?;
        let value = state.arena.get(id)?.value.clone();
        state.touch(id, self.max_average_num);
        Some(value)
    }

    /// Inserts a new entry at frequency 1, or overwrites an existing one and
    /// counts the write as an access.
    pub fn put(&self, key: K, value: V) {
        if self.cap == 0 {
            return;
        }
        let mut state = self.state.lock();
        if let Some(&id) = state.map.get(&key) {
            if let Some(entry) = state.arena.get_mut(id) {
                entry.value = value;
            }
            state.touch(id, self.max_average_num);
            return;
        }
        state.insert_new(key, value, self.cap, self.max_average_num);
    }

    /// Removes `key`, returning its value if it was cached.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.state.lock().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().map.contains_key(key)
    }

    /// Current frequency of `key`, without counting this as an access.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let state = self.state.lock();
        let id = *state.map.get(key)?;
        state.arena.get(id).map(|entry| entry.freq)
    }

    /// Lowest frequency held by any entry (1 when empty).
    pub fn min_frequency(&self) -> u64 {
        self.state.lock().min_freq
    }

    /// Integer average of all entries' frequencies.
    pub fn average_frequency(&self) -> u64 {
        self.state.lock().average()
    }

    pub fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().map.is_empty()
    }

    /// Drops every entry together with the frequency buckets and counters.
    pub fn purge(&self) {
        let mut state = self.state.lock();
        let LfuState {
            map,
            arena,
            buckets,
            min_freq,
            total_freq,
        } = &mut *state;
        map.clear();
        buckets.clear();
        *arena = NodeArena::new();
        *min_freq = 1;
        *total_freq = 0;
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let state = self.state.lock();
        assert!(state.map.len() <= self.cap);
        assert_eq!(state.arena.len(), state.map.len());

        let mut linked = 0usize;
        let mut total = 0u64;
        for (&freq, bucket) in &state.buckets {
            assert!(!bucket.is_empty(), "empty bucket {} kept", freq);
            state.arena.debug_validate_list(bucket);
            for (id, entry) in state.arena.iter(bucket) {
                assert_eq!(entry.freq, freq);
                assert_eq!(state.map.get(&entry.key), Some(&id));
            }
            linked += bucket.len();
            total += freq * bucket.len() as u64;
        }
        assert_eq!(linked, state.map.len());
        assert_eq!(total, state.total_freq);
        if !state.map.is_empty() {
            assert_eq!(Some(state.min_freq), state.buckets.keys().copied().min());
        }
    }
}

impl<K, V, S> CachePolicy<K, V> for LfuCache<K, V, S>
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

    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    fn capacity(&self) -> usize {
        self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_evicts_least_frequent() {
        let cache = LfuCache::with_max_average(2, 10);
        cache.put(1, "a");
        cache.put(2, "b");
        for _ in 0..5 {
            assert_eq!(cache.get(&1), Some("a"));
        }
        assert_eq!(cache.frequency(&1), Some(6));
        assert_eq!(cache.frequency(&2), Some(1));

        cache.put(3, "c");
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&3), Some("c"));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_ties_break_by_recency() {
        let cache = LfuCache::new(3);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(3, 3);
        cache.get(&1);
        cache.get(&2);
        // 1 and 2 share frequency 2; 3 is alone at 1.
        cache.put(4, 4);
        assert!(!cache.contains(&3));
        cache.get(&4);
        // All at frequency 2 now; 1 was touched there first.
        cache.put(5, 5);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&4));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_min_freq_follows_hits() {
        let cache = LfuCache::new(4);
        cache.put("a", 1);
        assert_eq!(cache.min_frequency(), 1);
        cache.get(&"a");
        assert_eq!(cache.min_frequency(), 2);
        cache.put("b", 2);
        assert_eq!(cache.min_frequency(), 1);
        cache.remove(&"b");
        assert_eq!(cache.min_frequency(), 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_put_existing_counts_as_access() {
        let cache = LfuCache::new(2);
        cache.put(1, "a");
        cache.put(1, "b");
        assert_eq!(cache.frequency(&1), Some(2));
        assert_eq!(cache.get(&1), Some("b"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_decay_lowers_frequencies() {
        let cache = LfuCache::with_max_average(2, 4);
        cache.put(1, ());
        cache.put(2, ());
        // The 8th hit on key 1 brings the total to 10, and 10 / 2 > 4.
        for _ in 0..7 {
            cache.get(&1);
        }
        assert_eq!(cache.frequency(&1), Some(8));
        cache.get(&1);
        // Key 1 went to 9, then lost 2; key 2 stays floored at 1.
        assert_eq!(cache.frequency(&1), Some(7));
        assert_eq!(cache.frequency(&2), Some(1));
        assert_eq!(cache.average_frequency(), 4);
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_decay_lets_stale_entries_be_evicted() {
        let cache = LfuCache::with_max_average(2, 2);
        cache.put("old", 0);
        for _ in 0..20 {
            cache.get(&"old");
        }
        let old_freq = cache.frequency(&"old").unwrap();
        assert!(old_freq <= 3, "frequency {} was never decayed", old_freq);

        cache.put("new", 1);
        for _ in 0..4 {
            cache.get(&"new");
        }
        cache.put("third", 2);
        assert!(!cache.contains(&"old"));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_purge() {
        let cache = LfuCache::new(4);
        for i in 0..4 {
            cache.put(i, i);
            cache.get(&i);
        }
        cache.purge();
        assert!(cache.is_empty());
        assert_eq!(cache.min_frequency(), 1);
        assert_eq!(cache.average_frequency(), 0);
        cache.put(9, 9);
        assert_eq!(cache.get(&9), Some(9));
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_zero_capacity() {
        let cache = LfuCache::new(0);
        cache.put(1, 1);
        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = LfuConfig { capacity: 3, max_average_num: 0 };
        assert!(matches!(
            LfuCache::<u8, u8>::from_config(config),
            Err(ConfigError::ZeroMaxAverage)
        ));
        let cache = LfuCache::<u8, u8>::from_config(LfuConfig { capacity: 3, max_average_num: 6 }).unwrap();
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.max_average_num(), 6);
    }

    #[test]
    fn test_random_workload_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let cache = LfuCache::with_max_average(32, 5);
        for _ in 0..10_000 {
            let key = rng.gen_range(0..96u32);
            match rng.gen_range(0..10) {
                0..=3 => cache.put(key, key),
                4..=8 => {
                    if let Some(v) = cache.get(&key) {
                        assert_eq!(v, key);
                    }
                }
                _ => {
                    cache.remove(&key);
                }
            }
            assert!(cache.len() <= 32);
        }
        cache.debug_validate_invariants();
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(LfuCache::new(64));
        let handles: Vec<_> = (0..6u64)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000u64 {
                        let key = (t * 31 + i) % 128;
                        if i % 3 == 0 {
                            cache.put(key, key * 2);
                        } else if let Some(v) = cache.get(&key) {
                            assert_eq!(v, key * 2);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 64);
        cache.debug_validate_invariants();
    }
}
