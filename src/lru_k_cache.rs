use std::collections::hash_map::RandomState;
use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};

use log::debug;

use crate::cache_policy::CachePolicy;
use crate::config::LruKConfig;
use crate::error::ConfigError;
use crate::lru_cache::LruCache;

/// An LRU cache that only admits keys after `k` observations.
///
/// Next to the bounded main cache sits a second LRU cache, the history,
/// mapping keys to how often they have been seen. Both `get` and `put` of a
/// key that is not in the main cache bump its counter; once a `put` finds the
/// counter at `k` or more, the key leaves the history and enters the main
/// cache. One-off keys therefore never push hot entries out.
///
/// The history is bounded too. A cold key whose counter gets evicted from it
/// starts counting from zero again.
///
/// Each of the two inner caches has its own lock and no operation holds both
/// at once.
///
/// # Examples
///
/// ```rust
/// use policy_cache::LruKCache;
///
/// let cache = LruKCache::new(2, 10, 2);
/// cache.put(1, "one");
/// assert_eq!(cache.get(&1), None);
/// cache.put(1, "one");
/// assert_eq!(cache.get(&1), Some("one"));
/// ```
pub struct LruKCache<K, V, S = RandomState>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    main: LruCache<K, V, S>,
    history: LruCache<K, usize, S>,
    k: usize,
}

impl<K, V> LruKCache<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Creates a cache with a main capacity, a history capacity and the
    /// admission threshold `k`.
    ///
    /// A `k` of zero is raised to 1, so the first `put` admits the key.
    /// [`from_config`](Self::from_config) rejects it instead.
    pub fn new(capacity: usize, history_capacity: usize, k: usize) -> Self {
        Self::with_hasher(capacity, history_capacity, k, RandomState::new())
    }

    pub fn from_config(config: LruKConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.capacity, config.history_capacity, config.k))
    }
}

impl<K, V, S> LruKCache<K, V, S>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub fn with_hasher(capacity: usize, history_capacity: usize, k: usize, hash_builder: S) -> Self {
        Self {
            main: LruCache::with_hasher(capacity, hash_builder.clone()),
            history: LruCache::with_hasher(history_capacity, hash_builder),
            k: k.max(1),
        }
    }

    fn observe(&self, key: K) -> usize {
        self.history
            .update_or_insert_with(key, |count| count.map_or(1, |count| count + 1))
    }

    /// Records an observation of `key` and looks it up in the main cache.
    ///
    /// Misses until the key has been admitted by a `put`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.observe(key.clone());
        self.main.get(key)
    }

    /// Overwrites `key` if it is already admitted; otherwise counts the
    /// observation and admits the key once it has been seen `k` times.
    pub fn put(&self, key: K, value: V) {
        let value = match self.main.update_existing(&key, value) {
            Ok(()) => return,
            Err(value) => value,
        };

        let seen = self.observe(key.clone());
        if seen >= self.k {
            self.history.remove(&key);
            debug!("lru-k: admitting {:?} after {} observations", key, seen);
            self.main.put(key, value);
        }
    }

    /// Drops `key` from the main cache and forgets its history.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.history.remove(key);
        self.main.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.main.contains(key)
    }

    /// Observations recorded for a key that has not been admitted yet.
    pub fn history_count(&self, key: &K) -> Option<usize> {
        self.history.peek(key)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn capacity(&self) -> usize {
        self.main.capacity()
    }

    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    /// Empties both the main cache and the history.
    pub fn clear(&self) {
        self.main.clear();
        self.history.clear();
    }
}

impl<K, V, S> CachePolicy<K, V> for LruKCache<K, V, S>
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_gated_until_k_observations() {
        let cache = LruKCache::new(4, 16, 3);

        cache.put("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert!(!cache.contains(&"a"));
        // Two observations so far: one put, one get.
        cache.put("a", 2);
        assert!(cache.contains(&"a"));
        assert_eq!(cache.history_len(), 0);
        assert_eq!(cache.get(&"a"), Some(2));
    }

    #[test]
    fn test_puts_alone_admit_on_kth() {
        let cache = LruKCache::new(4, 16, 3);
        cache.put(1, "x");
        cache.put(1, "x");
        assert!(!cache.contains(&1));
        cache.put(1, "y");
        assert!(cache.contains(&1));
        assert_eq!(cache.get(&1), Some("y"));
    }

    #[test]
    fn test_admitted_key_is_overwritten_directly() {
        let cache = LruKCache::new(4, 16, 2);
        cache.put(1, 10);
        cache.put(1, 11);
        cache.put(1, 12);
        assert_eq!(cache.get(&1), Some(12));
        assert_eq!(cache.history_count(&1), Some(1));
    }

    #[test]
    fn test_one_off_keys_do_not_evict_hot_entries() {
        let cache = LruKCache::new(2, 64, 2);
        for key in [1, 2] {
            cache.put(key, key);
            cache.put(key, key);
        }
        for key in 100..140 {
            cache.put(key, key);
        }
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&2), Some(2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_history_eviction_resets_progress() {
        let cache = LruKCache::new(4, 2, 2);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c"); // pushes key 1's counter out of the history
        assert_eq!(cache.history_count(&1), None);
        cache.put(1, "a");
        assert!(!cache.contains(&1));
        cache.put(1, "a");
        assert!(cache.contains(&1));
    }

    #[test]
    fn test_from_config_rejects_zero_k() {
        let config = LruKConfig { k: 0, ..Default::default() };
        assert!(matches!(
            LruKCache::<u32, u32>::from_config(config),
            Err(ConfigError::ZeroK)
        ));
        let cache = LruKCache::<u32, u32>::from_config(LruKConfig::default()).unwrap();
        assert_eq!(cache.k(), 2);
    }

    #[test]
    fn test_zero_k_is_raised_to_one() {
        let cache = LruKCache::new(4, 8, 0);
        assert_eq!(cache.k(), 1);
        cache.put(1, "a");
        assert_eq!(cache.get(&1), Some("a"));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = LruKCache::new(4, 8, 1);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.remove(&1), Some(1));
        assert_eq!(cache.get(&1), None);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.history_len(), 0);
    }
}
