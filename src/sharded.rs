//! Hash-sharded wrappers around [`LruCache`] and [`LfuCache`].
//!
//! One logical cache of capacity `C` is split into `N` independent caches of
//! capacity `ceil(C / N)` each. A key always lives in shard
//! `hash(key) % N`; every operation locks only that shard, so threads working
//! on keys in different shards never contend. There is no global lock and no
//! ordering between shards.
//!
//! Because of the rounding, the shards together may hold up to
//! `N * ceil(C / N)` entries, slightly more than `C`.

use std::collections::hash_map::RandomState;
use std::fmt::Debug;
use std::hash::{BuildHasher, Hash, Hasher};

use log::debug;

use crate::cache_policy::CachePolicy;
use crate::config::{LfuConfig, ShardConfig};
use crate::error::ConfigError;
use crate::lfu_cache::LfuCache;
use crate::lru_cache::LruCache;

/// Maps keys to shard indices with an injected hasher.
///
/// The same router (and therefore the same hasher state) is used for the
/// lifetime of a cache, so a key is always routed to the same shard.
#[derive(Debug, Clone)]
pub struct ShardRouter<S = RandomState> {
    hash_builder: S,
    shards: usize,
}

impl<S: BuildHasher> ShardRouter<S> {
    pub fn new(shards: usize, hash_builder: S) -> Self {
        Self {
            hash_builder,
            shards: shards.max(1),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards
    }

    pub fn shard_for<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards as u64) as usize
    }
}

/// A sharded LRU cache for high-concurrency scenarios.
///
/// # Examples
///
/// ```rust
/// use policy_cache::ShardedLruCache;
///
/// let cache = ShardedLruCache::new(1000, 8);
/// cache.put("key1".to_string(), "value1".to_string());
/// assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
/// assert_eq!(cache.shard_count(), 8);
/// ```
pub struct ShardedLruCache<K, V, S = RandomState>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    shards: Vec<LruCache<K, V, S>>,
    router: ShardRouter<S>,
    total_capacity: usize,
}

impl<K, V> ShardedLruCache<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Creates a cache of total `capacity` split over `shard_count` shards.
    ///
    /// A `shard_count` of zero means one shard per available hardware
    /// thread, resolved once here.
    pub fn new(capacity: usize, shard_count: usize) -> Self {
        Self::from_config(ShardConfig {
            capacity,
            shard_count,
        })
    }

    pub fn from_config(config: ShardConfig) -> Self {
        Self::with_hasher(config, RandomState::new())
    }
}

impl<K, V, S> ShardedLruCache<K, V, S>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub fn with_hasher(config: ShardConfig, hash_builder: S) -> Self {
        let num_shards = config.resolved_shard_count();
        let shard_capacity = config.shard_capacity(num_shards);
        debug!(
            "sharded lru: {} shards of capacity {} (total {})",
            num_shards, shard_capacity, config.capacity
        );

        let shards = (0..num_shards)
            .map(|_| LruCache::with_hasher(shard_capacity, hash_builder.clone()))
            .collect();

        Self {
            shards,
            router: ShardRouter::new(num_shards, hash_builder),
            total_capacity: config.capacity,
        }
    }

    /// Returns the total capacity the cache was configured with.
    pub fn capacity(&self) -> usize {
        self.total_capacity
    }

    /// Returns the number of shards in the cache.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Capacity of each individual shard.
    pub fn shard_capacity(&self) -> usize {
        self.shards.first().map_or(0, LruCache::capacity)
    }

    /// Index of the shard responsible for `key`.
    pub fn shard_index(&self, key: &K) -> usize {
        self.router.shard_for(key)
    }

    fn shard(&self, key: &K) -> &LruCache<K, V, S> {
        &self.shards[self.shard_index(key)]
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).get(key)
    }

    pub fn put(&self, key: K, value: V) {
        self.shard(&key).put(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).contains(key)
    }

    /// Returns the number of entries in the cache.
    ///
    /// Shards are visited one after another, so under concurrent writes the
    /// sum is not a snapshot.
    pub fn len(&self) -> usize {
        self.shards.iter().map(LruCache::len).sum()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(LruCache::is_empty)
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.clear();
        }
    }
}

impl<K, V, S> CachePolicy<K, V> for ShardedLruCache<K, V, S>
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

/// A sharded LFU cache; every shard runs its own decay independently.
///
/// # Examples
///
/// ```rust
/// use policy_cache::ShardedLfuCache;
///
/// let cache = ShardedLfuCache::new(64, 4, 10);
/// cache.put(1, "one");
/// assert_eq!(cache.get(&1), Some("one"));
/// cache.purge();
/// assert!(cache.is_empty());
/// ```
pub struct ShardedLfuCache<K, V, S = RandomState>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    shards: Vec<LfuCache<K, V, S>>,
    router: ShardRouter<S>,
    total_capacity: usize,
}

impl<K, V> ShardedLfuCache<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Creates a cache of total `capacity` split over `shard_count` shards
    /// (zero meaning one per hardware thread), each decaying at
    /// `max_average_num`.
    pub fn new(capacity: usize, shard_count: usize, max_average_num: u64) -> Self {
        Self::with_hasher(
            ShardConfig {
                capacity,
                shard_count,
            },
            max_average_num,
            RandomState::new(),
        )
    }

    /// Builds from a shard layout plus the per-shard LFU settings; the LFU
    /// config's own `capacity` is ignored in favour of the shard split.
    pub fn from_config(shards: ShardConfig, lfu: LfuConfig) -> Result<Self, ConfigError> {
        lfu.validate()?;
        Ok(Self::with_hasher(shards, lfu.max_average_num, RandomState::new()))
    }
}

impl<K, V, S> ShardedLfuCache<K, V, S>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub fn with_hasher(config: ShardConfig, max_average_num: u64, hash_builder: S) -> Self {
        let num_shards = config.resolved_shard_count();
        let shard_capacity = config.shard_capacity(num_shards);
        debug!(
            "sharded lfu: {} shards of capacity {} (total {})",
            num_shards, shard_capacity, config.capacity
        );

        let shards = (0..num_shards)
            .map(|_| LfuCache::with_hasher(shard_capacity, max_average_num, hash_builder.clone()))
            .collect();

        Self {
            shards,
            router: ShardRouter::new(num_shards, hash_builder),
            total_capacity: config.capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.total_capacity
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_capacity(&self) -> usize {
        self.shards.first().map_or(0, LfuCache::capacity)
    }

    pub fn shard_index(&self, key: &K) -> usize {
        self.router.shard_for(key)
    }

    fn shard(&self, key: &K) -> &LfuCache<K, V, S> {
        &self.shards[self.shard_index(key)]
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).get(key)
    }

    pub fn put(&self, key: K, value: V) {
        self.shard(&key).put(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).contains(key)
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.shard(key).frequency(key)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(LfuCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(LfuCache::is_empty)
    }

    /// Purges every shard.
    pub fn purge(&self) {
        for shard in &self.shards {
            shard.purge();
        }
    }
}

impl<K, V, S> CachePolicy<K, V> for ShardedLfuCache<K, V, S>
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
