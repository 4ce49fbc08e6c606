use std::fmt::Debug;
use std::hash::Hash;

/// The core trait shared by every eviction policy in this crate.
///
/// All methods take `&self`: each implementation guards its state with its
/// own lock(s), so a cache can be shared between threads behind an `Arc`.
///
/// # Type Parameters
///
/// * `K` - The type of keys used in the cache. Must implement `Clone + Debug + Hash + Eq + Send + Sync + 'static`
/// * `V` - The type of values stored in the cache. Must implement `Clone + Debug + Send + Sync + 'static`
pub trait CachePolicy<K, V>: Send + Sync
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Inserts a key-value pair, or overwrites the value of an existing key.
    ///
    /// Does nothing when the cache was built with a capacity of zero.
    fn put(&self, key: K, value: V);

    /// Looks up a key.
    ///
    /// # Returns
    ///
    /// * `Some(V)` - a clone of the cached value; the access is recorded by the policy
    /// * `None` if the key is not cached
    fn get(&self, key: &K) -> Option<V>;

    /// Looks up a key, falling back to `V::default()` on a miss.
    ///
    /// Use [`get`](CachePolicy::get) when a miss must be told apart from a
    /// stored default value.
    fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Returns the number of occupied slots.
    ///
    /// For every policy but [`ArcCache`](crate::ArcCache) this is the number
    /// of cached keys. ARC may hold one key in both of its parts, and such a
    /// key occupies, and counts as, two slots.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured upper bound on [`len`](CachePolicy::len).
    fn capacity(&self) -> usize;
}
