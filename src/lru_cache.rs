use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};

use log::trace;
use parking_lot::Mutex;

use crate::cache_policy::CachePolicy;
use crate::linked_list::{preallocation, List, NodeArena, NodeId};

struct Entry<K, V> {
    key: K,
    value: V,
}

// Map and list always change together under the cache's mutex.
struct LruState<K, V, S> {
    map: HashMap<K, NodeId, S>,
    arena: NodeArena<Entry<K, V>>,
    list: List,
}

impl<K, V, S> LruState<K, V, S>
where
    K: Clone + Debug + Hash + Eq,
    S: BuildHasher,
{
    fn new(capacity: usize, hash_builder: S) -> Self {
        // The list's two sentinels take arena slots as well.
        let mut arena = NodeArena::with_capacity(capacity.saturating_add(2));
        let list = arena.new_list();
        Self {
            map: HashMap::with_capacity_and_hasher(preallocation(capacity), hash_builder),
            arena,
            list,
        }
    }

    fn touch(&mut self, id: NodeId) -> Option<&mut Entry<K, V>> {
        self.arena.move_to_back(&mut self.list, id);
        self.arena.get_mut(id)
    }

    fn evict_least_recent(&mut self) -> bool {
        match self.arena.pop_front(&mut self.list) {
            Some(entry) => {
                trace!("lru: evicting {:?}", entry.key);
                self.map.remove(&entry.key);
                true
            }
            None => false,
        }
    }

    fn insert_new(&mut self, key: K, value: V, capacity: usize) {
        while self.map.len() >= capacity {
            if !self.evict_least_recent() {
                break;
            }
        }
        let id = self.arena.insert(Entry {
            key: key.clone(),
            value,
        });
        self.arena.push_back(&mut self.list, id);
        self.map.insert(key, id);
    }

    fn clear(&mut self) {
        let mut arena = NodeArena::new();
        self.list = arena.new_list();
        self.arena = arena;
        self.map.clear();
    }
}

/// A thread-safe LRU cache.
///
/// A `HashMap` gives O(1) lookup of a key's node and an arena-backed
/// doubly linked list keeps recency order: the node right after the head
/// sentinel is the least recently used and is evicted first, hits and
/// inserts are relinked in front of the tail sentinel.
///
/// # Type Parameters
///
/// * `K` - The type of keys used in the cache. Must implement `Clone + Debug + Hash + Eq + Send + Sync + 'static`
/// * `V` - The type of values stored in the cache. Must implement `Clone + Debug + Send + Sync + 'static`
/// * `S` - The hasher used for the key map
///
/// # Examples
///
/// ```rust
/// use policy_cache::LruCache;
///
/// let cache = LruCache::new(2);
/// cache.put("key1".to_string(), "value1".to_string());
/// assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
/// ```
pub struct LruCache<K, V, S = RandomState>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    cap: usize,
    state: Mutex<LruState<K, V, S>>,
}

impl<K, V> LruCache<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is accepted: `put` becomes a no-op and every
    /// `get` misses.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub fn with_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            cap: capacity,
            state: Mutex::new(LruState::new(capacity, hash_builder)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Retrieves a value and marks the entry as most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let id = *state.map.get(key)?;
        state.touch(id).map(|entry| entry.value.clone())
    }

    /// Inserts or overwrites `key`, marking it most recently used.
    ///
    /// When the cache is full the least recently used entry is evicted
    /// before the new one is linked in.
    pub fn put(&self, key: K, value: V) {
        if self.cap == 0 {
            return;
        }
        let mut state = self.state.lock();
        if let Some(&id) = state.map.get(&key) {
            if let Some(entry) = state.touch(id) {
                entry.value = value;
            }
            return;
        }
        state.insert_new(key, value, self.cap);
    }

    /// Overwrites the value of `key` only if it is already cached.
    ///
    /// Gives the value back when the key is absent, so the caller can
    /// decide where it goes instead.
    pub fn update_existing(&self, key: &K, value: V) -> Result<(), V> {
        let mut state = self.state.lock();
        let Some(&id) = state.map.get(key) else {
            return Err(value);
        };
        match state.touch(id) {
            Some(entry) => {
                entry.value = value;
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Stores `f(current)` under `key` in a single critical section and
    /// returns the new value.
    ///
    /// With a capacity of zero nothing is stored, but the computed value
    /// is still returned.
    pub fn update_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce(Option<&V>) -> V,
    {
        let mut state = self.state.lock();
        if let Some(&id) = state.map.get(&key) {
            if let Some(entry) = state.touch(id) {
                let next = f(Some(&entry.value));
                entry.value = next.clone();
                return next;
            }
        }
        let next = f(None);
        if self.cap > 0 {
            state.insert_new(key, next.clone(), self.cap);
        }
        next
    }

    /// Removes `key`, returning its value if it was cached.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let id = state.map.remove(key)?;
        let LruState { arena, list, .. } = &mut *state;
        arena.remove(list, id).map(|entry| entry.value)
    }

    /// Reads a value without touching its recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        let state = self.state.lock();
        let id = *state.map.get(key)?;
        state.arena.get(id).map(|entry| entry.value.clone())
    }

    /// Returns whether `key` is cached without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().map.is_empty()
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        self.state.lock().clear();
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<K> {
        let state = self.state.lock();
        state
            .arena
            .iter(&state.list)
            .map(|(_, entry)| entry.key.clone())
            .collect()
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let state = self.state.lock();
        state.arena.debug_validate_list(&state.list);
        assert_eq!(state.map.len(), state.list.len());
        assert_eq!(state.arena.len(), state.list.len());
        assert!(state.map.len() <= self.cap);
        for (key, &id) in &state.map {
            assert!(state.arena.is_linked_in(&state.list, id));
            let entry = state.arena.get(id).expect("mapped node is live");
            assert_eq!(&entry.key, key);
        }
    }
}

impl<K, V, S> CachePolicy<K, V> for LruCache<K, V, S>
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
