use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::{BuildHasher, Hash};

use log::trace;
use parking_lot::Mutex;

use super::node::ArcNode;
use crate::linked_list::{preallocation, List, NodeArena, NodeId};

/// Which side of the ARC cache a part plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartKind {
    /// Entries admitted on first sight; counts hits towards promotion.
    Recency,
    /// Entries dual-written on admission or promoted after enough hits.
    Frequency,
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartKind::Recency => f.write_str("lru part"),
            PartKind::Frequency => f.write_str("lfu part"),
        }
    }
}

/// A hit in one part: the value and whether it has earned promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hit<V> {
    pub value: V,
    pub promote: bool,
}

struct PartState<K, V, S> {
    capacity: usize,
    main: HashMap<K, NodeId, S>,
    ghost: HashMap<K, NodeId, S>,
    arena: NodeArena<ArcNode<K, V>>,
    main_list: List,
    ghost_list: List,
}

impl<K, V, S> PartState<K, V, S>
where
    K: Clone + Debug + Hash + Eq,
    S: BuildHasher + Clone,
{
    fn new(capacity: usize, ghost_capacity: usize, hash_builder: S) -> Self {
        let mut arena = NodeArena::with_capacity(capacity.saturating_add(ghost_capacity));
        let main_list = arena.new_list();
        let ghost_list = arena.new_list();
        Self {
            capacity,
            main: HashMap::with_capacity_and_hasher(preallocation(capacity), hash_builder.clone()),
            ghost: HashMap::with_capacity_and_hasher(preallocation(ghost_capacity), hash_builder),
            arena,
            main_list,
            ghost_list,
        }
    }

    fn drop_ghost(&mut self, key: &K) -> bool {
        match self.ghost.remove(key) {
            Some(id) => {
                self.arena.remove(&mut self.ghost_list, id);
                true
            }
            None => false,
        }
    }

    // Moves the least recent main entry into the ghost list.
    fn evict_least_recent(&mut self, kind: PartKind, ghost_capacity: usize) -> bool {
        let Some(id) = self.arena.front(&self.main_list) else {
            return false;
        };
        self.arena.unlink(&mut self.main_list, id);
        let Some(key) = self.arena.get_mut(id).map(|node| {
            node.into_ghost();
            node.key().clone()
        }) else {
            return false;
        };
        self.main.remove(&key);
        trace!("arc {}: {:?} moved to ghost list", kind, key);

        if ghost_capacity == 0 {
            self.arena.free(id);
            return true;
        }
        while self.ghost.len() >= ghost_capacity {
            match self.arena.pop_front(&mut self.ghost_list) {
                Some(oldest) => {
                    self.ghost.remove(oldest.key());
                }
                None => break,
            }
        }
        self.arena.push_back(&mut self.ghost_list, id);
        self.ghost.insert(key, id);
        true
    }
}

/// One half of an [`ArcCache`](super::ArcCache): a capacity-bounded recency
/// list plus a ghost list remembering recently evicted keys.
///
/// Both halves share this structure. The recency part additionally reports
/// when an entry's hit count reaches the promotion threshold.
pub(crate) struct ArcPart<K, V, S> {
    kind: PartKind,
    ghost_capacity: usize,
    min_capacity: usize,
    transform_threshold: usize,
    state: Mutex<PartState<K, V, S>>,
}

impl<K, V, S> ArcPart<K, V, S>
where
    K: Clone + Debug + Hash + Eq,
    V: Clone,
    S: BuildHasher + Clone,
{
    pub(crate) fn new(
        kind: PartKind,
        capacity: usize,
        ghost_capacity: usize,
        transform_threshold: usize,
        hash_builder: S,
    ) -> Self {
        Self {
            kind,
            ghost_capacity,
            // A part that starts non-empty never gets starved to zero.
            min_capacity: capacity.min(1),
            transform_threshold,
            state: Mutex::new(PartState::new(capacity, ghost_capacity, hash_builder)),
        }
    }

    /// Writes `key` into the main list, evicting into the ghost list when
    /// full. Returns `false` only when the part has no capacity at all.
    pub(crate) fn put(&self, key: K, value: V) -> bool {
        let mut state = self.state.lock();
        if state.capacity == 0 {
            return false;
        }
        if let Some(&id) = state.main.get(&key) {
            let PartState {
                arena, main_list, ..
            } = &mut *state;
            arena.move_to_back(main_list, id);
            if let Some(node) = arena.get_mut(id) {
                node.set_value(value);
            }
            return true;
        }

        state.drop_ghost(&key);
        while state.main.len() >= state.capacity {
            if !state.evict_least_recent(self.kind, self.ghost_capacity) {
                break;
            }
        }
        let id = state.arena.insert(ArcNode::new(key.clone(), value));
        let PartState {
            arena, main_list, ..
        } = &mut *state;
        arena.push_back(main_list, id);
        state.main.insert(key, id);
        true
    }

    /// Looks `key` up in the main list, refreshing its recency and hit count.
    pub(crate) fn get(&self, key: &K) -> Option<Hit<V>> {
        let mut state = self.state.lock();
        let id = *state.main.get(key)?;
        let PartState {
            arena, main_list, ..
        } = &mut *state;
        arena.move_to_back(main_list, id);
        let node = arena.get_mut(id)?;
        let count = node.record_access();
        let value = node.value()?.clone();
        let promote = self.kind == PartKind::Recency && count >= self.transform_threshold;
        Some(Hit { value, promote })
    }

    /// Claims a ghost entry for `key`, returning whether one existed.
    pub(crate) fn check_ghost(&self, key: &K) -> bool {
        self.state.lock().drop_ghost(key)
    }

    pub(crate) fn increase_capacity(&self) {
        self.state.lock().capacity += 1;
    }

    /// Gives up one slot, evicting into the ghost list first if the main
    /// list is full. Fails at the part's minimum capacity.
    pub(crate) fn decrease_capacity(&self) -> bool {
        let mut state = self.state.lock();
        if state.capacity <= self.min_capacity {
            return false;
        }
        if state.main.len() >= state.capacity {
            state.evict_least_recent(self.kind, self.ghost_capacity);
        }
        state.capacity -= 1;
        true
    }

    /// Replaces the value of a resident `key` without touching its recency.
    pub(crate) fn update_value(&self, key: &K, value: V) -> bool {
        let mut state = self.state.lock();
        let Some(&id) = state.main.get(key) else {
            return false;
        };
        match state.arena.get_mut(id) {
            Some(node) => {
                node.set_value(value);
                true
            }
            None => false,
        }
    }

    /// Drops `key` from the main list and forgets any ghost of it.
    pub(crate) fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        state.drop_ghost(key);
        let id = state.main.remove(key)?;
        let PartState {
            arena, main_list, ..
        } = &mut *state;
        arena.remove(main_list, id).and_then(|mut node| node.into_ghost())
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.state.lock().main.contains_key(key)
    }

    pub(crate) fn access_count(&self, key: &K) -> Option<usize> {
        let state = self.state.lock();
        let id = *state.main.get(key)?;
        state.arena.get(id).map(ArcNode::access_count)
    }

    /// Resident keys, least recent first.
    pub(crate) fn keys(&self) -> Vec<K> {
        let state = self.state.lock();
        state
            .arena
            .iter(&state.main_list)
            .map(|(_, node)| node.key().clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().main.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    pub(crate) fn ghost_len(&self) -> usize {
        self.state.lock().ghost.len()
    }

    #[cfg(test)]
    pub(crate) fn contains_ghost(&self, key: &K) -> bool {
        self.state.lock().ghost.contains_key(key)
    }

    /// Drops all entries and ghosts; the capacity is set to `capacity`.
    pub(crate) fn reset(&self, capacity: usize) {
        let mut state = self.state.lock();
        let hash_builder = state.main.hasher().clone();
        *state = PartState::new(capacity, self.ghost_capacity, hash_builder);
    }

    #[cfg(any(test, debug_assertions))]
    pub(crate) fn debug_validate_invariants(&self) {
        let state = self.state.lock();
        state.arena.debug_validate_list(&state.main_list);
        state.arena.debug_validate_list(&state.ghost_list);
        assert!(state.main.len() <= state.capacity);
        assert!(state.ghost.len() <= self.ghost_capacity);
        assert_eq!(state.main.len(), state.main_list.len());
        assert_eq!(state.ghost.len(), state.ghost_list.len());
        assert_eq!(state.arena.len(), state.main.len() + state.ghost.len());
        for (key, &id) in &state.main {
            assert!(state.arena.is_linked_in(&state.main_list, id));
            let node = state.arena.get(id).expect("main node is live");
            assert_eq!(node.key(), key);
            assert!(!node.is_ghost());
            assert!(!state.ghost.contains_key(key));
        }
        for (key, &id) in &state.ghost {
            assert!(state.arena.is_linked_in(&state.ghost_list, id));
            let node = state.arena.get(id).expect("ghost node is live");
            assert_eq!(node.key(), key);
            assert!(node.is_ghost());
        }
    }
}
