//! Arena-backed doubly linked lists with sentinel nodes.
//!
//! All nodes of every list owned by one cache live in a single [`NodeArena`]
//! and refer to each other by [`NodeId`] index instead of pointers. A [`List`]
//! is just a pair of sentinel ids plus a length, so one arena can back several
//! lists at once (a main list and a ghost list, or one list per frequency) and
//! nodes can move between them without being reallocated.
//!
//! ```text
//!   head ◄──► [a] ◄──► [b] ◄──► [c] ◄──► tail
//!   (LRU end)                        (MRU end)
//! ```
//!
//! The node right after `head` is the least recently linked one and is the
//! eviction candidate; [`NodeArena::push_back`] links at the `tail` end.
//!
//! Every mutating operation checks that the node is an entry linked into the
//! list it is given. A stale or foreign id makes the operation a no-op that
//! reports `false`/`None` instead of corrupting the links.

const NIL: usize = usize::MAX;

/// Most slots any cache reserves up front; beyond this, storage grows on
/// demand. A capacity is only a ceiling and may be as large as `usize::MAX`.
pub const MAX_PREALLOCATED: usize = 1024;

/// How many slots to reserve for a cache of `capacity` entries.
pub fn preallocation(capacity: usize) -> usize {
    capacity.min(MAX_PREALLOCATED)
}

/// Stable handle to a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
enum Payload<T> {
    Vacant,
    Sentinel,
    Entry(T),
}

#[derive(Debug)]
struct Node<T> {
    payload: Payload<T>,
    prev: usize,
    next: usize,
    // Head sentinel of the list this node is linked into, NIL when unlinked.
    owner: usize,
}

/// A sentinel-bounded list whose nodes are stored in a [`NodeArena`].
#[derive(Debug)]
pub struct List {
    head: usize,
    tail: usize,
    len: usize,
}

impl List {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Slab of list nodes addressed by [`NodeId`].
#[derive(Debug)]
pub struct NodeArena<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    entries: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            entries: 0,
        }
    }

    /// Reserves room for up to `capacity` nodes, bounded by
    /// [`MAX_PREALLOCATED`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(preallocation(capacity)),
            free: Vec::new(),
            entries: 0,
        }
    }

    /// Number of live entries (linked or not), sentinels excluded.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Allocates a head/tail sentinel pair and returns the empty list.
    pub fn new_list(&mut self) -> List {
        let head = self.alloc(Payload::Sentinel);
        let tail = self.alloc(Payload::Sentinel);
        self.nodes[head].next = tail;
        self.nodes[tail].prev = head;
        List { head, tail, len: 0 }
    }

    /// Frees a list's sentinels, along with any entries still linked into it.
    pub fn release_list(&mut self, list: List) {
        let mut current = self.nodes[list.head].next;
        while current != list.tail {
            let next = self.nodes[current].next;
            self.release(current);
            current = next;
        }
        self.release(list.head);
        self.release(list.tail);
    }

    /// Stores `value` in a fresh, unlinked entry node.
    pub fn insert(&mut self, value: T) -> NodeId {
        NodeId(self.alloc(Payload::Entry(value)))
    }

    /// Frees an unlinked entry and returns its value.
    pub fn free(&mut self, id: NodeId) -> Option<T> {
        if !self.is_entry(id.0) || self.nodes[id.0].owner != NIL {
            return None;
        }
        self.release(id.0)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.nodes.get(id.0) {
            Some(Node {
                payload: Payload::Entry(value),
                ..
            }) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.nodes.get_mut(id.0) {
            Some(Node {
                payload: Payload::Entry(value),
                ..
            }) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if `id` is an entry currently linked into `list`.
    pub fn is_linked_in(&self, list: &List, id: NodeId) -> bool {
        self.is_entry(id.0) && self.nodes[id.0].owner == list.head
    }

    /// Links an unlinked entry at the most-recent end of `list`.
    pub fn push_back(&mut self, list: &mut List, id: NodeId) -> bool {
        if !self.is_entry(id.0) || self.nodes[id.0].owner != NIL {
            return false;
        }
        let last = self.nodes[list.tail].prev;
        let node = &mut self.nodes[id.0];
        node.prev = last;
        node.next = list.tail;
        node.owner = list.head;
        self.nodes[last].next = id.0;
        self.nodes[list.tail].prev = id.0;
        list.len += 1;
        true
    }

    /// Detaches `id` from `list` without freeing it.
    pub fn unlink(&mut self, list: &mut List, id: NodeId) -> bool {
        if !self.is_linked_in(list, id) {
            return false;
        }
        let (prev, next) = (self.nodes[id.0].prev, self.nodes[id.0].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        let node = &mut self.nodes[id.0];
        node.prev = NIL;
        node.next = NIL;
        node.owner = NIL;
        list.len -= 1;
        true
    }

    /// Relinks `id` at the most-recent end of `list`.
    pub fn move_to_back(&mut self, list: &mut List, id: NodeId) -> bool {
        if !self.unlink(list, id) {
            return false;
        }
        self.push_back(list, id)
    }

    /// Unlinks `id` from `list` and frees it.
    pub fn remove(&mut self, list: &mut List, id: NodeId) -> Option<T> {
        if !self.unlink(list, id) {
            return None;
        }
        self.release(id.0)
    }

    /// The least recently linked entry, i.e. the one right after `head`.
    pub fn front(&self, list: &List) -> Option<NodeId> {
        let first = self.nodes[list.head].next;
        (first != list.tail).then_some(NodeId(first))
    }

    /// Unlinks and frees the least recently linked entry.
    pub fn pop_front(&mut self, list: &mut List) -> Option<T> {
        let id = self.front(list)?;
        self.remove(list, id)
    }

    /// Iterates `(id, value)` pairs from the least to the most recent end.
    pub fn iter<'a>(&'a self, list: &List) -> Iter<'a, T> {
        Iter {
            arena: self,
            current: self.nodes[list.head].next,
            tail: list.tail,
        }
    }

    fn is_entry(&self, index: usize) -> bool {
        matches!(
            self.nodes.get(index),
            Some(Node {
                payload: Payload::Entry(_),
                ..
            })
        )
    }

    fn alloc(&mut self, payload: Payload<T>) -> usize {
        if matches!(payload, Payload::Entry(_)) {
            self.entries += 1;
        }
        let node = Node {
            payload,
            prev: NIL,
            next: NIL,
            owner: NIL,
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) -> Option<T> {
        let node = &mut self.nodes[index];
        node.prev = NIL;
        node.next = NIL;
        node.owner = NIL;
        match std::mem::replace(&mut node.payload, Payload::Vacant) {
            Payload::Vacant => None,
            Payload::Sentinel => {
                self.free.push(index);
                None
            }
            Payload::Entry(value) => {
                self.free.push(index);
                self.entries -= 1;
                Some(value)
            }
        }
    }

    /// Walks `list` in both directions and asserts its links are coherent.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_list(&self, list: &List) {
        let head = &self.nodes[list.head];
        assert!(matches!(head.payload, Payload::Sentinel));
        assert_eq!(head.next == list.tail, list.len == 0);

        let mut count = 0usize;
        let mut prev = list.head;
        let mut current = head.next;
        while current != list.tail {
            let node = &self.nodes[current];
            assert!(matches!(node.payload, Payload::Entry(_)));
            assert_eq!(node.prev, prev);
            assert_eq!(node.owner, list.head);
            count += 1;
            assert!(count <= list.len, "list longer than its recorded length");
            prev = current;
            current = node.next;
        }
        assert_eq!(self.nodes[list.tail].prev, prev);
        assert_eq!(count, list.len);
    }
}

pub struct Iter<'a, T> {
    arena: &'a NodeArena<T>,
    current: usize,
    tail: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.tail {
            return None;
        }
        let node = &self.arena.nodes[self.current];
        let id = NodeId(self.current);
        self.current = node.next;
        match &node.payload {
            Payload::Entry(value) => Some((id, value)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(arena: &NodeArena<i32>, list: &List) -> Vec<i32> {
        arena.iter(list).map(|(_, v)| *v).collect()
    }

    #[test]
    fn test_push_and_pop_order() {
        let mut arena = NodeArena::new();
        let mut list = arena.new_list();
        assert!(list.is_empty());
        assert_eq!(arena.front(&list), None);

        for v in 1..=3 {
            let id = arena.insert(v);
            assert!(arena.push_back(&mut list, id));
        }
        assert_eq!(values(&arena, &list), vec![1, 2, 3]);
        assert_eq!(arena.pop_front(&mut list), Some(1));
        assert_eq!(values(&arena, &list), vec![2, 3]);
        assert_eq!(arena.len(), 2);
        arena.debug_validate_list(&list);
    }

    #[test]
    fn test_move_to_back() {
        let mut arena = NodeArena::new();
        let mut list = arena.new_list();
        let ids: Vec<_> = (1..=3)
            .map(|v| {
                let id = arena.insert(v);
                arena.push_back(&mut list, id);
                id
            })
            .collect();

        assert!(arena.move_to_back(&mut list, ids[0]));
        assert_eq!(values(&arena, &list), vec![2, 3, 1]);
        assert!(arena.move_to_back(&mut list, ids[0]));
        assert_eq!(values(&arena, &list), vec![2, 3, 1]);
        assert_eq!(arena.front(&list), Some(ids[1]));
        arena.debug_validate_list(&list);
    }

    #[test]
    fn test_nodes_move_between_lists() {
        let mut arena = NodeArena::new();
        let mut main = arena.new_list();
        let mut ghost = arena.new_list();
        let id = arena.insert(7);
        arena.push_back(&mut main, id);

        // Linked into `main`, so `ghost` operations must refuse it.
        assert!(!arena.unlink(&mut ghost, id));
        assert!(!arena.push_back(&mut ghost, id));

        assert!(arena.unlink(&mut main, id));
        assert!(arena.push_back(&mut ghost, id));
        assert!(main.is_empty());
        assert_eq!(values(&arena, &ghost), vec![7]);
        arena.debug_validate_list(&main);
        arena.debug_validate_list(&ghost);
    }

    #[test]
    fn test_stale_ids_are_no_ops() {
        let mut arena = NodeArena::new();
        let mut list = arena.new_list();
        let id = arena.insert(1);
        arena.push_back(&mut list, id);
        assert_eq!(arena.remove(&mut list, id), Some(1));

        assert_eq!(arena.remove(&mut list, id), None);
        assert!(!arena.move_to_back(&mut list, id));
        assert_eq!(arena.get(id), None);
        assert_eq!(arena.free(id), None);
        arena.debug_validate_list(&list);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut arena = NodeArena::with_capacity(4);
        let mut list = arena.new_list();
        let a = arena.insert(1);
        arena.push_back(&mut list, a);
        arena.remove(&mut list, a);
        let b = arena.insert(2);
        assert_eq!(a, b);
        assert_eq!(arena.free(b), Some(2));
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_huge_capacity_reserves_bounded_storage() {
        let mut arena = NodeArena::with_capacity(usize::MAX);
        assert!(arena.nodes.capacity() <= MAX_PREALLOCATED);
        let mut list = arena.new_list();
        let id = arena.insert(1);
        assert!(arena.push_back(&mut list, id));
        assert_eq!(preallocation(16), 16);
        assert_eq!(preallocation(usize::MAX), MAX_PREALLOCATED);
    }

    #[test]
    fn test_release_list_frees_entries() {
        let mut arena = NodeArena::new();
        let mut list = arena.new_list();
        for v in 0..5 {
            let id = arena.insert(v);
            arena.push_back(&mut list, id);
        }
        arena.release_list(list);
        assert_eq!(arena.len(), 0);
    }
}
