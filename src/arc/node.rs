/// An entry of one ARC part.
///
/// While resident in a part's main list the node carries its value; once
/// evicted into the ghost list only the key is kept.
#[derive(Debug)]
pub(crate) struct ArcNode<K, V> {
    key: K,
    value: Option<V>,
    access_count: usize,
}

impl<K, V> ArcNode<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key,
            value: Some(value),
            access_count: 1,
        }
    }

    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub(crate) fn set_value(&mut self, value: V) {
        self.value = Some(value);
    }

    pub(crate) fn access_count(&self) -> usize {
        self.access_count
    }

    /// Counts a hit and returns the new total.
    pub(crate) fn record_access(&mut self) -> usize {
        self.access_count += 1;
        self.access_count
    }

    pub(crate) fn is_ghost(&self) -> bool {
        self.value.is_none()
    }

    /// Drops the value and resets the counter; returns the dropped value.
    pub(crate) fn into_ghost(&mut self) -> Option<V> {
        self.access_count = 1;
        self.value.take()
    }
}
