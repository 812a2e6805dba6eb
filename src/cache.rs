use ahash::AHashMap;
use parking_lot::RwLock;

use crate::NodeId;

/// Memo of persisted adjacency arrays, keyed by node id.
#[derive(Default)]
pub struct AdjacencyCache {
    inner: RwLock<AHashMap<NodeId, Vec<NodeId>>>,
}

impl AdjacencyCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AHashMap::new()),
        }
    }

    pub fn get(&self, key: NodeId) -> Option<Vec<NodeId>> {
        self.inner.read().get(&key).cloned()
    }

    pub fn insert(&self, key: NodeId, value: Vec<NodeId>) {
        self.inner.write().insert(key, value);
    }

    pub fn invalidate(&self, key: NodeId) {
        self.inner.write().remove(&key);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
