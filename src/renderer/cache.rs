//! Render cache - Last output of every node, by id.
//!
//! Static nodes are served from here after their first render; clean
//! nodes reprint their entry instead of running `render` again.

use std::collections::HashMap;
use std::time::Instant;

use crate::types::NodeId;

/// One cached render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSnapshot {
    pub output: String,
    pub rendered_at: Instant,
    /// False for entries filled from a node's precomputed output rather
    /// than an actual render.
    pub was_rendered: bool,
}

#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<NodeId, RenderSnapshot>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, id: NodeId, output: impl Into<String>, was_rendered: bool) {
        self.entries.insert(
            id,
            RenderSnapshot {
                output: output.into(),
                rendered_at: Instant::now(),
                was_rendered,
            },
        );
    }

    pub fn get(&self, id: NodeId) -> Option<&RenderSnapshot> {
        self.entries.get(&id)
    }

    pub fn is_cached(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<RenderSnapshot> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_replaces_entry() {
        let mut cache = RenderCache::new();
        let id = NodeId::next();
        cache.store(id, "first", false);
        cache.store(id, "second", true);

        let entry = cache.get(id).unwrap();
        assert_eq!(entry.output, "second");
        assert!(entry.was_rendered);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = RenderCache::new();
        let (a, b) = (NodeId::next(), NodeId::next());
        cache.store(a, "a", true);
        cache.store(b, "b", true);

        assert!(cache.remove(a).is_some());
        assert!(!cache.is_cached(a));
        cache.clear();
        assert!(cache.is_empty());
    }
}
