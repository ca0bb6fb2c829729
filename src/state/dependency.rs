//! Dependency Graph - Which nodes watch which context keys
//!
//! Maps a context key to the ordered, duplicate-free list of nodes that
//! declared interest in it through `watched_keys()`.
//!
//! The graph stores [`NodeId`]s only. It never owns a node, so a node the
//! scene has discarded simply stops resolving. Scenes rebuild the graph on
//! every structural change and on transition.

use std::collections::HashMap;

use tracing::debug;

use crate::types::NodeId;

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    edges: HashMap<String, Vec<NodeId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` as a dependent of `key`. Duplicate edges are ignored.
    pub fn subscribe(&mut self, node: NodeId, key: &str) {
        let dependents = self.edges.entry(key.to_string()).or_default();
        if !dependents.contains(&node) {
            dependents.push(node);
        }
    }

    /// Nodes subscribed to `key`, in subscription order.
    pub fn dependents_of(&self, key: &str) -> &[NodeId] {
        self.edges.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_dependents(&self, key: &str) -> bool {
        !self.dependents_of(key).is_empty()
    }

    /// Drop every edge that points at `node`.
    pub fn forget(&mut self, node: NodeId) {
        for dependents in self.edges.values_mut() {
            dependents.retain(|id| *id != node);
        }
        self.edges.retain(|_, dependents| !dependents.is_empty());
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Rebuild from scratch out of `(node, watched keys)` pairs.
    pub fn build<'a>(&mut self, watches: impl IntoIterator<Item = (NodeId, &'a [&'static str])>) {
        self.clear();
        for (node, keys) in watches {
            for key in keys {
                self.subscribe(node, key);
            }
        }
        debug!(keys = self.edges.len(), "dependency graph rebuilt");
    }

    /// Number of keys with at least one dependent.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_duplicate_free() {
        let mut graph = DependencyGraph::new();
        let a = NodeId::next();
        graph.subscribe(a, "files");
        graph.subscribe(a, "files");
        assert_eq!(graph.dependents_of("files"), &[a]);
    }

    #[test]
    fn test_keeps_subscription_order() {
        let mut graph = DependencyGraph::new();
        let a = NodeId::next();
        let b = NodeId::next();
        graph.subscribe(b, "k");
        graph.subscribe(a, "k");
        assert_eq!(graph.dependents_of("k"), &[b, a]);
    }

    #[test]
    fn test_unknown_key_has_no_dependents() {
        let graph = DependencyGraph::new();
        assert!(graph.dependents_of("nothing").is_empty());
        assert!(!graph.has_dependents("nothing"));
    }

    #[test]
    fn test_build_replaces_old_edges() {
        let mut graph = DependencyGraph::new();
        let a = NodeId::next();
        let b = NodeId::next();
        graph.subscribe(a, "old");

        let b_keys: &[&'static str] = &["x", "y"];
        graph.build([(b, b_keys)]);

        assert!(!graph.has_dependents("old"));
        assert_eq!(graph.dependents_of("x"), &[b]);
        assert_eq!(graph.dependents_of("y"), &[b]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_forget() {
        let mut graph = DependencyGraph::new();
        let a = NodeId::next();
        let b = NodeId::next();
        graph.subscribe(a, "k");
        graph.subscribe(b, "k");
        graph.subscribe(a, "only_a");
        graph.forget(a);
        assert_eq!(graph.dependents_of("k"), &[b]);
        assert!(!graph.has_dependents("only_a"));
    }
}
