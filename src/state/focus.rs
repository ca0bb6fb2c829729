//! Focus System - Read pointer over a scene's readable nodes
//!
//! A scene keeps its readable nodes (in traversal order) plus a pointer into
//! that list. The node under the pointer is the one allowed to prompt; the
//! scene lets a later node stand in while it waits on a deferred key.
//!
//! - `ptr == len` means nobody holds focus (end of the input flow)
//! - `advance` moves focus forward by one, never past the end
//! - `goto` jumps to a specific node, `rewind` back to the first one
//! - `reindex` keeps focus stable across structural changes
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::state::FocusCursor;
//!
//! let mut cursor = FocusCursor::new(vec![question, selection]);
//! assert_eq!(cursor.focused(), Some(question));
//! cursor.advance();
//! assert_eq!(cursor.focused(), Some(selection));
//! ```

use tracing::debug;

use crate::types::NodeId;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FocusCursor {
    read_nodes: Vec<NodeId>,
    ptr: usize,
}

impl FocusCursor {
    /// Focus starts on the first readable node.
    pub fn new(read_nodes: Vec<NodeId>) -> Self {
        Self { read_nodes, ptr: 0 }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// The node holding focus, if any.
    pub fn focused(&self) -> Option<NodeId> {
        self.read_nodes.get(self.ptr).copied()
    }

    /// Check if any node is focused
    pub fn has_focus(&self) -> bool {
        self.focused().is_some()
    }

    /// Check if a specific node is focused
    pub fn is_focused(&self, id: NodeId) -> bool {
        self.focused() == Some(id)
    }

    pub fn ptr(&self) -> usize {
        self.ptr
    }

    pub fn read_nodes(&self) -> &[NodeId] {
        &self.read_nodes
    }

    pub fn len(&self) -> usize {
        self.read_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_nodes.is_empty()
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.read_nodes.iter().position(|n| *n == id)
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Move focus to the next readable node. Stops at `len` (no focus).
    pub fn advance(&mut self) {
        if self.ptr < self.read_nodes.len() {
            self.ptr += 1;
        }
    }

    /// Put focus back on the first readable node.
    pub fn rewind(&mut self) {
        self.ptr = 0;
    }

    /// Focus a specific node. Returns false if it is not readable here.
    pub fn goto(&mut self, id: NodeId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.ptr = index;
                true
            }
            None => {
                debug!(node = %id, "goto target is not a readable node of this scene");
                false
            }
        }
    }

    // =========================================================================
    // STRUCTURAL CHANGES
    // =========================================================================

    /// Remove a node from the readable list.
    ///
    /// The pointer moves back by one when the removed node preceded it, so
    /// the focused node keeps focus. Removing the focused node hands focus
    /// to the next one.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.read_nodes.remove(index);
        if index < self.ptr {
            self.ptr -= 1;
        }
        true
    }

    /// Replace the readable list after the scene changed shape.
    ///
    /// Focus resolution, in order:
    /// 1. `prefer`, if it is in the new list (a readable replacement takes focus)
    /// 2. the previously focused node, if it survived
    /// 3. the slot right after the last node that focus had already passed
    pub fn reindex(&mut self, read_nodes: Vec<NodeId>, prefer: Option<NodeId>) {
        let focused = prefer
            .filter(|id| read_nodes.contains(id))
            .or_else(|| self.focused().filter(|id| read_nodes.contains(id)));
        let passed = &self.read_nodes[..self.ptr];

        let ptr = match focused {
            Some(id) => read_nodes.iter().position(|n| *n == id).unwrap_or(0),
            None => read_nodes
                .iter()
                .rposition(|n| passed.contains(n))
                .map(|last| last + 1)
                .unwrap_or(0),
        };

        self.read_nodes = read_nodes;
        self.ptr = ptr.min(self.read_nodes.len());
    }
}

// =============================================================================
// TESTS
// =============================================================================
