//! Scene - An ordered collection of nodes plus input focus
//!
//! A scene owns:
//!
//! - its top-level nodes (groups own their children)
//! - a [`FocusCursor`] over its readable nodes, in traversal order
//! - a [`DependencyGraph`] from context keys to watching nodes
//!
//! Every hook a scene runs goes through [`Scene::invoke`]: the hook gets a
//! [`NodeCtx`], its queued scene commands are applied when it returns, and
//! the context changes it made are then delivered to watching nodes
//! ([`Scene::flush_changes`]). Notification cascades (a change handler that
//! sets another key) until no changes are left or the cascade limit is hit.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::node::{self, Body, Node, NodeCtx, Placement, SceneCommand};
use crate::state::{Context, DependencyGraph, FocusCursor, KeyboardEvent};
use crate::types::{NodeFlags, NodeId};

/// Rounds of cascading change notification before the rest is dropped.
pub const DEFAULT_CASCADE_LIMIT: usize = 32;

pub struct Scene {
    nodes: Vec<Node>,
    focus: FocusCursor,
    graph: DependencyGraph,
    structure_changed: bool,
    pending_transition: Option<String>,
    quit_requested: bool,
    cascade_limit: usize,
}

impl Scene {
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut scene = Self {
            nodes,
            focus: FocusCursor::default(),
            graph: DependencyGraph::new(),
            structure_changed: false,
            pending_transition: None,
            quit_requested: false,
            cascade_limit: DEFAULT_CASCADE_LIMIT,
        };
        scene.focus = FocusCursor::new(scene.collect_read_nodes());
        scene.rebuild_dependencies();
        scene
    }

    pub fn with_cascade_limit(mut self, limit: usize) -> Self {
        self.cascade_limit = limit;
        self
    }

    pub fn set_cascade_limit(&mut self, limit: usize) {
        self.cascade_limit = limit;
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Ids of the top-level nodes, in order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(Node::id).collect()
    }

    /// Every node id in depth-first order, groups before their children.
    pub fn all_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for node in &self.nodes {
            node.walk(&mut |n| ids.push(n.id()));
        }
        ids
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        node::find(&self.nodes, id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn focus(&self) -> &FocusCursor {
        &self.focus
    }

    /// Readable nodes, in traversal order.
    pub fn read_nodes(&self) -> &[NodeId] {
        self.focus.read_nodes()
    }

    pub fn read_ptr(&self) -> usize {
        self.focus.ptr()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focus.focused()
    }

    /// The readable node allowed to prompt right now.
    ///
    /// The search starts at the focused node and steps over readables that
    /// are disabled or still waiting on a deferred key (their own or an
    /// enclosing group's). The cursor itself does not move, so a deferred
    /// node gets its turn back once its keys appear. The first other
    /// readable ends the search: it prompts unless it already answered and
    /// kept focus.
    pub fn active_prompt(&self, context: &Context) -> Option<NodeId> {
        let held = self.held_readables(context);
        for &id in self.focus.read_nodes().iter().skip(self.focus.ptr()) {
            if held.contains(&id) {
                continue;
            }
            let node = self.find(id)?;
            return (!node.did_process_response()).then_some(id);
        }
        None
    }

    /// Readables that cannot prompt: disabled, or under a deferred node whose
    /// keys are not all present.
    fn held_readables(&self, context: &Context) -> HashSet<NodeId> {
        fn collect(nodes: &[Node], held: bool, context: &Context, out: &mut HashSet<NodeId>) {
            for node in nodes {
                let held = held
                    || node.is_disabled()
                    || node
                        .body()
                        .deferred_until()
                        .iter()
                        .any(|key| !context.is_present(key));
                if held && node.is_readable() {
                    out.insert(node.id());
                }
                collect(node.children(), held, context, out);
            }
        }

        let mut held = HashSet::new();
        collect(&self.nodes, false, context, &mut held);
        held
    }

    pub fn dependencies(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn has_pending_transition(&self) -> bool {
        self.pending_transition.is_some()
    }

    /// A transition or quit was requested and the pass should stop.
    pub fn has_pending_exit(&self) -> bool {
        self.pending_transition.is_some() || self.quit_requested
    }

    /// Whether the node tree changed shape since the last call.
    pub fn take_structure_changed(&mut self) -> bool {
        std::mem::take(&mut self.structure_changed)
    }

    pub fn take_transition(&mut self) -> Option<String> {
        self.pending_transition.take()
    }

    pub fn take_quit(&mut self) -> bool {
        std::mem::take(&mut self.quit_requested)
    }

    pub(crate) fn flags_mut(&mut self, id: NodeId) -> Option<&mut NodeFlags> {
        node::find_mut(&mut self.nodes, id).map(Node::flags_mut)
    }

    fn collect_read_nodes(&self) -> Vec<NodeId> {
        let mut read = Vec::new();
        for node in &self.nodes {
            node.walk(&mut |n| {
                if n.is_readable() {
                    read.push(n.id());
                }
            });
        }
        read
    }

    // =========================================================================
    // DEPENDENCIES
    // =========================================================================

    /// Rebuild the key → dependents index from the current tree.
    pub fn rebuild_dependencies(&mut self) {
        let mut watches = Vec::new();
        for node in &self.nodes {
            node.walk(&mut |n| watches.push((n.id(), n.body().watched_keys())));
        }
        self.graph.clear();
        self.graph.build(watches);
    }

    pub fn clear_dependencies(&mut self) {
        self.graph.clear();
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Insert a node. Returns false (and drops the node) when the anchor is
    /// not part of this scene.
    pub fn insert_node(&mut self, node: Node, placement: Placement) -> bool {
        let id = node.id();
        let readable = node.is_readable();
        let inserted = match placement {
            Placement::End => {
                self.nodes.push(node);
                true
            }
            Placement::After(anchor) => node::insert_after(&mut self.nodes, anchor, node).is_ok(),
            Placement::Replacing(anchor) => match node::replace(&mut self.nodes, anchor, node) {
                Ok(old) => {
                    self.forget_subtree(&old);
                    true
                }
                Err(_) => false,
            },
        };
        if !inserted {
            warn!(node = %id, ?placement, "insert anchor not found, node dropped");
            return false;
        }

        let prefer = matches!(placement, Placement::Replacing(_))
            .then_some(id)
            .filter(|_| readable);
        self.focus.reindex(self.collect_read_nodes(), prefer);
        self.rebuild_dependencies();
        self.structure_changed = true;
        debug!(node = %id, ?placement, "node inserted");
        true
    }

    /// Remove a node (and, for a group, all of its children).
    pub fn delete_node(&mut self, id: NodeId) -> Option<Node> {
        let removed = node::remove(&mut self.nodes, id)?;
        self.forget_subtree(&removed);
        self.structure_changed = true;
        debug!(node = %id, "node deleted");
        Some(removed)
    }

    fn forget_subtree(&mut self, removed: &Node) {
        let mut gone = Vec::new();
        removed.walk(&mut |n| gone.push((n.id(), n.is_readable())));
        for (id, readable) in gone {
            self.graph.forget(id);
            if readable {
                self.focus.remove(id);
            }
        }
    }

    /// Move focus to a readable node of this scene.
    pub fn goto(&mut self, id: NodeId) -> bool {
        self.focus.goto(id)
    }

    /// Move focus past readables that disabled themselves.
    fn skip_disabled(&mut self) {
        while let Some(id) = self.focus.focused() {
            if !self.find(id).is_some_and(Node::is_disabled) {
                return;
            }
            self.focus.advance();
        }
    }

    /// Start a new activation: enabled readables forget their last response
    /// and focus goes back to the first enabled one.
    fn reset_readables(&mut self) {
        for id in self.focus.read_nodes().to_vec() {
            let Some(flags) = self.flags_mut(id) else {
                continue;
            };
            if !flags.contains(NodeFlags::DISABLED) {
                flags.remove(NodeFlags::DID_PROCESS_RESPONSE | NodeFlags::DID_RENDER);
                flags.insert(NodeFlags::DIRTY);
            }
        }
        self.focus.rewind();
        self.skip_disabled();
    }

    /// Re-focus `id` and reset it so it prompts again on the next pass.
    pub fn retry(&mut self, id: NodeId) -> bool {
        if !self.focus.goto(id) {
            return false;
        }
        if let Some(node) = node::find_mut(&mut self.nodes, id) {
            let flags = node.flags_mut();
            flags.remove(NodeFlags::DID_PROCESS_RESPONSE | NodeFlags::DID_RENDER);
            flags.insert(NodeFlags::DIRTY);
        }
        trace!(node = %id, "retry");
        true
    }

    // =========================================================================
    // HOOK INVOCATION
    // =========================================================================

    /// Run `hook` against one node, then apply its commands and deliver its
    /// context changes. Returns None when the node is not in this scene.
    pub(crate) fn invoke<R>(
        &mut self,
        id: NodeId,
        context: &mut Context,
        hook: impl FnOnce(&mut Body, &mut NodeCtx<'_>) -> R,
    ) -> Option<R> {
        let (result, commands) = self.invoke_raw(id, context, hook)?;
        self.apply(commands, context);
        self.flush_changes(context);
        Some(result)
    }

    fn invoke_raw<R>(
        &mut self,
        id: NodeId,
        context: &mut Context,
        hook: impl FnOnce(&mut Body, &mut NodeCtx<'_>) -> R,
    ) -> Option<(R, Vec<SceneCommand>)> {
        let mut commands = Vec::new();
        let node = node::find_mut(&mut self.nodes, id)?;
        let (flags, body) = node.parts_mut();
        let mut cx = NodeCtx::new(id, flags, context, &mut commands);
        let result = hook(body, &mut cx);
        Some((result, commands))
    }

    fn apply(&mut self, commands: Vec<SceneCommand>, context: &mut Context) {
        for command in commands {
            match command {
                SceneCommand::Insert { node, placement } => {
                    let mut fresh = Vec::new();
                    node.walk(&mut |n| fresh.push(n.id()));
                    if self.insert_node(node, placement) {
                        // Inserted mid-scene, so nobody else will start them.
                        for id in fresh {
                            if let Some(((), more)) =
                                self.invoke_raw(id, context, |body, cx| body.on_start(cx))
                            {
                                self.apply(more, context);
                            }
                        }
                    }
                }
                SceneCommand::Delete(id) => {
                    self.delete_node(id);
                }
                SceneCommand::Goto(id) => {
                    self.goto(id);
                }
                SceneCommand::Retry(id) => {
                    self.retry(id);
                }
                SceneCommand::Transition(name) => self.pending_transition = Some(name),
                SceneCommand::Quit => self.quit_requested = true,
            }
        }
    }

    /// Deliver pending context changes to the nodes watching them.
    ///
    /// Each dependent gets `on_change` with the current values of all of its
    /// watched keys and is marked dirty. Keys set by change handlers are
    /// delivered in follow-up rounds, up to the cascade limit.
    pub fn flush_changes(&mut self, context: &mut Context) {
        let mut rounds = 0;
        loop {
            let changed = context.take_changes();
            if changed.is_empty() {
                return;
            }
            rounds += 1;
            if rounds > self.cascade_limit {
                warn!(
                    limit = self.cascade_limit,
                    dropped = ?changed,
                    "change notification cascade limit reached"
                );
                return;
            }

            for key in changed {
                let dependents = self.graph.dependents_of(&key).to_vec();
                for id in dependents {
                    let Some(node) = self.find(id) else {
                        continue; // Deleted by an earlier handler this round
                    };
                    let values = context.values_of(node.body().watched_keys());
                    trace!(node = %id, key = %key, "change delivered");
                    let delivered = self.invoke_raw(id, context, |body, cx| {
                        body.on_change(cx, &values);
                        cx.mark_dirty();
                    });
                    if let Some(((), commands)) = delivered {
                        self.apply(commands, context);
                    }
                }
            }
        }
    }

    /// Run a hook on every node of the scene, in traversal order.
    fn broadcast(&mut self, context: &mut Context, hook: impl Fn(&mut Body, &mut NodeCtx<'_>)) {
        for id in self.all_ids() {
            self.invoke(id, context, &hook);
        }
    }

    // =========================================================================
    // SCENE HOOKS
    // =========================================================================

    /// The scene became current. Readables answered during an earlier visit
    /// prompt again.
    pub fn on_loaded(&mut self, context: &mut Context) {
        self.reset_readables();
        self.broadcast(context, |body, cx| body.on_start(cx));
    }

    /// The scene is about to stop being current.
    pub fn on_will_transition(&mut self, context: &mut Context) {
        self.broadcast(context, |body, cx| body.on_end(cx));
    }

    pub fn on_tick(&mut self, context: &mut Context, delta: Duration) {
        self.broadcast(context, |body, cx| body.on_tick(cx, delta));
    }

    pub fn before_render(&mut self, context: &mut Context) {
        self.broadcast(context, |body, cx| body.before_render(cx));
    }

    /// Runs `after_render` on the nodes that rendered, skipping any that were
    /// removed since.
    pub fn after_render(&mut self, context: &mut Context, rendered: &[NodeId]) {
        for &id in rendered {
            self.invoke(id, context, |body, cx| body.after_render(cx));
        }
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Hand a response to the focused readable node.
    pub fn on_input(&mut self, context: &mut Context, value: &str) {
        let Some(id) = self.focus.focused() else {
            debug!("input with no focused node dropped");
            return;
        };
        self.respond(context, id, value);
    }

    /// Hand a response to readable node `id`.
    ///
    /// A literal match in the node's option table runs that handler, anything
    /// else goes to `on_response`. The node is then marked as having
    /// processed its response. If it held focus and disabled itself, focus
    /// moves on to the next enabled readable; a node that stays enabled
    /// keeps focus. Answering a node that prompted while focus waited on a
    /// deferred node leaves focus where it was.
    pub fn respond(&mut self, context: &mut Context, id: NodeId, value: &str) {
        if !self.find(id).is_some_and(Node::is_readable) {
            debug!(node = %id, "response for a node that is not readable here dropped");
            return;
        }

        let handled = self.invoke_raw(id, context, |body, cx| {
            let Body::Readable(node) = body else {
                return;
            };
            let matched = match node.options() {
                Some(table) => table.invoke(value, cx),
                None => false,
            };
            if !matched {
                node.on_response(cx, value);
            }
        });
        let Some(((), commands)) = handled else {
            return;
        };

        if let Some(node) = node::find_mut(&mut self.nodes, id) {
            node.flags_mut().insert(NodeFlags::DID_PROCESS_RESPONSE);
        }
        self.apply(commands, context);
        self.flush_changes(context);

        let disabled = self.find(id).is_some_and(Node::is_disabled);
        if disabled && self.focus.is_focused(id) {
            self.focus.advance();
            self.skip_disabled();
        }
    }

    /// Offer a raw key to the focused node first, then to every other enabled
    /// node in traversal order. Returns true once a node consumes it.
    pub fn route_key(&mut self, context: &mut Context, key: &KeyboardEvent) -> bool {
        let focused = self.focus.focused();
        let order = focused
            .into_iter()
            .chain(self.all_ids().into_iter().filter(|id| Some(*id) != focused));

        for id in order.collect::<Vec<_>>() {
            if self.find(id).is_none_or(Node::is_disabled) {
                continue;
            }
            if self.invoke(id, context, |body, cx| body.on_key(cx, key)) == Some(true) {
                trace!(node = %id, key = %key.key, "key consumed");
                return true;
            }
        }
        false
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.nodes)
            .field("focus", &self.focus)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
