//! Nodes - The display/interaction unit of a scene.
//!
//! A node is a tagged union over three kinds:
//!
//! - **Display** - produces output, expects no input ([`Renderable`])
//! - **Readable** - puts a prompt to the terminal and consumes one response
//!   per activation ([`Readable`])
//! - **Group** - ordered children rendered in place of the group
//!
//! Every kind carries the same lifecycle flags ([`NodeFlags`]). Hooks receive
//! a [`NodeCtx`], the only way a node reaches the context or its scene.
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::engine::{Node, NodeCtx, Renderable, Lifecycle};
//! use nera_tui::types::Output;
//!
//! struct Clock;
//!
//! impl Lifecycle for Clock {
//!     fn watched_keys(&self) -> &[&'static str] {
//!         &["now"]
//!     }
//! }
//!
//! impl Renderable for Clock {
//!     fn render(&mut self, cx: &mut NodeCtx<'_>) -> Output {
//!         format!("time: {}", cx.get_str("now").unwrap_or("?")).into()
//!     }
//! }
//!
//! let node = Node::display(Clock).as_static();
//! ```

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::state::{Context, KeyboardEvent};
use crate::types::{NodeFlags, NodeId, Output, Prompt};

// =============================================================================
// NODE TRAITS
// =============================================================================

/// Hooks shared by every node kind. All of them are optional.
pub trait Lifecycle: Send {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("Node")
    }

    /// Precomputed output served for static nodes after their first render.
    fn cached_render(&self) -> Option<String> {
        None
    }

    /// Context keys whose changes re-mark this node dirty.
    fn watched_keys(&self) -> &[&'static str] {
        &[]
    }

    /// Context keys that must be present and non-null before this node is
    /// considered by a render pass.
    fn deferred_until(&self) -> &[&'static str] {
        &[]
    }

    fn on_start(&mut self, _cx: &mut NodeCtx<'_>) {}

    fn on_tick(&mut self, _cx: &mut NodeCtx<'_>, _delta: Duration) {}

    fn on_end(&mut self, _cx: &mut NodeCtx<'_>) {}

    fn before_render(&mut self, _cx: &mut NodeCtx<'_>) {}

    fn after_render(&mut self, _cx: &mut NodeCtx<'_>) {}

    /// Called once, right after the first render.
    fn did_render(&mut self, _cx: &mut NodeCtx<'_>) {}

    /// Called when a watched key changed, with the current values of every
    /// watched key in `watched_keys()` order.
    fn on_change(&mut self, _cx: &mut NodeCtx<'_>, _values: &[Value]) {}

    /// Raw key routed between passes. Return true to consume it.
    fn on_key(&mut self, _cx: &mut NodeCtx<'_>, _key: &KeyboardEvent) -> bool {
        false
    }
}

/// A node that produces output and expects no input.
pub trait Renderable: Lifecycle {
    fn render(&mut self, cx: &mut NodeCtx<'_>) -> Output;
}

/// A node that prompts for one response per activation.
pub trait Readable: Lifecycle {
    /// The prompt to put to the terminal.
    fn prompt(&mut self, cx: &mut NodeCtx<'_>) -> Prompt;

    /// Generic response handler, used when no option handler matched.
    fn on_response(&mut self, _cx: &mut NodeCtx<'_>, _response: &str) {}

    /// Literal-input option handlers, if this node has any.
    fn options(&mut self) -> Option<&mut OptionTable> {
        None
    }
}

// =============================================================================
// OPTION TABLE
// =============================================================================

pub type OptionHandler = Box<dyn FnMut(&mut NodeCtx<'_>) + Send>;

/// Literal input → handler bindings, built once at construction.
#[derive(Default)]
pub struct OptionTable {
    handlers: Vec<(String, OptionHandler)>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn on(
        mut self,
        literal: impl Into<String>,
        handler: impl FnMut(&mut NodeCtx<'_>) + Send + 'static,
    ) -> Self {
        self.insert(literal, handler);
        self
    }

    /// Bind `literal` to `handler`. A later binding for the same literal wins.
    pub fn insert(
        &mut self,
        literal: impl Into<String>,
        handler: impl FnMut(&mut NodeCtx<'_>) + Send + 'static,
    ) {
        let literal = literal.into();
        self.handlers.retain(|(l, _)| *l != literal);
        self.handlers.push((literal, Box::new(handler)));
    }

    /// Run the handler bound to `input`. Returns false when none matches.
    pub fn invoke(&mut self, input: &str, cx: &mut NodeCtx<'_>) -> bool {
        match self.handlers.iter_mut().find(|(literal, _)| literal == input) {
            Some((_, handler)) => {
                handler(cx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, input: &str) -> bool {
        self.handlers.iter().any(|(literal, _)| literal == input)
    }

    /// Bound literals, in binding order.
    pub fn literals(&self) -> Vec<String> {
        self.handlers.iter().map(|(literal, _)| literal.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for OptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|(l, _)| l)).finish()
    }
}

// =============================================================================
// NODE CONTEXT
// =============================================================================

/// Where an inserted node goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// After the last top-level node.
    End,
    /// Immediately after the anchor, in the anchor's list.
    After(NodeId),
    /// In place of the anchor.
    Replacing(NodeId),
}

/// Scene mutations requested from inside a hook, applied once it returns.
#[derive(Debug)]
pub enum SceneCommand {
    Insert { node: Node, placement: Placement },
    Delete(NodeId),
    Goto(NodeId),
    Retry(NodeId),
    Transition(String),
    Quit,
}

/// Handle passed to every node hook.
///
/// Context reads and writes take effect immediately. Scene changes are
/// queued and applied by the scene as soon as the hook returns, followed by
/// change notification for every key the hook modified.
pub struct NodeCtx<'a> {
    id: NodeId,
    flags: &'a mut NodeFlags,
    context: &'a mut Context,
    commands: &'a mut Vec<SceneCommand>,
}

impl<'a> NodeCtx<'a> {
    pub(crate) fn new(
        id: NodeId,
        flags: &'a mut NodeFlags,
        context: &'a mut Context,
        commands: &'a mut Vec<SceneCommand>,
    ) -> Self {
        Self {
            id,
            flags,
            context,
            commands,
        }
    }

    /// Id of the node this hook runs for.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn flags(&self) -> NodeFlags {
        *self.flags
    }

    // ---- context -----------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.context.get_str(key)
    }

    /// Set a context key. Returns false when the value did not change.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        self.context.set(key, value)
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        self.context
    }

    // ---- own flags ---------------------------------------------------------

    pub fn disable(&mut self) {
        self.flags.insert(NodeFlags::DISABLED);
    }

    pub fn enable(&mut self) {
        self.flags.remove(NodeFlags::DISABLED);
    }

    pub fn is_disabled(&self) -> bool {
        self.flags.contains(NodeFlags::DISABLED)
    }

    /// Force a re-render on the next pass.
    pub fn mark_dirty(&mut self) {
        self.flags.insert(NodeFlags::DIRTY);
    }

    // ---- scene -------------------------------------------------------------

    /// Insert `node` right after this one.
    pub fn append_node(&mut self, node: Node) {
        let placement = Placement::After(self.id);
        self.insert(node, placement);
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: Node) {
        self.insert(node, Placement::After(anchor));
    }

    /// Insert `node` at the end of the scene.
    pub fn push_node(&mut self, node: Node) {
        self.insert(node, Placement::End);
    }

    /// Replace this node with `node`.
    pub fn replace_self(&mut self, node: Node) {
        let placement = Placement::Replacing(self.id);
        self.insert(node, placement);
    }

    pub fn insert(&mut self, node: Node, placement: Placement) {
        self.commands.push(SceneCommand::Insert { node, placement });
    }

    pub fn delete(&mut self, id: NodeId) {
        self.commands.push(SceneCommand::Delete(id));
    }

    pub fn remove_self(&mut self) {
        self.commands.push(SceneCommand::Delete(self.id));
    }

    /// Move focus to another readable node.
    pub fn goto(&mut self, id: NodeId) {
        self.commands.push(SceneCommand::Goto(id));
    }

    /// Re-focus this node and let it prompt again.
    pub fn retry(&mut self) {
        self.commands.push(SceneCommand::Retry(self.id));
    }

    /// Switch scenes once the current pass ends.
    pub fn transition(&mut self, scene: impl Into<String>) {
        self.commands.push(SceneCommand::Transition(scene.into()));
    }

    /// Stop the engine once the current pass ends.
    pub fn quit(&mut self) {
        self.commands.push(SceneCommand::Quit);
    }
}

// =============================================================================
// NODE
// =============================================================================

/// The kind-specific part of a node.
pub enum Body {
    Display(Box<dyn Renderable>),
    Readable(Box<dyn Readable>),
    Group(Vec<Node>),
}

/// Dispatch a [`Lifecycle`] call to display and readable bodies.
/// Groups have no behavior of their own and yield `$group`.
macro_rules! lifecycle {
    ($body:expr, $node:ident => $call:expr, $group:expr) => {
        match $body {
            Body::Display($node) => $call,
            Body::Readable($node) => $call,
            Body::Group(_) => $group,
        }
    };
}

impl Body {
    pub fn name(&self) -> &str {
        lifecycle!(self, n => n.name(), "Group")
    }

    pub fn watched_keys(&self) -> &[&'static str] {
        lifecycle!(self, n => n.watched_keys(), &[])
    }

    pub fn deferred_until(&self) -> &[&'static str] {
        lifecycle!(self, n => n.deferred_until(), &[])
    }

    pub fn cached_render(&self) -> Option<String> {
        lifecycle!(self, n => n.cached_render(), None)
    }

    pub(crate) fn on_start(&mut self, cx: &mut NodeCtx<'_>) {
        lifecycle!(self, n => n.on_start(cx), ())
    }

    pub(crate) fn on_tick(&mut self, cx: &mut NodeCtx<'_>, delta: Duration) {
        lifecycle!(self, n => n.on_tick(cx, delta), ())
    }

    pub(crate) fn on_end(&mut self, cx: &mut NodeCtx<'_>) {
        lifecycle!(self, n => n.on_end(cx), ())
    }

    pub(crate) fn before_render(&mut self, cx: &mut NodeCtx<'_>) {
        lifecycle!(self, n => n.before_render(cx), ())
    }

    pub(crate) fn after_render(&mut self, cx: &mut NodeCtx<'_>) {
        lifecycle!(self, n => n.after_render(cx), ())
    }

    pub(crate) fn did_render(&mut self, cx: &mut NodeCtx<'_>) {
        lifecycle!(self, n => n.did_render(cx), ())
    }

    pub(crate) fn on_change(&mut self, cx: &mut NodeCtx<'_>, values: &[Value]) {
        lifecycle!(self, n => n.on_change(cx, values), ())
    }

    pub(crate) fn on_key(&mut self, cx: &mut NodeCtx<'_>, key: &KeyboardEvent) -> bool {
        lifecycle!(self, n => n.on_key(cx, key), false)
    }
}

/// A node owned by a scene (or by a group inside it).
pub struct Node {
    id: NodeId,
    flags: NodeFlags,
    body: Body,
}

impl Node {
    fn new(body: Body) -> Self {
        Self {
            id: NodeId::next(),
            flags: NodeFlags::FRESH,
            body,
        }
    }

    /// Wrap a display node.
    pub fn display(node: impl Renderable + 'static) -> Self {
        Self::new(Body::Display(Box::new(node)))
    }

    /// Wrap a readable node.
    pub fn readable(node: impl Readable + 'static) -> Self {
        Self::new(Body::Readable(Box::new(node)))
    }

    /// Group `children`, rendered in order in place of the group.
    pub fn group(children: Vec<Node>) -> Self {
        Self::new(Body::Group(children))
    }

    // ---- builder flags -----------------------------------------------------

    /// Remove the node from its scene right after its first render.
    pub fn hide_after_render(mut self) -> Self {
        self.flags.insert(NodeFlags::HIDE_AFTER_RENDER);
        self
    }

    /// Serve the node's output from the render cache after its first render.
    pub fn as_static(mut self) -> Self {
        self.flags.insert(NodeFlags::STATIC);
        self
    }

    /// Start out disabled.
    pub fn disabled(mut self) -> Self {
        self.flags.insert(NodeFlags::DISABLED);
        self
    }

    // ---- accessors ---------------------------------------------------------

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn name(&self) -> &str {
        self.body.name()
    }

    pub fn is_readable(&self) -> bool {
        matches!(self.body, Body::Readable(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.body, Body::Group(_))
    }

    pub fn is_disabled(&self) -> bool {
        self.flags.contains(NodeFlags::DISABLED)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(NodeFlags::STATIC)
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(NodeFlags::DIRTY)
    }

    pub fn did_render(&self) -> bool {
        self.flags.contains(NodeFlags::DID_RENDER)
    }

    pub fn did_process_response(&self) -> bool {
        self.flags.contains(NodeFlags::DID_PROCESS_RESPONSE)
    }

    /// Children of a group, empty for other kinds.
    pub fn children(&self) -> &[Node] {
        match &self.body {
            Body::Group(children) => children,
            _ => &[],
        }
    }

    pub(crate) fn flags_mut(&mut self) -> &mut NodeFlags {
        &mut self.flags
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut NodeFlags, &mut Body) {
        (&mut self.flags, &mut self.body)
    }

    /// Depth-first walk: the node itself, then its children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("flags", &self.flags)
            .field("children", &self.children())
            .finish()
    }
}

// =============================================================================
// TREE HELPERS
// =============================================================================

pub(crate) fn find(nodes: &[Node], id: NodeId) -> Option<&Node> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find(node.children(), id) {
            return Some(found);
        }
    }
    None
}

pub(crate) fn find_mut(nodes: &mut [Node], id: NodeId) -> Option<&mut Node> {
    for node in nodes.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Body::Group(children) = &mut node.body {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Remove `id` from whichever list holds it.
pub(crate) fn remove(nodes: &mut Vec<Node>, id: NodeId) -> Option<Node> {
    if let Some(index) = nodes.iter().position(|n| n.id == id) {
        return Some(nodes.remove(index));
    }
    for node in nodes.iter_mut() {
        if let Body::Group(children) = &mut node.body {
            if let Some(removed) = remove(children, id) {
                return Some(removed);
            }
        }
    }
    None
}

/// Insert `node` after `anchor`, in the anchor's list. Hands `node` back when
/// the anchor is missing.
pub(crate) fn insert_after(nodes: &mut Vec<Node>, anchor: NodeId, node: Node) -> Result<(), Node> {
    if let Some(index) = nodes.iter().position(|n| n.id == anchor) {
        nodes.insert(index + 1, node);
        return Ok(());
    }
    let mut node = node;
    for candidate in nodes.iter_mut() {
        if let Body::Group(children) = &mut candidate.body {
            match insert_after(children, anchor, node) {
                Ok(()) => return Ok(()),
                Err(back) => node = back,
            }
        }
    }
    Err(node)
}

/// Put `node` where `anchor` was. Returns the replaced node, or hands `node`
/// back when the anchor is missing.
pub(crate) fn replace(nodes: &mut [Node], anchor: NodeId, node: Node) -> Result<Node, Node> {
    if let Some(slot) = nodes.iter_mut().find(|n| n.id == anchor) {
        return Ok(std::mem::replace(slot, node));
    }
    let mut node = node;
    for candidate in nodes.iter_mut() {
        if let Body::Group(children) = &mut candidate.body {
            match replace(children, anchor, node) {
                Ok(old) => return Ok(old),
                Err(back) => node = back,
            }
        }
    }
    Err(node)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Label(&'static str);

    impl Lifecycle for Label {
        fn watched_keys(&self) -> &[&'static str] {
            &["name"]
        }
    }

    impl Renderable for Label {
        fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
            Output::plain(self.0)
        }
    }

    fn ids(nodes: &[Node]) -> Vec<NodeId> {
        nodes.iter().map(Node::id).collect()
    }

    #[test]
    fn test_fresh_node_is_dirty() {
        let node = Node::display(Label("a"));
        assert!(node.is_dirty());
        assert!(!node.did_render());
        assert!(!node.is_readable());
        assert_eq!(node.name(), "Label");
    }

    #[test]
    fn test_builder_flags() {
        let node = Node::display(Label("a")).as_static().hide_after_render().disabled();
        assert!(node.is_static());
        assert!(node.is_disabled());
        assert!(node.flags().contains(NodeFlags::HIDE_AFTER_RENDER));
    }

    #[test]
    fn test_group_body_has_no_watches() {
        let group = Node::group(vec![Node::display(Label("a"))]);
        assert!(group.is_group());
        assert!(group.body().watched_keys().is_empty());
        assert_eq!(group.children().len(), 1);
        assert_eq!(group.name(), "Group");
    }

    #[test]
    fn test_walk_is_depth_first() {
        let inner = Node::display(Label("inner"));
        let inner_id = inner.id();
        let group = Node::group(vec![inner]);
        let group_id = group.id();

        let mut seen = Vec::new();
        group.walk(&mut |n| seen.push(n.id()));
        assert_eq!(seen, vec![group_id, inner_id]);
    }

    #[test]
    fn test_tree_helpers_reach_into_groups() {
        let a = Node::display(Label("a"));
        let a_id = a.id();
        let mut nodes = vec![Node::group(vec![a])];

        assert!(find(&nodes, a_id).is_some());

        let b = Node::display(Label("b"));
        let b_id = b.id();
        assert!(insert_after(&mut nodes, a_id, b).is_ok());
        assert_eq!(ids(nodes[0].children()), vec![a_id, b_id]);

        let c = Node::display(Label("c"));
        let c_id = c.id();
        let old = replace(&mut nodes, a_id, c).ok().unwrap();
        assert_eq!(old.id(), a_id);
        assert_eq!(ids(nodes[0].children()), vec![c_id, b_id]);

        assert!(remove(&mut nodes, b_id).is_some());
        assert_eq!(ids(nodes[0].children()), vec![c_id]);
        assert!(find_mut(&mut nodes, b_id).is_none());
    }

    #[test]
    fn test_insert_after_missing_anchor_hands_node_back() {
        let mut nodes = vec![Node::display(Label("a"))];
        let orphan = Node::display(Label("b"));
        let orphan_id = orphan.id();
        let back = insert_after(&mut nodes, NodeId::next(), orphan).unwrap_err();
        assert_eq!(back.id(), orphan_id);
    }

    #[test]
    fn test_option_table() {
        let mut table = OptionTable::new()
            .on("Red", |cx| {
                cx.set("color", "red");
            })
            .on("Blue", |cx| {
                cx.set("color", "blue");
            });
        assert_eq!(table.literals(), vec!["Red".to_string(), "Blue".to_string()]);

        let mut flags = NodeFlags::FRESH;
        let mut ctx = Context::new();
        let mut commands = Vec::new();
        let mut cx = NodeCtx::new(NodeId::next(), &mut flags, &mut ctx, &mut commands);

        assert!(table.invoke("Blue", &mut cx));
        assert!(!table.invoke("blue", &mut cx));
        assert_eq!(ctx.get_str("color"), Some("blue"));
    }

    #[test]
    fn test_option_rebinding_replaces() {
        let table = OptionTable::new().on("a", |_| {}).on("b", |_| {}).on("a", |_| {});
        assert_eq!(table.literals(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_ctx_queues_commands() {
        let mut flags = NodeFlags::FRESH;
        let mut ctx = Context::new();
        let mut commands = Vec::new();
        let id = NodeId::next();
        {
            let mut cx = NodeCtx::new(id, &mut flags, &mut ctx, &mut commands);
            cx.append_node(Node::display(Label("next")));
            cx.retry();
            cx.disable();
        }
        assert!(flags.contains(NodeFlags::DISABLED));
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            commands[0],
            SceneCommand::Insert { placement: Placement::After(anchor), .. } if anchor == id
        ));
        assert!(matches!(commands[1], SceneCommand::Retry(target) if target == id));
    }
}
