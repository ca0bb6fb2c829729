//! Text Primitives - Display nodes for plain, typed and computed text.
//!
//! - [`Text`] - a fixed string
//! - [`TypedText`] - a fixed string typed out on first render
//! - [`TypedBlock`] - several lines typed out as one block
//! - [`Computed`] - text derived from context keys, re-rendered when they change
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::primitives::{computed, text};
//!
//! let nodes = vec![
//!     text("Welcome"),
//!     computed(&["name"], |ctx| format!("Greeting, {}", ctx.get_str("name").unwrap_or("?"))),
//! ];
//! ```

use std::time::Duration;

use crate::engine::{Lifecycle, Node, NodeCtx, Renderable};
use crate::state::Context;
use crate::types::Output;

// =============================================================================
// Text
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    text: String,
    deferred: &'static [&'static str],
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            deferred: &[],
        }
    }

    /// Hold the node back until every key in `keys` is present.
    pub fn defer_until(mut self, keys: &'static [&'static str]) -> Self {
        self.deferred = keys;
        self
    }
}

impl Lifecycle for Text {
    fn cached_render(&self) -> Option<String> {
        Some(self.text.clone())
    }

    fn deferred_until(&self) -> &[&'static str] {
        self.deferred
    }
}

impl Renderable for Text {
    fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
        Output::plain(self.text.clone())
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::display(text)
    }
}

/// A static text node.
pub fn text(text: impl Into<String>) -> Node {
    Node::display(Text::new(text)).as_static()
}

// =============================================================================
// Typed text
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedText {
    text: String,
    delay: Duration,
}

impl TypedText {
    pub fn new(text: impl Into<String>, delay: Duration) -> Self {
        Self {
            text: text.into(),
            delay,
        }
    }
}

impl Lifecycle for TypedText {
    fn cached_render(&self) -> Option<String> {
        Some(self.text.clone())
    }
}

impl Renderable for TypedText {
    fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
        Output::typed(self.text.clone(), self.delay)
    }
}

/// Text typed out once, then served from the cache.
pub fn typed_text(text: impl Into<String>, delay: Duration) -> Node {
    Node::display(TypedText::new(text, delay)).as_static()
}

/// Lines typed out together, one after another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedBlock {
    lines: Vec<String>,
    delay: Duration,
}

impl TypedBlock {
    pub fn new<S: Into<String>>(lines: impl IntoIterator<Item = S>, delay: Duration) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            delay,
        }
    }

    fn joined(&self) -> String {
        self.lines.join("\n")
    }
}

impl Lifecycle for TypedBlock {
    fn cached_render(&self) -> Option<String> {
        Some(self.joined())
    }
}

impl Renderable for TypedBlock {
    fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
        Output::typed(self.joined(), self.delay)
    }
}

pub fn typed_block<S: Into<String>>(lines: impl IntoIterator<Item = S>, delay: Duration) -> Node {
    Node::display(TypedBlock::new(lines, delay)).as_static()
}

// =============================================================================
// Computed
// =============================================================================

pub type ComputeFn = Box<dyn FnMut(&Context) -> String + Send>;

/// Text computed from the context. Watches `keys`, so any change to one of
/// them re-renders the node on the next pass.
pub struct Computed {
    keys: &'static [&'static str],
    deferred: &'static [&'static str],
    compute: ComputeFn,
}

impl Computed {
    pub fn new(
        keys: &'static [&'static str],
        compute: impl FnMut(&Context) -> String + Send + 'static,
    ) -> Self {
        Self {
            keys,
            deferred: &[],
            compute: Box::new(compute),
        }
    }

    /// Hold the node back until every key in `keys` is present.
    pub fn defer_until(mut self, keys: &'static [&'static str]) -> Self {
        self.deferred = keys;
        self
    }
}

impl Lifecycle for Computed {
    fn watched_keys(&self) -> &[&'static str] {
        self.keys
    }

    fn deferred_until(&self) -> &[&'static str] {
        self.deferred
    }
}

impl Renderable for Computed {
    fn render(&mut self, cx: &mut NodeCtx<'_>) -> Output {
        Output::plain((self.compute)(cx.context()))
    }
}

impl From<Computed> for Node {
    fn from(computed: Computed) -> Self {
        Node::display(computed)
    }
}

pub fn computed(
    keys: &'static [&'static str],
    compute: impl FnMut(&Context) -> String + Send + 'static,
) -> Node {
    Node::display(Computed::new(keys, compute))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InputRouter, Scene};
    use crate::renderer::{MemoryTerminal, Renderer};

    fn render_twice(nodes: Vec<Node>, between: impl FnOnce(&mut Context)) -> (String, String) {
        let mut scene = Scene::new(nodes);
        let mut renderer = Renderer::new();
        renderer.set_buffer(scene.node_ids());
        let mut ctx = Context::new();
        let mut term = MemoryTerminal::new();
        let router = InputRouter::new();

        renderer.render_pass(&mut scene, &mut ctx, &router, &mut term).unwrap();
        let first = term.screen();
        between(&mut ctx);
        renderer.render_pass(&mut scene, &mut ctx, &router, &mut term).unwrap();
        (first, term.screen())
    }

    #[test]
    fn test_text_is_static() {
        let node = text("hello");
        assert!(node.is_static());
        let (first, second) = render_twice(vec![node], |_| {});
        assert_eq!(first, "hello\n");
        assert_eq!(second, first);
    }

    #[test]
    fn test_typed_block_joins_lines() {
        let block = TypedBlock::new(["one", "two"], Duration::ZERO);
        assert_eq!(block.cached_render().as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn test_computed_follows_context() {
        let node = computed(&["name"], |ctx| {
            format!("Greeting, {}", ctx.get_str("name").unwrap_or("stranger"))
        });
        let (first, second) = render_twice(vec![node], |ctx| {
            ctx.set("name", "Ada");
        });
        assert_eq!(first, "Greeting, stranger\n");
        assert_eq!(second, "Greeting, Ada\n");
    }

    #[test]
    fn test_deferred_text() {
        let node = Node::display(Text::new("ready").defer_until(&["files"]));
        let (first, second) = render_twice(vec![node], |ctx| {
            ctx.set("files", 3);
        });
        assert_eq!(first, "");
        assert_eq!(second, "ready\n");
    }
}
