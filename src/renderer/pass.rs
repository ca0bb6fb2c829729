//! Render pass - One walk over the current scene.
//!
//! A pass:
//!
//! 1. delivers pending context changes and runs `before_render`
//! 2. clears the terminal
//! 3. visits the buffer (the scene's top-level nodes) in order
//! 4. runs `on_tick` with the time since the previous pass, and
//!    `after_render` on the first pass after a transition that visits the
//!    whole buffer
//!
//! Per node, in order: disabled nodes are skipped, deferred nodes wait for
//! their keys, already-rendered static nodes reprint their cached output,
//! then the node renders by kind. Readable nodes prompt only while they are
//! the scene's active prompt (see [`Scene::active_prompt`]) and only until
//! they have processed a response. A node flagged
//! hide-after-render is deleted right after its first render and the pass
//! stops so the next one starts from the new shape.

use std::io;
use std::time::Instant;

use tracing::trace;

use crate::engine::{Body, InputRouter, Node, Scene};
use crate::state::Context;
use crate::types::{NodeFlags, NodeId, Prompt};

use super::cache::RenderCache;
use super::terminal::Terminal;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every node in the buffer was visited.
    Completed,
    /// The pass stopped early and the next one should run right away.
    Interrupted,
    /// The user interrupted a prompt.
    Quit,
}

enum Visit {
    Continue,
    Restart,
    Quit,
}

#[derive(Debug, Default)]
pub struct Renderer {
    buffer: Vec<NodeId>,
    cache: RenderCache,
    pass_count: u64,
    last_tick: Option<Instant>,
    buffer_set: bool,
    settled: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &[NodeId] {
        &self.buffer
    }

    pub fn set_buffer(&mut self, ids: Vec<NodeId>) {
        self.buffer = ids;
        self.buffer_set = true;
    }

    /// Whether the buffer was set since the last call.
    pub fn take_buffer_set(&mut self) -> bool {
        std::mem::take(&mut self.buffer_set)
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Passes since the last reset.
    pub fn pass_count(&self) -> u64 {
        self.pass_count
    }

    /// Forget everything about the previous scene.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cache.clear();
        self.pass_count = 0;
        self.last_tick = None;
        self.buffer_set = false;
        self.settled = false;
    }

    pub fn render_pass<T: Terminal + ?Sized>(
        &mut self,
        scene: &mut Scene,
        context: &mut Context,
        router: &InputRouter,
        term: &mut T,
    ) -> io::Result<PassOutcome> {
        scene.flush_changes(context);
        scene.before_render(context);
        if scene.take_structure_changed() {
            self.set_buffer(scene.node_ids());
        }

        term.clear()?;
        let mut rendered = Vec::new();
        let mut outcome = PassOutcome::Completed;
        let mut index = 0;
        while index < self.buffer.len() {
            let id = self.buffer[index];
            match self.visit(id, scene, context, router, term, &mut rendered)? {
                Visit::Continue => {}
                Visit::Restart => {
                    outcome = PassOutcome::Interrupted;
                    break;
                }
                Visit::Quit => {
                    outcome = PassOutcome::Quit;
                    break;
                }
            }
            if scene.has_pending_exit() {
                outcome = PassOutcome::Interrupted;
                break;
            }
            if scene.take_structure_changed() {
                self.set_buffer(scene.node_ids());
                // Carry on after the node just visited, wherever it is now
                index = match self.buffer.iter().position(|n| *n == id) {
                    Some(position) => position + 1,
                    None => index,
                };
            } else {
                index += 1;
            }
        }
        term.flush()?;

        let now = Instant::now();
        let delta = self
            .last_tick
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);
        scene.on_tick(context, delta);
        if outcome == PassOutcome::Completed && !self.settled {
            self.settled = true;
            scene.after_render(context, &rendered);
        }
        if scene.take_structure_changed() {
            self.set_buffer(scene.node_ids());
        }

        if outcome == PassOutcome::Completed {
            context.clear_pending_changes();
        }
        self.pass_count += 1;
        trace!(pass = self.pass_count, rendered = rendered.len(), ?outcome, "render pass");
        Ok(outcome)
    }

    fn visit<T: Terminal + ?Sized>(
        &mut self,
        id: NodeId,
        scene: &mut Scene,
        context: &mut Context,
        router: &InputRouter,
        term: &mut T,
        rendered: &mut Vec<NodeId>,
    ) -> io::Result<Visit> {
        let Some(node) = scene.find(id) else {
            return Ok(Visit::Continue);
        };
        let flags = node.flags();

        if flags.contains(NodeFlags::DISABLED) {
            return Ok(Visit::Continue);
        }
        let waiting_on = node
            .body()
            .deferred_until()
            .iter()
            .find(|key| !context.is_present(key));
        if let Some(key) = waiting_on {
            trace!(node = %id, key = %key, "deferred");
            return Ok(Visit::Continue);
        }

        if flags.contains(NodeFlags::STATIC | NodeFlags::DID_RENDER) {
            if !self.cache.is_cached(id) {
                if let Some(cached) = node.body().cached_render() {
                    self.cache.store(id, cached, false);
                }
            }
            if let Some(entry) = self.cache.get(id) {
                term.write_line(&entry.output)?;
                return Ok(Visit::Continue);
            }
        }

        let children: Vec<NodeId> = node.children().iter().map(Node::id).collect();
        let (is_group, is_readable) = (node.is_group(), node.is_readable());

        if is_group {
            for child in children {
                match self.visit(child, scene, context, router, term, rendered)? {
                    Visit::Continue => {}
                    stop => return Ok(stop),
                }
                if scene.has_pending_exit() {
                    return Ok(Visit::Continue);
                }
            }
        } else if is_readable {
            if flags.contains(NodeFlags::DID_PROCESS_RESPONSE) {
                return Ok(Visit::Continue);
            }
            if scene.active_prompt(context) != Some(id) {
                trace!(node = %id, "waiting for focus");
                return Ok(Visit::Continue);
            }
            let prompt = scene
                .invoke(id, context, |body, cx| match body {
                    Body::Readable(node) => Some(node.prompt(cx)),
                    _ => None,
                })
                .flatten();
            let Some(prompt) = prompt else {
                return Ok(Visit::Continue);
            };

            let response = match &prompt {
                Prompt::Line(question) => term.read_line(question),
                Prompt::Select { question, options } => term.select(question, options),
            };
            let response = match response {
                Ok(response) => response,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(Visit::Quit),
                Err(e) => return Err(e),
            };
            self.cache
                .store(id, format!("{} {}", prompt.question(), response), true);
            router.deliver(scene, context, id, &response);
        } else {
            let fresh = !flags.contains(NodeFlags::DID_RENDER);
            let clean = !fresh && !flags.contains(NodeFlags::DIRTY);
            match self.cache.get(id).filter(|_| clean) {
                Some(entry) => term.write_line(&entry.output)?,
                None => {
                    let output = scene
                        .invoke(id, context, |body, cx| match body {
                            Body::Display(node) => Some(node.render(cx)),
                            _ => None,
                        })
                        .flatten()
                        .unwrap_or_default();
                    if !output.is_empty() {
                        match output.typing {
                            Some(delay) if fresh => {
                                term.type_out(&output.text, delay)?;
                                term.write("\n")?;
                            }
                            _ => term.write_line(&output.text)?,
                        }
                    }
                    let snapshot = match scene.find(id) {
                        Some(node) if flags.contains(NodeFlags::STATIC) => {
                            node.body().cached_render().unwrap_or(output.text)
                        }
                        _ => output.text,
                    };
                    self.cache.store(id, snapshot, true);
                }
            }
        }

        // The node may have replaced or deleted itself while handling input,
        // or asked to be prompted again
        let Some(node) = scene.find(id) else {
            return Ok(Visit::Continue);
        };
        if is_readable && !node.did_process_response() {
            return Ok(Visit::Continue);
        }
        rendered.push(id);
        if !flags.contains(NodeFlags::DID_RENDER) {
            scene.invoke(id, context, |body, cx| body.did_render(cx));
        }
        if let Some(flags) = scene.flags_mut(id) {
            flags.insert(NodeFlags::DID_RENDER);
            flags.remove(NodeFlags::DIRTY);
        }
        if flags.contains(NodeFlags::HIDE_AFTER_RENDER) {
            scene.delete_node(id);
            self.cache.remove(id);
            return Ok(Visit::Restart);
        }
        Ok(Visit::Continue)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::engine::{Lifecycle, NodeCtx, Readable, Renderable};
    use crate::renderer::MemoryTerminal;
    use crate::types::Output;

    /// Renders a fixed line, counting calls.
    struct Line {
        text: &'static str,
        renders: Arc<AtomicUsize>,
        watch: &'static [&'static str],
        defer: &'static [&'static str],
    }

    impl Line {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                renders: Arc::new(AtomicUsize::new(0)),
                watch: &[],
                defer: &[],
            }
        }
    }

    impl Lifecycle for Line {
        fn watched_keys(&self) -> &[&'static str] {
            self.watch
        }

        fn deferred_until(&self) -> &[&'static str] {
            self.defer
        }
    }

    impl Renderable for Line {
        fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Output::plain(self.text)
        }
    }

    struct Ask(&'static str, &'static str);

    impl Lifecycle for Ask {}

    impl Readable for Ask {
        fn prompt(&mut self, _cx: &mut NodeCtx<'_>) -> Prompt {
            Prompt::line(self.0)
        }

        fn on_response(&mut self, cx: &mut NodeCtx<'_>, response: &str) {
            cx.set(self.1, response);
            cx.disable();
        }
    }

    fn pass(renderer: &mut Renderer, scene: &mut Scene, ctx: &mut Context, term: &mut MemoryTerminal) -> PassOutcome {
        renderer.render_pass(scene, ctx, &InputRouter::new(), term).unwrap()
    }

    fn setup(nodes: Vec<Node>) -> (Renderer, Scene, Context, MemoryTerminal) {
        let scene = Scene::new(nodes);
        let mut renderer = Renderer::new();
        renderer.set_buffer(scene.node_ids());
        (renderer, scene, Context::new(), MemoryTerminal::new())
    }

    #[test]
    fn test_static_node_renders_once() {
        let line = Line::new("banner");
        let renders = line.renders.clone();
        let (mut r, mut scene, mut ctx, mut term) = setup(vec![Node::display(line).as_static()]);

        pass(&mut r, &mut scene, &mut ctx, &mut term);
        let first = term.screen();
        pass(&mut r, &mut scene, &mut ctx, &mut term);

        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(term.screen(), first);
        assert_eq!(first, "banner\n");
    }

    #[test]
    fn test_clean_node_reprints_without_rendering() {
        let line = Line::new("hello");
        let renders = line.renders.clone();
        let (mut r, mut scene, mut ctx, mut term) = setup(vec![Node::display(line)]);

        pass(&mut r, &mut scene, &mut ctx, &mut term);
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(term.screen(), "hello\n");
    }

    #[test]
    fn test_watched_change_rerenders() {
        let mut line = Line::new("name");
        line.watch = &["name"];
        let renders = line.renders.clone();
        let (mut r, mut scene, mut ctx, mut term) = setup(vec![Node::display(line)]);

        pass(&mut r, &mut scene, &mut ctx, &mut term);
        ctx.set("name", "Ada");
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(renders.load(Ordering::SeqCst), 2);

        ctx.set("name", "Ada");
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hide_after_render_interrupts_pass() {
        let logo = Node::display(Line::new("logo")).hide_after_render();
        let logo_id = logo.id();
        let (mut r, mut scene, mut ctx, mut term) =
            setup(vec![logo, Node::display(Line::new("after"))]);

        assert_eq!(pass(&mut r, &mut scene, &mut ctx, &mut term), PassOutcome::Interrupted);
        assert_eq!(term.screen(), "logo\n");
        assert!(!scene.contains(logo_id));
        assert_eq!(r.buffer().len(), 1);

        assert_eq!(pass(&mut r, &mut scene, &mut ctx, &mut term), PassOutcome::Completed);
        assert_eq!(term.screen(), "after\n");
    }

    #[test]
    fn test_deferred_node_waits_for_key() {
        let mut line = Line::new("overview");
        line.defer = &["files"];
        let (mut r, mut scene, mut ctx, mut term) = setup(vec![Node::display(line)]);

        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(term.screen(), "");

        ctx.set("files", serde_json::json!(["a.mp3"]));
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(term.screen(), "overview\n");
    }

    #[test]
    fn test_disabled_node_is_skipped() {
        let (mut r, mut scene, mut ctx, mut term) =
            setup(vec![Node::display(Line::new("hidden")).disabled()]);
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(term.screen(), "");
    }

    #[test]
    fn test_one_prompt_per_focus_then_next() {
        let (mut r, mut scene, mut ctx, _) = setup(vec![
            Node::readable(Ask("Name?", "name")),
            Node::readable(Ask("Color?", "color")),
        ]);
        let mut term = MemoryTerminal::new().with_responses(["Ada", "Blue"]);

        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(term.prompts(), vec!["Name?".to_string(), "Color?".to_string()]);
        assert_eq!(ctx.get_str("name"), Some("Ada"));
        assert_eq!(ctx.get_str("color"), Some("Blue"));

        // Both answered: later passes prompt nobody
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(term.prompts().len(), 2);
    }

    #[test]
    fn test_unfocused_readable_does_not_prompt() {
        let first = Node::readable(Ask("First?", "a"));
        let second = Node::readable(Ask("Second?", "b"));
        let second_id = second.id();
        let (mut r, mut scene, mut ctx, _) = setup(vec![first, second]);
        scene.goto(second_id);
        let mut term = MemoryTerminal::new().with_responses(["x"]);

        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(term.prompts(), vec!["Second?".to_string()]);
    }

    #[test]
    fn test_typed_output_only_on_first_render() {
        struct Typed;
        impl Lifecycle for Typed {
            fn watched_keys(&self) -> &[&'static str] {
                &["k"]
            }
        }
        impl Renderable for Typed {
            fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
                Output::typed("welcome", Duration::from_millis(1))
            }
        }

        let (mut r, mut scene, mut ctx, mut term) = setup(vec![Node::display(Typed)]);
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        ctx.set("k", 1);
        pass(&mut r, &mut scene, &mut ctx, &mut term);

        assert_eq!(term.typed(), vec!["welcome".to_string()]);
        assert_eq!(term.screen(), "welcome\n");
    }

    #[test]
    fn test_after_render_only_on_first_pass() {
        struct Once(Arc<AtomicUsize>);
        impl Lifecycle for Once {
            fn after_render(&mut self, _cx: &mut NodeCtx<'_>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        impl Renderable for Once {
            fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
                Output::plain("x")
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let (mut r, mut scene, mut ctx, mut term) =
            setup(vec![Node::display(Once(count.clone()))]);
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(r.pass_count(), 2);
    }

    #[test]
    fn test_after_render_waits_for_a_completed_pass() {
        struct Once(Arc<AtomicUsize>);
        impl Lifecycle for Once {
            fn after_render(&mut self, _cx: &mut NodeCtx<'_>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        impl Renderable for Once {
            fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
                Output::plain("menu")
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let splash = Node::display(Line::new("splash")).hide_after_render();
        let (mut r, mut scene, mut ctx, mut term) =
            setup(vec![splash, Node::display(Once(count.clone()))]);

        assert_eq!(pass(&mut r, &mut scene, &mut ctx, &mut term), PassOutcome::Interrupted);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert_eq!(pass(&mut r, &mut scene, &mut ctx, &mut term), PassOutcome::Completed);
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        r.reset();
        r.set_buffer(scene.node_ids());
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shape_change_sets_buffer() {
        let logo = Node::display(Line::new("logo")).hide_after_render();
        let (mut r, mut scene, mut ctx, mut term) =
            setup(vec![logo, Node::display(Line::new("after"))]);
        assert!(r.take_buffer_set());

        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert!(r.take_buffer_set());
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert!(!r.take_buffer_set());
    }

    #[test]
    fn test_group_renders_children_in_order() {
        let (mut r, mut scene, mut ctx, mut term) = setup(vec![Node::group(vec![
            Node::display(Line::new("one")),
            Node::display(Line::new("two")),
        ])]);
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert_eq!(term.screen(), "one\ntwo\n");
    }

    #[test]
    fn test_pending_changes_cleared_after_full_pass() {
        let (mut r, mut scene, mut ctx, mut term) = setup(vec![Node::display(Line::new("x"))]);
        ctx.set("anything", true);
        assert!(ctx.has_pending_changes());
        pass(&mut r, &mut scene, &mut ctx, &mut term);
        assert!(!ctx.has_pending_changes());
    }
}
