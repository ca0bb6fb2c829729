//! Input Router - Delivers responses and raw keys to a scene
//!
//! Two kinds of input reach a scene:
//!
//! - **Responses** - a completed line or selection from a prompt, always for
//!   the readable node that prompted ([`InputRouter::deliver`])
//! - **Keys** - raw key presses read between passes ([`InputRouter::route_key`]),
//!   checked against global shortcuts before they are offered to nodes
//!
//! Ctrl+C is always bound to [`Shortcut::Quit`].

use std::collections::HashMap;

use tracing::{debug, trace};

use super::scene::Scene;
use crate::state::{Context, KeyboardEvent, Modifiers};
use crate::types::NodeId;

/// Engine-level action bound to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortcut {
    Quit,
    Transition(String),
}

/// What happened to a routed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRoute {
    /// A global shortcut matched.
    Shortcut(Shortcut),
    /// A node consumed the key.
    Consumed,
    /// Nobody wanted it.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Binding {
    key: String,
    modifiers: Modifiers,
}

impl Binding {
    fn of(event: &KeyboardEvent) -> Self {
        Self {
            key: event.key.clone(),
            modifiers: event.modifiers,
        }
    }
}

#[derive(Debug)]
pub struct InputRouter {
    shortcuts: HashMap<Binding, Shortcut>,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRouter {
    pub fn new() -> Self {
        let mut router = Self {
            shortcuts: HashMap::new(),
        };
        router.bind(
            KeyboardEvent::with_modifiers("c", Modifiers::ctrl()),
            Shortcut::Quit,
        );
        router
    }

    /// Bind a global shortcut. Replaces any previous binding for the key.
    pub fn bind(&mut self, key: KeyboardEvent, shortcut: Shortcut) {
        self.shortcuts.insert(Binding::of(&key), shortcut);
    }

    pub fn unbind(&mut self, key: &KeyboardEvent) -> Option<Shortcut> {
        self.shortcuts.remove(&Binding::of(key))
    }

    pub fn shortcut_for(&self, key: &KeyboardEvent) -> Option<&Shortcut> {
        self.shortcuts.get(&Binding::of(key))
    }

    /// Hand a prompt response to the node that prompted for it.
    pub fn deliver(
        &self,
        scene: &mut Scene,
        context: &mut Context,
        target: NodeId,
        response: &str,
    ) {
        trace!(node = %target, focused = ?scene.focused(), "delivering response");
        scene.respond(context, target, response);
    }

    /// Route one raw key. Only presses are routed.
    pub fn route_key(
        &self,
        scene: &mut Scene,
        context: &mut Context,
        key: &KeyboardEvent,
    ) -> KeyRoute {
        if !key.is_press() {
            return KeyRoute::Ignored;
        }
        if let Some(shortcut) = self.shortcut_for(key) {
            debug!(key = %key.key, ?shortcut, "shortcut");
            return KeyRoute::Shortcut(shortcut.clone());
        }
        if scene.route_key(context, key) {
            KeyRoute::Consumed
        } else {
            KeyRoute::Ignored
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::node::{Lifecycle, Node, NodeCtx, Renderable};
    use crate::state::KeyState;
    use crate::types::Output;

    struct Counter;

    impl Lifecycle for Counter {
        fn on_key(&mut self, cx: &mut NodeCtx<'_>, key: &KeyboardEvent) -> bool {
            if key.key != "+" {
                return false;
            }
            let n = cx.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            cx.set("count", n + 1);
            true
        }
    }

    impl Renderable for Counter {
        fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
            Output::empty()
        }
    }

    #[test]
    fn test_ctrl_c_quits() {
        let router = InputRouter::new();
        let mut scene = Scene::new(vec![Node::display(Counter)]);
        let mut ctx = Context::new();
        let ctrl_c = KeyboardEvent::with_modifiers("c", Modifiers::ctrl());
        assert_eq!(
            router.route_key(&mut scene, &mut ctx, &ctrl_c),
            KeyRoute::Shortcut(Shortcut::Quit)
        );
    }

    #[test]
    fn test_keys_reach_nodes() {
        let router = InputRouter::new();
        let mut scene = Scene::new(vec![Node::display(Counter)]);
        let mut ctx = Context::new();

        let plus = KeyboardEvent::new("+");
        assert_eq!(router.route_key(&mut scene, &mut ctx, &plus), KeyRoute::Consumed);
        assert_eq!(router.route_key(&mut scene, &mut ctx, &plus), KeyRoute::Consumed);
        assert_eq!(ctx.get("count").and_then(|v| v.as_i64()), Some(2));

        let other = KeyboardEvent::new("x");
        assert_eq!(router.route_key(&mut scene, &mut ctx, &other), KeyRoute::Ignored);
    }

    #[test]
    fn test_releases_are_ignored() {
        let router = InputRouter::new();
        let mut scene = Scene::new(vec![Node::display(Counter)]);
        let mut ctx = Context::new();
        let mut release = KeyboardEvent::new("+");
        release.state = KeyState::Release;
        assert_eq!(router.route_key(&mut scene, &mut ctx, &release), KeyRoute::Ignored);
        assert!(ctx.get("count").is_none());
    }

    #[test]
    fn test_custom_shortcut() {
        let mut router = InputRouter::new();
        let f1 = KeyboardEvent::new("F1");
        router.bind(f1.clone(), Shortcut::Transition("help".into()));
        let mut scene = Scene::new(vec![]);
        assert_eq!(
            router.route_key(&mut scene, &mut Context::new(), &f1),
            KeyRoute::Shortcut(Shortcut::Transition("help".into()))
        );
        assert_eq!(router.unbind(&f1), Some(Shortcut::Transition("help".into())));
    }

    #[test]
    fn test_deliver_goes_to_prompting_node() {
        use crate::engine::node::Readable;
        use crate::types::Prompt;

        struct Name;
        impl Lifecycle for Name {}
        impl Readable for Name {
            fn prompt(&mut self, _cx: &mut NodeCtx<'_>) -> Prompt {
                Prompt::line("name?")
            }
            fn on_response(&mut self, cx: &mut NodeCtx<'_>, response: &str) {
                cx.set("name", response);
                cx.disable();
            }
        }

        let router = InputRouter::new();
        let name = Node::readable(Name);
        let id = name.id();
        let mut scene = Scene::new(vec![name]);
        let mut ctx = Context::new();
        router.deliver(&mut scene, &mut ctx, id, "Ada");
        assert_eq!(ctx.get_str("name"), Some("Ada"));
        assert_eq!(scene.focused(), None);
    }
}
