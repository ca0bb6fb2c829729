//! Engine - Scene registry and the render loop driver.
//!
//! The engine owns the process-wide [`Context`], the registered scenes, the
//! [`Renderer`] and the [`Terminal`]. Exactly one scene is current.
//!
//! - `add_scenes` registers scenes (registration order is kept) and
//!   transitions to the initial one
//! - `transition` ends the current scene and loads another
//! - `step` drains pending keys and runs one render pass
//! - `start` moves the engine onto its own render thread
//! - `on_event` listens for [`EngineEvent`]s
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::{Engine, Scene, MemoryTerminal};
//! use nera_tui::primitives::{question, text};
//!
//! let mut engine = Engine::new(MemoryTerminal::new().with_responses(["Ada"]));
//! engine.add_scenes(
//!     [("intro", Scene::new(vec![text("Hello"), question("Name?").store_as("name").into()]))],
//!     None,
//! )?;
//! let handle = engine.start()?;
//! handle.wait()?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use serde_json::Value;
use tracing::{debug, info};

use super::events::{EngineEvent, EngineEventKind, EngineEvents, ListenerId};
use super::router::{InputRouter, KeyRoute, Shortcut};
use super::scene::Scene;
use crate::config::EngineConfig;
use crate::diagnostics::Snapshot;
use crate::error::{EngineError, Result};
use crate::renderer::{PassOutcome, Renderer, Terminal};
use crate::state::Context;

/// What the loop should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The pass completed. Sleep one tick.
    Idle,
    /// The pass stopped early. Run the next one right away.
    Again,
    /// Stop the loop.
    Quit,
}

pub struct Engine<T: Terminal> {
    config: EngineConfig,
    context: Context,
    scenes: HashMap<String, Scene>,
    order: Vec<String>,
    current: Option<String>,
    renderer: Renderer,
    router: InputRouter,
    terminal: T,
    snapshot: Snapshot,
    events: EngineEvents,
    quit: bool,
}

impl<T: Terminal> Engine<T> {
    pub fn new(terminal: T) -> Self {
        Self::with_config(terminal, EngineConfig::default())
    }

    pub fn with_config(terminal: T, config: EngineConfig) -> Self {
        let snapshot = Snapshot::from_config(&config);
        Self {
            config,
            context: Context::new(),
            scenes: HashMap::new(),
            order: Vec::new(),
            current: None,
            renderer: Renderer::new(),
            router: InputRouter::new(),
            terminal,
            snapshot,
            events: EngineEvents::new(),
            quit: false,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Seed context values. Changes reach watching nodes on the next pass.
    pub fn set_context<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.context.extend(values);
    }

    pub fn current_scene_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current.as_ref().and_then(|name| self.scenes.get(name))
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut Scene> {
        self.current.as_ref().and_then(|name| self.scenes.get_mut(name))
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// Registered scene names, in registration order.
    pub fn scene_names(&self) -> &[String] {
        &self.order
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn router_mut(&mut self) -> &mut InputRouter {
        &mut self.router
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub fn on_event<F>(&mut self, kind: EngineEventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + Send + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn off_event(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    fn emit_buffer_set(&mut self) {
        if !self.renderer.take_buffer_set() {
            return;
        }
        let Some(scene) = self.current.clone() else {
            return;
        };
        let nodes = self.renderer.buffer().to_vec();
        self.events.emit(EngineEvent::BufferSet { scene, nodes });
    }

    // =========================================================================
    // SCENES
    // =========================================================================

    /// Register a scene without making it current. A scene registered under
    /// a taken name replaces the old one and keeps its place in the order.
    pub fn add_scene(&mut self, name: impl Into<String>, scene: Scene) {
        let name = name.into();
        if !self.scenes.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.scenes.insert(name, scene);
    }

    /// Register `scenes` and transition to `initial`, or to the first scene
    /// given when `initial` is None.
    pub fn add_scenes<N: Into<String>>(
        &mut self,
        scenes: impl IntoIterator<Item = (N, Scene)>,
        initial: Option<&str>,
    ) -> Result<()> {
        let mut first = None;
        for (name, scene) in scenes {
            let name = name.into();
            first.get_or_insert_with(|| name.clone());
            self.add_scene(name, scene);
        }
        if self.scenes.is_empty() {
            return Err(EngineError::NoScenes);
        }

        let target = match (initial, first) {
            (Some(name), _) => name.to_string(),
            (None, Some(name)) => name,
            (None, None) => return Err(EngineError::NoScenes),
        };
        self.transition(&target)
    }

    /// Make `name` the current scene.
    ///
    /// The renderer forgets the previous scene, the previous scene gets
    /// `on_end` on all of its nodes and drops its dependency index, then the
    /// new scene rebuilds its index and starts its nodes.
    pub fn transition(&mut self, name: &str) -> Result<()> {
        if !self.scenes.contains_key(name) {
            return Err(EngineError::UnknownScene(name.to_string()));
        }

        self.renderer.reset();
        let previous = self.current.take();
        if let Some(previous) = &previous {
            if let Some(scene) = self.scenes.get_mut(previous) {
                scene.on_will_transition(&mut self.context);
                scene.clear_dependencies();
                // Requests made while leaving are moot
                scene.take_transition();
                scene.take_quit();
            }
        }

        let scene = self
            .scenes
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownScene(name.to_string()))?;
        scene.set_cascade_limit(self.config.cascade_limit);
        scene.rebuild_dependencies();
        scene.on_loaded(&mut self.context);
        scene.take_structure_changed();
        self.renderer.set_buffer(scene.node_ids());
        self.current = Some(name.to_string());

        info!(scene = name, "transition");
        self.snapshot.record(format!("transition to {name}"));
        self.emit_buffer_set();
        self.events.emit(EngineEvent::SceneTransitioned {
            from: previous,
            to: name.to_string(),
        });
        Ok(())
    }

    // =========================================================================
    // LOOP
    // =========================================================================

    /// Run one render pass over the current scene, then apply any transition
    /// or quit a node asked for.
    pub fn render_pass(&mut self) -> Result<PassOutcome> {
        let name = self.current.clone().ok_or(EngineError::NoScenes)?;
        let scene = self
            .scenes
            .get_mut(&name)
            .ok_or_else(|| EngineError::UnknownScene(name.clone()))?;

        let mut outcome = if scene.has_pending_exit() {
            PassOutcome::Interrupted
        } else {
            self.renderer
                .render_pass(scene, &mut self.context, &self.router, &mut self.terminal)?
        };
        let quit_requested = scene.take_quit();
        let next = scene.take_transition();
        self.emit_buffer_set();

        if quit_requested || outcome == PassOutcome::Quit {
            outcome = PassOutcome::Quit;
            self.quit = true;
        }
        if let Some(next) = next {
            if !self.quit {
                self.transition(&next)?;
                outcome = PassOutcome::Interrupted;
            }
        }
        Ok(outcome)
    }

    /// Route pending keys, then render once.
    pub fn step(&mut self) -> Result<Step> {
        self.drain_keys()?;
        if self.quit {
            return Ok(Step::Quit);
        }
        let step = match self.render_pass()? {
            PassOutcome::Completed => Step::Idle,
            PassOutcome::Interrupted => Step::Again,
            PassOutcome::Quit => Step::Quit,
        };
        Ok(if self.quit { Step::Quit } else { step })
    }

    fn drain_keys(&mut self) -> Result<()> {
        while let Some(key) = self.terminal.try_read_key()? {
            let Some(name) = self.current.clone() else {
                return Ok(());
            };
            let Some(scene) = self.scenes.get_mut(&name) else {
                return Ok(());
            };
            match self.router.route_key(scene, &mut self.context, &key) {
                KeyRoute::Shortcut(Shortcut::Quit) => {
                    debug!("quit requested from keyboard");
                    self.quit = true;
                    return Ok(());
                }
                KeyRoute::Shortcut(Shortcut::Transition(next)) => self.transition(&next)?,
                KeyRoute::Consumed | KeyRoute::Ignored => {}
            }
        }
        Ok(())
    }

    /// Step until quit, an error, or `running` going false, sleeping one tick
    /// after every completed pass. Emits [`EngineEvent::EngineStart`] first
    /// and [`EngineEvent::EngineStopped`] once the loop ends, error or not.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        self.events.emit(EngineEvent::EngineStart);
        let result = self.run_loop(running);
        self.events.emit(EngineEvent::EngineStopped);
        result
    }

    fn run_loop(&mut self, running: &AtomicBool) -> Result<()> {
        let tick = self.config.tick_rate();
        while running.load(Ordering::SeqCst) {
            match self.step()? {
                Step::Quit => break,
                Step::Again => continue,
                Step::Idle => thread::sleep(tick),
            }
        }
        Ok(())
    }
}

impl<T: Terminal + 'static> Engine<T> {
    /// Move the engine onto its render thread. See [`crate::pipeline::mount`].
    pub fn start(self) -> Result<crate::pipeline::EngineHandle> {
        crate::pipeline::mount(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
