//! Engine Events - Listeners for engine lifecycle events
//!
//! The engine emits four events:
//!
//! - [`EngineEvent::BufferSet`] - the renderer's top-level node list was set,
//!   on a transition or after a pass changed the scene's shape
//! - [`EngineEvent::EngineStart`] - the render loop is about to run
//! - [`EngineEvent::EngineStopped`] - the render loop returned
//! - [`EngineEvent::SceneTransitioned`] - another scene became current
//!
//! Listeners are registered per kind and run in registration order on the
//! thread that owns the engine.
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::engine::{EngineEvent, EngineEventKind};
//!
//! engine.on_event(EngineEventKind::SceneTransitioned, |event| {
//!     if let EngineEvent::SceneTransitioned { to, .. } = event {
//!         tracing::info!(scene = %to, "now showing");
//!     }
//! });
//! ```

use std::collections::HashMap;

use tracing::trace;

use crate::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEventKind {
    BufferSet,
    EngineStart,
    EngineStopped,
    SceneTransitioned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    BufferSet { scene: String, nodes: Vec<NodeId> },
    EngineStart,
    EngineStopped,
    SceneTransitioned { from: Option<String>, to: String },
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            Self::BufferSet { .. } => EngineEventKind::BufferSet,
            Self::EngineStart => EngineEventKind::EngineStart,
            Self::EngineStopped => EngineEventKind::EngineStopped,
            Self::SceneTransitioned { .. } => EngineEventKind::SceneTransitioned,
        }
    }
}

// =============================================================================
// HANDLER TYPES
// =============================================================================

/// Listener for one kind of event. Must be `Send`: the engine moves to its
/// render thread when started.
pub type EventListener = Box<dyn FnMut(&EngineEvent) + Send>;

/// Returned by [`EngineEvents::on`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Default)]
pub struct EngineEvents {
    listeners: HashMap<EngineEventKind, Vec<(ListenerId, EventListener)>>,
    next_id: usize,
}

impl EngineEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EngineEventKind, listener: F) -> ListenerId
    where
        F: FnMut(&EngineEvent) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for listeners in self.listeners.values_mut() {
            if let Some(index) = listeners.iter().position(|(l, _)| *l == id) {
                listeners.remove(index);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, kind: EngineEventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    pub fn emit(&mut self, event: EngineEvent) {
        let Some(listeners) = self.listeners.get_mut(&event.kind()) else {
            return;
        };
        trace!(kind = ?event.kind(), listeners = listeners.len(), "engine event");
        for (_, listener) in listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for EngineEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .listeners
            .iter()
            .map(|(kind, listeners)| (*kind, listeners.len()))
            .collect();
        f.debug_struct("EngineEvents")
            .field("listeners", &counts)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
