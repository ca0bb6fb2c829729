//! Engine - Nodes, scenes and the loop that drives them.
//!
//! - Node: Display / readable / group units and their hooks
//! - Scene: Ordered nodes, focus over readable nodes, change delivery
//! - Router: Responses and raw keys into the current scene
//! - Registry: The engine itself, owning context, scenes and terminal
//! - Events: Listeners for transitions, buffer changes, loop start and stop
//!
//! # Architecture
//!
//! ```text
//! Context.set ──► DependencyGraph ──► on_change + dirty ──► Renderer pass
//!                                                             │
//!       InputRouter ◄── Terminal prompt (focused readable) ◄──┘
//! ```
//!
//! Nodes never hold references to their scene or the engine. Every hook
//! receives a [`NodeCtx`] and requests scene changes through it.

mod events;
mod node;
mod registry;
mod router;
mod scene;

pub use events::*;
pub use node::*;
pub use registry::*;
pub use router::*;
pub use scene::*;
