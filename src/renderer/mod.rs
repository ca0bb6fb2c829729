//! Renderer - Terminal output for the engine.
//!
//! - [`Renderer`] - runs render passes over the current scene
//! - [`RenderCache`] - last output of every node
//! - [`Terminal`] - the device passes write to and prompts read from
//!
//! # Pass lifecycle
//!
//! ```text
//! flush changes → beforeRender → clear → visit buffer → onTick → afterRender (first pass)
//! ```

mod cache;
mod pass;
mod terminal;

pub use cache::{RenderCache, RenderSnapshot};
pub use pass::{PassOutcome, Renderer};
pub use terminal::{CrosstermTerminal, MemoryTerminal, Terminal};
