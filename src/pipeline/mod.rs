//! Pipeline - Running an engine on its own threads.
//!
//! ```text
//! input thread ──keys──► channel ──► render thread (Engine::run) ──► terminal
//! ```
//!
//! - The input thread is the terminal's [`InputCapture`](crate::state::InputCapture)
//! - The render thread owns the engine and steps it until quit or stop
//! - [`EngineHandle`] stops and joins both

pub mod mount;

pub use mount::{EngineHandle, mount};
