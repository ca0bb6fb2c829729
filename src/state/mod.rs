//! State Module - Runtime state management systems
//!
//! This module contains the state systems that power reactivity and input:
//!
//! - **Context** - Key/value store with equality-based change detection
//! - **Dependency** - Key → dependent node index
//! - **Focus** - Read pointer over a scene's readable nodes
//! - **Keyboard** - Key event types
//! - **Input** - crossterm conversion and the input-capture thread

mod context;
mod dependency;
mod focus;
mod keyboard;
pub mod input;

pub use context::*;
pub use dependency::*;
pub use focus::*;
pub use keyboard::*;
pub use input::{InputCapture, InputEvent};
