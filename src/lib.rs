//! # nera-tui
//!
//! Reactive scene engine for text terminals.
//!
//! ## Architecture
//!
//! An application is a set of named [`Scene`]s. A scene is an ordered list of
//! [`Node`]s: display nodes print text, readable nodes prompt for a response,
//! groups nest other nodes. All nodes of the engine share one [`Context`], a
//! key/value store with change detection:
//!
//! ```text
//! Context.set ──► DependencyGraph ──► on_change + dirty ──► render pass
//!                                                            │
//!      InputRouter ◄── focused readable prompts the terminal ◄┘
//! ```
//!
//! A render pass clears the terminal and re-prints the scene: clean nodes
//! come from the [`RenderCache`], dirty nodes render again, static nodes
//! render once. At most one readable node is focused at a time and only it
//! prompts, unless it is waiting on a deferred key: then the next pending
//! readable asks first and focus returns once the key appears.
//!
//! ## Modules
//!
//! - [`types`] - Node ids, flags, output and prompts
//! - [`state`] - Context, dependency index, focus cursor, keyboard input
//! - [`engine`] - Nodes, scenes, input routing and the engine itself
//! - [`renderer`] - Render passes, the render cache and terminals
//! - [`pipeline`] - Running an engine on its own render and input threads
//! - [`primitives`] - Ready-made text and input nodes
//! - [`assets`] - Pak folder validation and staging
//! - [`audio`] - Playback collaborator and the now-playing node
//! - [`diagnostics`] - Debug snapshot written on shutdown
//! - [`config`] / [`error`] - Engine configuration and errors

pub mod assets;
pub mod audio;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod renderer;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::EngineConfig;
pub use error::{EngineError, Result};

pub use engine::{
    Body, Engine, EngineEvent, EngineEventKind, EngineEvents, InputRouter, KeyRoute, Lifecycle,
    Node, NodeCtx, OptionTable, Placement, Readable, Renderable, Scene, SceneCommand, Shortcut,
    Step,
};

pub use renderer::{
    CrosstermTerminal, MemoryTerminal, PassOutcome, RenderCache, RenderSnapshot, Renderer,
    Terminal,
};

pub use pipeline::{EngineHandle, mount};

pub use primitives::{
    Computed, Question, Selection, Text, TypedBlock, TypedText, computed, question, selection,
    text, typed_block, typed_text,
};

pub use state::{
    Context, DependencyGraph, FocusCursor, InputCapture, InputEvent, KeyState, KeyboardEvent,
    Modifiers,
};

pub use assets::{Asset, AssetBundle, AssetKind, PakLayout};
pub use audio::{AudioPlayer, NowPlaying, PlaybackEvent, PlaybackWatcher, SilentPlayer, TrackInfo};
pub use diagnostics::Snapshot;
