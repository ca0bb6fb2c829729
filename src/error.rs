//! Error types for nera-tui.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no scenes were added to the engine")]
    NoScenes,

    #[error("scene '{0}' is not registered")]
    UnknownScene(String),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("asset bundle at {path} is invalid: {reason}")]
    Asset { path: PathBuf, reason: String },

    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("render thread panicked: {0}")]
    RenderThreadPanicked(String),

    #[error("engine was already stopped")]
    AlreadyStopped,
}

impl EngineError {
    pub(crate) fn asset(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Asset {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
