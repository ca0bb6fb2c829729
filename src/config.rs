//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! tick_rate_ms = 100
//! debug = true
//! snapshot_dir = "logs"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sleep between render passes.
    pub tick_rate_ms: u64,
    /// Record a diagnostic snapshot and write it on shutdown.
    pub debug: bool,
    /// Directory the diagnostic snapshot is written to.
    pub snapshot_dir: PathBuf,
    /// Upper bound on chained change notifications per flush.
    pub cascade_limit: usize,
    /// Default per-character delay for typed output.
    pub typing_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            debug: false,
            snapshot_dir: PathBuf::from("logs"),
            cascade_limit: 32,
            typing_delay_ms: 5,
        }
    }
}

impl EngineConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }
}
