//! Diagnostics - Debug snapshot written on shutdown.
//!
//! With `debug` enabled, the engine records notable events (transitions,
//! structural changes, errors) into a [`Snapshot`]. When the engine stops,
//! the snapshot is written to `<snapshot_dir>/snapshot-<timestamp>.txt`.
//!
//! Tracing covers live logging. The snapshot is the post-mortem: it survives
//! a panic on the render thread, because the thread's drop guard flushes it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use crate::config::EngineConfig;

const TIMESTAMP: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug)]
struct SnapshotLog {
    enabled: bool,
    dir: PathBuf,
    lines: Vec<String>,
}

/// Shared, append-only diagnostic log. Clones write to the same log.
#[derive(Debug, Clone)]
pub struct Snapshot {
    inner: Arc<Mutex<SnapshotLog>>,
}

impl Snapshot {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        let lines = if enabled {
            vec![banner("started")]
        } else {
            Vec::new()
        };
        Self {
            inner: Arc::new(Mutex::new(SnapshotLog {
                enabled,
                dir: dir.into(),
                lines,
            })),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.snapshot_dir, config.debug)
    }

    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    /// Append one entry. No-op unless enabled.
    pub fn record(&self, entry: impl AsRef<str>) {
        let mut log = self.inner.lock();
        if log.enabled {
            log.lines
                .push(format!("{} | time: {}", entry.as_ref(), Local::now().format(TIMESTAMP)));
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.clone()
    }

    /// Write the snapshot file. Returns its path, or None when disabled.
    ///
    /// The log is drained, so a second call only writes what was recorded
    /// in between.
    pub fn write(&self) -> io::Result<Option<PathBuf>> {
        let mut log = self.inner.lock();
        if !log.enabled {
            return Ok(None);
        }
        let mut lines = std::mem::take(&mut log.lines);
        lines.push(banner("ended"));

        let path = snapshot_path(&log.dir);
        fs::create_dir_all(&log.dir)?;
        fs::write(&path, lines.join("\n"))?;
        Ok(Some(path))
    }
}

fn banner(what: &str) -> String {
    format!(
        "=============== Snapshot {what} | time: {} ===============",
        Local::now().format(TIMESTAMP)
    )
}

fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(format!("snapshot-{}.txt", Local::now().format(TIMESTAMP)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_snapshot_records_nothing() {
        let snapshot = Snapshot::disabled();
        snapshot.record("ignored");
        assert!(snapshot.lines().is_empty());
        assert_eq!(snapshot.write().unwrap(), None);
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let snapshot = Snapshot::new(&logs, true);
        let shared = snapshot.clone();
        shared.record("transition to home");

        let path = snapshot.write().unwrap().unwrap();
        assert!(path.starts_with(&logs));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("Snapshot started"));
        assert!(text.contains("transition to home"));
        assert!(text.contains("Snapshot ended"));
        assert!(snapshot.lines().is_empty());
    }
}
