//! Context - Shared key/value state with change detection
//!
//! The context is the single store that drives reactive invalidation:
//!
//! - `set` compares against the stored value and records the key only when it
//!   actually changed (equality, not identity)
//! - an absent key compares equal to `null`
//! - recorded changes are drained by the owning scene, which notifies the
//!   dependents registered in the [`DependencyGraph`](super::DependencyGraph)
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::state::Context;
//! use serde_json::json;
//!
//! let mut ctx = Context::new();
//! assert!(ctx.set("files", json!(["a.mp3"])));
//! assert!(!ctx.set("files", json!(["a.mp3"]))); // no diff
//! ```

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

static NULL: Value = Value::Null;

/// Key/value store scoped to one engine instance.
#[derive(Debug, Default, Clone)]
pub struct Context {
    store: HashMap<String, Value>,
    /// Keys changed since the last drain, in first-change order.
    changed: Vec<String>,
    /// Set on every effective change, cleared by the renderer after a pass.
    pending: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context seeded with initial values. Seeding records no changes.
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            store: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Store `value` under `key`.
    ///
    /// Returns false (and records nothing) when the value equals what is
    /// already stored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();

        if self.store.get(&key).unwrap_or(&NULL) == &value {
            trace!(key = %key, "context set without diff");
            return false;
        }

        trace!(key = %key, "context diff");
        self.store.insert(key.clone(), value);
        self.mark_changed(key);
        true
    }

    /// Set several keys at once. Returns true if any of them changed.
    pub fn extend<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> bool
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut any = false;
        for (key, value) in values {
            any |= self.set(key, value);
        }
        any
    }

    /// Remove a key. Removing a key that is absent or null is not a change.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let old = self.store.remove(key)?;
        if !old.is_null() {
            self.mark_changed(key.to_string());
        }
        Some(old)
    }

    fn mark_changed(&mut self, key: String) {
        self.pending = true;
        if !self.changed.contains(&key) {
            self.changed.push(key);
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    /// String value of `key`, if it holds one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn all(&self) -> &HashMap<String, Value> {
        &self.store
    }

    /// True when `key` exists and is not null.
    pub fn is_present(&self, key: &str) -> bool {
        matches!(self.store.get(key), Some(v) if !v.is_null())
    }

    /// Current values of `keys`, `null` for missing ones.
    pub fn values_of(&self, keys: &[&str]) -> Vec<Value> {
        keys.iter()
            .map(|k| self.store.get(*k).cloned().unwrap_or(Value::Null))
            .collect()
    }

    // =========================================================================
    // CHANGE TRACKING
    // =========================================================================

    /// Drain the keys changed since the last call.
    pub fn take_changes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.changed)
    }

    /// True if any key changed since the flag was last cleared.
    pub fn has_pending_changes(&self) -> bool {
        self.pending
    }

    pub fn clear_pending_changes(&mut self) {
        self.pending = false;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_records_change_once() {
        let mut ctx = Context::new();
        assert!(ctx.set("name", "Ada"));
        assert!(!ctx.set("name", "Ada"));
        assert_eq!(ctx.take_changes(), vec!["name".to_string()]);
        assert!(ctx.take_changes().is_empty());
    }

    #[test]
    fn test_equality_not_identity() {
        let mut ctx = Context::new();
        ctx.set("files", json!(["a", "b"]));
        ctx.take_changes();
        assert!(!ctx.set("files", json!(["a", "b"])));
        assert!(ctx.set("files", json!(["a"])));
    }

    #[test]
    fn test_absent_equals_null() {
        let mut ctx = Context::new();
        assert!(!ctx.set("files", Value::Null));
        assert!(!ctx.has_pending_changes());
        assert!(!ctx.is_present("files"));
    }

    #[test]
    fn test_values_of_fills_missing_with_null() {
        let ctx = Context::with_values([("a", 1)]);
        assert_eq!(ctx.values_of(&["a", "b"]), vec![json!(1), Value::Null]);
    }

    #[test]
    fn test_seeding_records_no_changes() {
        let mut ctx = Context::with_values([("a", 1)]);
        assert!(!ctx.has_pending_changes());
        assert!(ctx.take_changes().is_empty());
        assert!(ctx.is_present("a"));
    }

    #[test]
    fn test_repeated_changes_keep_first_order() {
        let mut ctx = Context::new();
        ctx.set("b", 1);
        ctx.set("a", 1);
        ctx.set("b", 2);
        assert_eq!(ctx.take_changes(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_remove() {
        let mut ctx = Context::with_values([("a", 1)]);
        assert_eq!(ctx.remove("a"), Some(json!(1)));
        assert_eq!(ctx.take_changes(), vec!["a".to_string()]);
        assert_eq!(ctx.remove("a"), None);
    }

    #[test]
    fn test_pending_flag() {
        let mut ctx = Context::new();
        ctx.set("a", true);
        assert!(ctx.has_pending_changes());
        ctx.clear_pending_changes();
        assert!(!ctx.has_pending_changes());
    }
}
