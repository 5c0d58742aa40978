//! In-memory option store with change notifications.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::Result;

use super::OptionsStore;

// ============================================================================
// Constants
// ============================================================================

/// Change batches buffered per subscriber before old ones are dropped.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// StorageChange
// ============================================================================

/// One changed key, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    /// The changed key.
    pub key: String,

    /// The new value, `null` if the key was removed.
    #[serde(rename = "newValue")]
    pub new_value: Value,
}

impl StorageChange {
    /// Creates a change record.
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, new_value: Value) -> Self {
        Self {
            key: key.into(),
            new_value,
        }
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Key/value store kept in memory.
///
/// Every [`MemoryStore::set`] or [`MemoryStore::remove`] that actually changes
/// something is broadcast as one batch to all subscribers.
pub struct MemoryStore {
    values: RwLock<Map<String, Value>>,
    changes: broadcast::Sender<Vec<StorageChange>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_values(Map::new())
    }

    /// Creates a store pre-populated with `values`.
    #[must_use]
    pub fn with_values(values: Map<String, Value>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: RwLock::new(values),
            changes,
        }
    }

    /// Stores `items`, notifying subscribers of the keys whose value changed.
    pub fn set(&self, items: Map<String, Value>) {
        let changed: Vec<StorageChange> = {
            let mut values = self.values.write();
            items
                .into_iter()
                .filter_map(|(key, value)| {
                    if values.get(&key) == Some(&value) {
                        return None;
                    }
                    values.insert(key.clone(), value.clone());
                    Some(StorageChange::new(key, value))
                })
                .collect()
        };
        self.notify(changed);
    }

    /// Removes `keys`, notifying subscribers with `null` new values.
    pub fn remove(&self, keys: &[&str]) {
        let changed: Vec<StorageChange> = {
            let mut values = self.values.write();
            keys.iter()
                .filter(|key| values.remove(**key).is_some())
                .map(|key| StorageChange::new(*key, Value::Null))
                .collect()
        };
        self.notify(changed);
    }

    /// Returns a stored value.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn notify(&self, changed: Vec<StorageChange>) {
        if changed.is_empty() {
            return;
        }
        debug!(keys = changed.len(), "Storage changed");
        // No subscribers is fine.
        let _ = self.changes.send(changed);
    }
}

#[async_trait]
impl OptionsStore for MemoryStore {
    async fn get(&self, defaults: Map<String, Value>) -> Result<Map<String, Value>> {
        let values = self.values.read();
        Ok(defaults
            .into_iter()
            .map(|(key, default)| {
                let value = values.get(&key).cloned().unwrap_or(default);
                (key, value)
            })
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<StorageChange>> {
        self.changes.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio_test::assert_ok;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_get_fills_defaults() {
        let store = MemoryStore::with_values(map(json!({ "a": 1, "other": true })));
        let got = assert_ok!(store.get(map(json!({ "a": 0, "b": "x" }))).await);
        assert_eq!(Value::Object(got), json!({ "a": 1, "b": "x" }));
    }

    #[tokio::test]
    async fn test_set_broadcasts_changed_keys_only() {
        let store = MemoryStore::with_values(map(json!({ "a": 1 })));
        let mut rx = store.subscribe();

        store.set(map(json!({ "a": 1, "b": 2 })));

        let changes = rx.recv().await.expect("changes");
        assert_eq!(changes, vec![StorageChange::new("b", json!(2))]);
        assert_eq!(store.value("b"), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_noop_set_is_silent() {
        let store = MemoryStore::with_values(map(json!({ "a": 1 })));
        let mut rx = store.subscribe();
        store.set(map(json!({ "a": 1 })));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_remove_reports_null() {
        let store = MemoryStore::with_values(map(json!({ "a": 1 })));
        let mut rx = store.subscribe();
        store.remove(&["a", "missing"]);
        let changes = rx.recv().await.expect("changes");
        assert_eq!(changes, vec![StorageChange::new("a", Value::Null)]);
        assert!(store.value("a").is_none());
    }

    #[test]
    fn test_change_wire_format() {
        let change = StorageChange::new("ifConflictThen", json!("overwrite"));
        assert_eq!(
            serde_json::to_value(&change).expect("serialize"),
            json!({ "key": "ifConflictThen", "newValue": "overwrite" })
        );
    }
}
