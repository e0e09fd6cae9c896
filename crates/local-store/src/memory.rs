//! In-memory local store for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::store::LocalStore;
use crate::{Result, StoreError};

#[derive(Debug, Default)]
struct InMemoryState {
    entries: HashMap<String, String>,
    put_count: u64,
    fail_on_put: bool,
}

/// In-memory local store for testing.
///
/// Supports failure injection for exercising best-effort persistence paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocalStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryLocalStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on subsequent put calls.
    pub fn set_fail_on_put(&self, fail: bool) {
        self.state.write().unwrap().fail_on_put = fail;
    }

    /// Returns the number of successful put calls so far.
    pub fn put_count(&self) -> u64 {
        self.state.read().unwrap().put_count
    }

    /// Returns true if a value is stored under the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().unwrap().entries.contains_key(key)
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.state.read().unwrap().entries.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.read().unwrap().entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_put {
            return Err(StoreError::Io(std::io::Error::other(
                "simulated write failure",
            )));
        }

        state.entries.insert(key.to_string(), value);
        state.put_count += 1;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.state.write().unwrap().entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove_roundtrip() {
        let store = InMemoryLocalStore::new();

        store.put("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.put_count(), 1);

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_missing_key_is_noop() {
        let store = InMemoryLocalStore::new();
        store.remove("absent").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn fail_on_put_leaves_entries_untouched() {
        let store = InMemoryLocalStore::new();
        store.put("k", "v1".to_string()).await.unwrap();

        store.set_fail_on_put(true);
        let result = store.put("k", "v2".to_string()).await;
        assert!(result.is_err());

        store.set_fail_on_put(false);
        assert_eq!(store.get("k").await.unwrap(), Some("v1".to_string()));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryLocalStore::new();
        let clone = store.clone();

        clone.put("k", "v".to_string()).await.unwrap();
        assert!(store.contains_key("k"));
    }
}
