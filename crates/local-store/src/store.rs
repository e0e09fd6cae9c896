use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;

/// Core trait for durable local key-value storage.
///
/// Implementations must be thread-safe (Send + Sync). Writes are durable on
/// a best-effort basis: callers that treat in-memory state as the source of
/// truth log write failures instead of propagating them.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Returns the raw value stored under `key`, or None if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any existing value.
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Removes the value stored under `key`. Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Extension trait providing JSON convenience methods for local stores.
#[async_trait]
pub trait LocalStoreExt: LocalStore {
    /// Reads and deserializes a JSON value, or None if the key is absent.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes a value to JSON and stores it under `key`.
    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.put(key, raw).await
    }
}

#[async_trait]
impl<S: LocalStore + ?Sized> LocalStoreExt for S {}
