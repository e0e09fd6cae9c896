//! File-backed local store.
//!
//! Each key maps to one file under the store's directory, mirroring the
//! key-value storage the client gets from the host platform. Values are
//! written whole; the next write of a key supersedes the previous one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;
use crate::store::LocalStore;

/// Local store persisting each key to a file in a directory.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    /// Creates a store rooted at the given directory.
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys from the key schema are already filesystem-safe; anything
        // else is mapped to '_' so a key can never escape the directory.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path());

        store.put("cart_items_guest", "[]".to_string()).await.unwrap();
        assert_eq!(
            store.get("cart_items_guest").await.unwrap(),
            Some("[]".to_string())
        );

        store.remove("cart_items_guest").await.unwrap();
        assert_eq!(store.get("cart_items_guest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path());
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_missing_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path());
        store.remove("absent").await.unwrap();
    }

    #[tokio::test]
    async fn hostile_key_stays_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path());

        store.put("../escape", "x".to_string()).await.unwrap();

        let path = store.path_for("../escape");
        assert!(path.starts_with(dir.path()));
        assert_eq!(store.get("../escape").await.unwrap(), Some("x".to_string()));
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path());

        store.put("k", "v1".to_string()).await.unwrap();
        store.put("k", "v2".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }
}
