//! Key/value backends for the ranking store
//!
//! Values are JSON text. A missing key reads as `None`; deleting a missing key succeeds.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{create_dir_all, read_to_string, remove_file, write};
use tokio::sync::RwLock;

use crate::error::KvError;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Batch read; the result lines up with `keys`.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, KvError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted list of stored keys
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, KvError> {
        let entries = self.entries.read().await;
        Ok(keys.iter().map(|key| entries.get(key).cloned()).collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FsKvStore {
    path: PathBuf,
}

impl FsKvStore {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, KvError> {
        let path = path.into();
        create_dir_all(&path).await?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.path.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KvStore for FsKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match read_to_string(self.file_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        Ok(write(self.file_for(key), value).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        match remove_file(self.file_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.put("a", "1").await.unwrap();
        store.put("b", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        let keys = vec!["b".to_string(), "missing".to_string(), "a".to_string()];
        assert_eq!(
            store.get_many(&keys).await.unwrap(),
            vec![Some("2".to_string()), None, Some("1".to_string())]
        );

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.keys().await, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_fs_store_crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKvStore::new(dir.path().join("kv")).await.unwrap();
        let key = "ranking:entry:https://example.com";

        assert_eq!(store.get(key).await.unwrap(), None);
        store.put(key, r#"{"score":90}"#).await.unwrap();
        assert_eq!(store.get(key).await.unwrap().as_deref(), Some(r#"{"score":90}"#));

        // Default batch read goes through `get`
        let many = store
            .get_many(&[key.to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(many.len(), 2);
        assert!(many[0].is_some());
        assert!(many[1].is_none());

        store.delete(key).await.unwrap();
        store.delete(key).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fs_store_keys_do_not_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKvStore::new(dir.path()).await.unwrap();
        store.put("../outside", "x").await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["..%2Foutside.json".to_string()]);
    }
}
