//! File-backed store: one JSON document holding every key.
//!
//! The whole document is re-read on every access and rewritten on every set.
//! That is deliberately simple: the store holds a handful of small blobs and
//! last-write-wins is the specified semantics. A process-local mutex
//! serializes read-modify-write cycles so concurrent segment pipelines do
//! not tear the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;

use super::Store;

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or lazily create) a store at the given path
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Open the store at the configured default location
    pub async fn open_default() -> Result<Self> {
        Self::open(crate::config::store_path()?).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read store file: {}", self.path.display()))?;

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Store file is not valid JSON: {}", self.path.display()))
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let document = self.read_document().await?;
        Ok(document.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value);
        self.write_document(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("store.json"))
            .await
            .unwrap();

        store.set("credentials", json!({ "k": "v" })).await.unwrap();
        let value = store.get("credentials").await.unwrap().unwrap();
        assert_eq!(value, json!({ "k": "v" }));
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("store.json"))
            .await
            .unwrap();

        assert!(store.get("session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("store.json"))
            .await
            .unwrap();

        store.set("session", json!({ "v": 1 })).await.unwrap();
        store.set("session", json!({ "v": 2 })).await.unwrap();

        let value = store.get("session").await.unwrap().unwrap();
        assert_eq!(value, json!({ "v": 2 }));
    }
}
