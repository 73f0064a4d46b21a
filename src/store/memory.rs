// src/store/memory.rs

use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::errors::Result;

use super::{ArtifactStore, StoredArtifact, WatchKey};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    by_key: BTreeMap<WatchKey, StoredArtifact>,
}

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_key.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn get_artifact(&self, name: &str, url: &str) -> Result<Option<StoredArtifact>> {
        let inner = self.inner.lock().await;
        Ok(inner.by_key.get(&WatchKey::new(name, url)).cloned())
    }

    async fn insert_artifact(&self, name: &str, url: &str, content: &[u8]) -> Result<i64> {
        let mut inner = self.inner.lock().await;
        let key = WatchKey::new(name, url);
        if inner.by_key.contains_key(&key) {
            return Err(anyhow!("artifact for '{name}' ({url}) already exists").into());
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.by_key.insert(
            key,
            StoredArtifact {
                id,
                last_fetch: Utc::now(),
                content: content.to_vec(),
            },
        );
        Ok(id)
    }

    async fn update_artifact(&self, id: i64, content: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.by_key.values_mut().find(|a| a.id == id) {
            Some(artifact) => {
                artifact.content = content.to_vec();
                artifact.last_fetch = Utc::now();
                Ok(())
            }
            None => Err(anyhow!("no artifact with id {id}").into()),
        }
    }

    async fn prune(&self, keep: &[WatchKey]) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let before = inner.by_key.len();
        inner.by_key.retain(|key, _| keep.contains(key));
        Ok(before - inner.by_key.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_get_update() {
        let store = MemoryStore::new();
        assert!(store.get_artifact("a", "u").await.unwrap().is_none());

        let id = store.insert_artifact("a", "u", b"one").await.unwrap();
        let stored = store.get_artifact("a", "u").await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.content, b"one");

        store.update_artifact(id, b"two").await.unwrap();
        let stored = store.get_artifact("a", "u").await.unwrap().unwrap();
        assert_eq!(stored.content, b"two");
        assert!(store.insert_artifact("a", "u", b"x").await.is_err());
    }

    #[tokio::test]
    async fn prune_removes_unconfigured() {
        let store = MemoryStore::new();
        store.insert_artifact("a", "u", b"1").await.unwrap();
        store.insert_artifact("b", "u", b"2").await.unwrap();
        let removed = store.prune(&[WatchKey::new("a", "u")]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
    }
}
