use std::sync::Mutex;

use async_trait::async_trait;
use sitewatch::errors::Result;
use sitewatch::store::{ArtifactStore, MemoryStore, StoredArtifact, WatchKey};

/// One mutating call seen by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Insert { name: String, url: String, content: Vec<u8> },
    Update { id: i64, content: Vec<u8> },
    Prune { keep: usize },
}

/// A `MemoryStore` that records every write.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<StoreCall>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Insert { .. }))
            .count()
    }

    pub fn updates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Update { .. }))
            .count()
    }

    /// Seed an artifact without recording the call.
    pub async fn seed(&self, name: &str, url: &str, content: &[u8]) -> i64 {
        self.inner
            .insert_artifact(name, url, content)
            .await
            .expect("seeding store")
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn get_artifact(&self, name: &str, url: &str) -> Result<Option<StoredArtifact>> {
        self.inner.get_artifact(name, url).await
    }

    async fn insert_artifact(&self, name: &str, url: &str, content: &[u8]) -> Result<i64> {
        self.record(StoreCall::Insert {
            name: name.to_string(),
            url: url.to_string(),
            content: content.to_vec(),
        });
        self.inner.insert_artifact(name, url, content).await
    }

    async fn update_artifact(&self, id: i64, content: &[u8]) -> Result<()> {
        self.record(StoreCall::Update {
            id,
            content: content.to_vec(),
        });
        self.inner.update_artifact(id, content).await
    }

    async fn prune(&self, keep: &[WatchKey]) -> Result<usize> {
        self.record(StoreCall::Prune { keep: keep.len() });
        self.inner.prune(keep).await
    }
}
