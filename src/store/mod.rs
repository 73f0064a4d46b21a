// src/store/mod.rs

//! Per-target artifact persistence.
//!
//! The store is the only state shared between concurrently running cycles.
//! Writes happen only on a cycle's success path.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::ConfigSection;
use crate::errors::Result;
use crate::types::StoreMode;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Last accepted, normalized body of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub id: i64,
    pub last_fetch: DateTime<Utc>,
    pub content: Vec<u8>,
}

/// Identity of a stored watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey {
    pub name: String,
    pub url: String,
}

impl WatchKey {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// `None` when the target was never stored.
    async fn get_artifact(&self, name: &str, url: &str) -> Result<Option<StoredArtifact>>;

    /// Store the first artifact of a target; returns its id.
    async fn insert_artifact(&self, name: &str, url: &str, content: &[u8]) -> Result<i64>;

    /// Replace the content and refresh the last-fetch time.
    async fn update_artifact(&self, id: i64, content: &[u8]) -> Result<()>;

    /// Drop every stored watch whose key is not in `keep`. Returns the number
    /// of removed rows.
    async fn prune(&self, keep: &[WatchKey]) -> Result<usize>;
}

/// Open the store selected by `[config].store`.
pub async fn open_store(cfg: &ConfigSection) -> Result<Arc<dyn ArtifactStore>> {
    match cfg.store {
        StoreMode::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreMode::Sqlite => Ok(Arc::new(SqliteStore::connect(&cfg.database).await?)),
    }
}

/// Short content fingerprint for logs.
pub fn fingerprint(content: &[u8]) -> String {
    blake3::hash(content).to_hex()[..16].to_string()
}
