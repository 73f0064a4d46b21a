// src/store/sqlite.rs

//! SQLite-backed [`ArtifactStore`].

use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::errors::Result;

use super::{ArtifactStore, StoredArtifact, WatchKey};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS watches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    last_fetch INTEGER NOT NULL,
    last_content BLOB NOT NULL,
    UNIQUE(name, url)
)";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;
        info!(path = %path.display(), "opened sqlite store");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| anyhow!("stored last_fetch {secs} is out of range").into())
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    async fn get_artifact(&self, name: &str, url: &str) -> Result<Option<StoredArtifact>> {
        let row = sqlx::query(
            "SELECT id, last_fetch, last_content FROM watches WHERE name = ? AND url = ?",
        )
        .bind(name)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StoredArtifact {
            id: row.get("id"),
            last_fetch: timestamp(row.get("last_fetch"))?,
            content: row.get("last_content"),
        }))
    }

    async fn insert_artifact(&self, name: &str, url: &str, content: &[u8]) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO watches (name, url, last_fetch, last_content) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(url)
        .bind(Utc::now().timestamp())
        .bind(content)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        debug!(name, url, id, "inserted watch");
        Ok(id)
    }

    async fn update_artifact(&self, id: i64, content: &[u8]) -> Result<()> {
        let result =
            sqlx::query("UPDATE watches SET last_fetch = ?, last_content = ? WHERE id = ?")
                .bind(Utc::now().timestamp())
                .bind(content)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("no watch with id {id}").into());
        }
        Ok(())
    }

    async fn prune(&self, keep: &[WatchKey]) -> Result<usize> {
        let rows = sqlx::query("SELECT id, name, url FROM watches")
            .fetch_all(&self.pool)
            .await?;

        let mut removed = 0;
        for row in rows.iter() {
            let key = WatchKey::new(row.get::<String, _>("name"), row.get::<String, _>("url"));
            if keep.contains(&key) {
                continue;
            }
            let id: i64 = row.get("id");
            sqlx::query("DELETE FROM watches WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            info!(name = %key.name, url = %key.url, "removed watch no longer in config");
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_and_prune() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(dir.path().join("nested/watch.db"))
            .await
            .unwrap();

        assert!(store.get_artifact("a", "u").await.unwrap().is_none());
        let id = store.insert_artifact("a", "u", b"first").await.unwrap();
        store.update_artifact(id, b"second").await.unwrap();

        let stored = store.get_artifact("a", "u").await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.content, b"second");

        // Unique on (name, url).
        assert!(store.insert_artifact("a", "u", b"dup").await.is_err());

        store.insert_artifact("b", "u", b"other").await.unwrap();
        let removed = store.prune(&[WatchKey::new("b", "u")]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_artifact("a", "u").await.unwrap().is_none());
        store.close().await;
    }
}
