//! TTL-bound document storage
//!
//! Documents are JSON values keyed by string, stored with an absolute
//! expiry timestamp. Expired entries read back as misses and are removed
//! lazily on access. `PersistentStore` is the on-disk implementation;
//! `MemoryStore` backs tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::error::EventopiaError;
use fjall::Keyspace;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;
use tracing::debug;

/// Async key/value store for JSON documents with per-entry TTL
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

// JSON payload is stored as a string because postcard has no
// self-describing format for arbitrary Value trees.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    json: String,
    expires_at: u64, // Unix timestamp (seconds)
}

fn expiry_timestamp(ttl: Duration) -> Result<u64> {
    Ok(SystemTime::now()
        .checked_add(ttl)
        .ok_or(anyhow!("TTL overflow"))?
        .duration_since(UNIX_EPOCH)?
        .as_secs())
}

fn now_timestamp() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Disk-backed document store
pub struct PersistentStore {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl PersistentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventopiaError> {
        let db = fjall::Database::builder(&path)
            .open()
            .map_err(|e| EventopiaError::store(e.to_string()))?;
        let items = db
            .keyspace("documents", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| EventopiaError::store(e.to_string()))?;
        Ok(PersistentStore { store: items })
    }
}

#[async_trait]
impl DocumentStore for PersistentStore {
    #[tracing::instrument(name = "store_get", level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry = postcard::from_bytes(&bytes)?;
        if now_timestamp()? < entry.expires_at {
            debug!("Key found and still fresh");
            Ok(Some(serde_json::from_str(&entry.json)?))
        } else {
            debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    #[tracing::instrument(name = "store_put", level = "debug", skip(self, value))]
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let entry = StoredEntry {
            json: serde_json::to_string(&value)?,
            expires_at: expiry_timestamp(ttl)?,
        };
        let bytes = postcard::to_stdvec(&entry)?;

        let _ = task::spawn_blocking(move || store.insert(key, bytes)).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        let _ = task::spawn_blocking(move || store.remove(key)).await?;
        Ok(())
    }
}

/// In-memory document store honoring the same TTL semantics
#[derive(Default)]
pub struct MemoryStore {
    entries: tokio::sync::Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if now_timestamp()? < entry.expires_at {
            Ok(Some(serde_json::from_str(&entry.json)?))
        } else {
            entries.remove(key);
            Ok(None)
        }
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let entry = StoredEntry {
            json: serde_json::to_string(&value)?,
            expires_at: expiry_timestamp(ttl)?,
        };
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
