//! In-memory cache store backend.
//!
//! The reference backend for single-process deployments. Entries are held
//! in a `tokio::sync::RwLock<HashMap>`; a multi-instance deployment needs a
//! shared backing store instead, since these entries are not visible across
//! processes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use patstat_core::{PatentId, PatentRecord};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::traits::CacheStore;
use crate::types::{CacheEntry, PurgeTarget};

/// In-memory [`CacheStore`] with TTL-based freshness.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCacheStore {
    /// Creates an empty store with the given freshness TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: OffsetDateTime) -> bool {
        now - entry.last_fetched < self.ttl
    }

    /// Returns the number of entries, fresh and stale alike.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, id: &PatentId) -> Result<Option<CacheEntry>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.write().await;

        match entries.get_mut(id.as_str()) {
            Some(entry) if self.is_fresh(entry, now) => {
                entry.fetch_count += 1;
                tracing::trace!(id = %id, fetch_count = entry.fetch_count, "cache hit");
                Ok(Some(entry.clone()))
            }
            Some(_) => {
                // Stale entries stay in place for list_stale.
                tracing::trace!(id = %id, "cache entry stale");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: PatentRecord) -> Result<CacheEntry, StoreError> {
        let key = record.id.as_str().to_string();
        let mut entries = self.entries.write().await;

        let entry = match entries.get_mut(&key) {
            Some(existing) => {
                existing.refresh(record);
                existing.clone()
            }
            None => {
                let entry = CacheEntry::new(record);
                entries.insert(key.clone(), entry.clone());
                entry
            }
        };

        tracing::debug!(id = %key, fetch_count = entry.fetch_count, "cache entry written");
        Ok(entry)
    }

    async fn list_stale(&self, limit: usize) -> Result<Vec<CacheEntry>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let entries = self.entries.read().await;

        let mut stale: Vec<CacheEntry> = entries
            .values()
            .filter(|e| !self.is_fresh(e, now))
            .cloned()
            .collect();
        stale.sort_by(|a, b| {
            b.fetch_count
                .cmp(&a.fetch_count)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        stale.truncate(limit);
        Ok(stale)
    }

    async fn list_top(&self, limit: usize) -> Result<Vec<CacheEntry>, StoreError> {
        let entries = self.entries.read().await;

        let mut all: Vec<CacheEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| {
            b.fetch_count
                .cmp(&a.fetch_count)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        all.truncate(limit);
        Ok(all)
    }

    async fn purge(&self, target: PurgeTarget) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let removed = match target {
            PurgeTarget::One(id) => {
                if entries.remove(id.as_str()).is_some() {
                    1
                } else {
                    0
                }
            }
            PurgeTarget::All => {
                let count = entries.len() as u64;
                entries.clear();
                count
            }
        };
        if removed > 0 {
            tracing::info!(removed, "cache purge");
        }
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
