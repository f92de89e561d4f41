//! The cache store contract.

use async_trait::async_trait;
use patstat_core::{PatentId, PatentRecord};

use crate::error::StoreError;
use crate::types::{CacheEntry, PurgeTarget};

/// Durable key-value store of normalized patent records.
///
/// Implementations must be thread-safe (`Send + Sync`). `Ok(None)` from
/// [`CacheStore::get`] strictly means "no fresh entry"; infrastructure
/// failures must surface as `Err(StoreError)` so the caller can fail the
/// request rather than treat an outage as a cache miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the entry for `id` if it exists and is still fresh.
    ///
    /// A hit increments the entry's popularity counter as a side effect
    /// visible to later [`CacheStore::list_top`] / [`CacheStore::list_stale`]
    /// calls. A stale entry is treated as absent but is not deleted; it
    /// remains visible to `list_stale` for refresh prioritization.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, never for misses.
    async fn get(&self, id: &PatentId) -> Result<Option<CacheEntry>, StoreError>;

    /// Upserts a freshly fetched record, keyed by its canonical identifier.
    ///
    /// If an entry exists its fields are overwritten, the staleness clock
    /// resets, and the popularity counter bumps; otherwise a new entry is
    /// created with a counter of 1.
    async fn put(&self, record: PatentRecord) -> Result<CacheEntry, StoreError>;

    /// Lists stale entries (past TTL), most popular first.
    ///
    /// Ties are broken by identifier so the order is deterministic. This
    /// expresses the policy "refresh the most popular expired entries first".
    async fn list_stale(&self, limit: usize) -> Result<Vec<CacheEntry>, StoreError>;

    /// Lists all entries, most popular first, for observability.
    async fn list_top(&self, limit: usize) -> Result<Vec<CacheEntry>, StoreError>;

    /// Administratively removes one entry or all of them.
    ///
    /// Not used by the resolution path. Returns the number of entries
    /// removed.
    async fn purge(&self, target: PurgeTarget) -> Result<u64, StoreError>;

    /// Returns the name of this store backend for logging.
    fn backend_name(&self) -> &'static str;
}
