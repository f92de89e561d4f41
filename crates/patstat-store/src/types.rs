//! Stored entry types for the cache store abstraction.

use patstat_core::PatentRecord;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A cached patent record plus its bookkeeping fields.
///
/// There is at most one entry per canonical identifier; the identifier is
/// the primary key. The popularity counter is bumped on every read hit and
/// every write, so it is monotonically non-decreasing and equals the number
/// of operations that touched the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached normalized record.
    pub record: PatentRecord,
    /// Popularity counter: read hits + writes.
    pub fetch_count: u64,
    /// When the entry was first created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the entry fields were last overwritten.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// When the record was last fetched from its source; drives staleness.
    #[serde(with = "time::serde::rfc3339")]
    pub last_fetched: OffsetDateTime,
}

impl CacheEntry {
    /// Creates a fresh entry for a record fetched just now.
    #[must_use]
    pub fn new(record: PatentRecord) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            record,
            fetch_count: 1,
            created_at: now,
            updated_at: now,
            last_fetched: now,
        }
    }

    /// Overwrites the entry with a freshly fetched record.
    ///
    /// Resets the staleness clock and bumps the popularity counter;
    /// `created_at` is preserved.
    pub fn refresh(&mut self, record: PatentRecord) {
        let now = OffsetDateTime::now_utc();
        self.record = record;
        self.fetch_count += 1;
        self.updated_at = now;
        self.last_fetched = now;
    }
}

/// Target of an administrative purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeTarget {
    /// Remove the entry for one canonical identifier.
    One(patstat_core::PatentId),
    /// Remove every entry.
    All,
}
