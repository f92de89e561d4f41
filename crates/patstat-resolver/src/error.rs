//! Resolution error taxonomy.

use patstat_core::{IdError, PatentId};
use patstat_sources::SourceError;
use patstat_store::StoreError;
use thiserror::Error;

/// Why a resolution did not produce a record.
///
/// The four cases stay distinct all the way to the caller: a malformed
/// identifier, a patent no source knows, a source that failed after its
/// retries, and a broken store. In particular a store failure is never
/// reported as "not found" — treating an outage as a miss would send every
/// request to the external providers.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The raw identifier did not normalize to a canonical form.
    #[error(transparent)]
    Validation(#[from] IdError),

    /// Every consulted source reported no match (or no source covers the
    /// jurisdiction).
    #[error("No data available for patent '{id}'")]
    NotFound {
        /// The canonical identifier that was looked up.
        id: PatentId,
    },

    /// The last consulted source failed after its internal retries.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The cache store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    /// Creates a `NotFound` error for the given identifier.
    #[must_use]
    pub fn not_found(id: PatentId) -> Self {
        Self::NotFound { id }
    }

    /// Whether this is the terminal "no source knows this patent" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
