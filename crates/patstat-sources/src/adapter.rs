//! The per-provider adapter contract.

use async_trait::async_trait;
use patstat_core::{Jurisdiction, PatentId, PatentRecord};

use crate::error::SourceError;

/// Fetches and normalizes one record from one external source.
///
/// Implementations must be thread-safe (`Send + Sync`); a single adapter
/// instance serves many concurrent resolutions, so any credential state it
/// keeps (e.g. a cached OAuth2 token) must be synchronized internally.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetches the record for a canonical identifier.
    ///
    /// `Ok(None)` means the provider has no match for the identifier; that
    /// is a terminal NotFound, not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] once the adapter's internal retry budget
    /// is exhausted, or immediately for non-retryable failures.
    async fn fetch(&self, id: &PatentId) -> Result<Option<PatentRecord>, SourceError>;

    /// The provider name used in record source labels and logs.
    fn name(&self) -> &'static str;

    /// The jurisdictions this adapter can serve.
    fn jurisdictions(&self) -> &'static [Jurisdiction];
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that SourceAdapter is object-safe.
    fn _assert_adapter_object_safe(_: &dyn SourceAdapter) {}
}
