//! Per-jurisdiction adapter chains.

use std::collections::HashMap;
use std::sync::Arc;

use patstat_core::Jurisdiction;

use crate::adapter::SourceAdapter;

/// Ordered adapter chains keyed by jurisdiction.
///
/// Resolution walks a chain front to back; registration order is the
/// fallback order. A jurisdiction with no registered adapters resolves to
/// nothing, which the caller reports as not found.
#[derive(Default)]
pub struct AdapterRegistry {
    chains: HashMap<Jurisdiction, Vec<Arc<dyn SourceAdapter>>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the adapter to the chain of every jurisdiction it covers.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        for jurisdiction in adapter.jurisdictions() {
            self.chains
                .entry(*jurisdiction)
                .or_default()
                .push(Arc::clone(&adapter));
        }
    }

    /// Appends the adapter to a single jurisdiction's chain, regardless of
    /// what the adapter itself advertises.
    pub fn register_for(&mut self, jurisdiction: Jurisdiction, adapter: Arc<dyn SourceAdapter>) {
        self.chains.entry(jurisdiction).or_default().push(adapter);
    }

    /// Returns the ordered chain for a jurisdiction (empty when none is
    /// registered).
    #[must_use]
    pub fn chain(&self, jurisdiction: Jurisdiction) -> &[Arc<dyn SourceAdapter>] {
        self.chains
            .get(&jurisdiction)
            .map_or(&[], Vec::as_slice)
    }

    /// Total number of registered chain entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.values().map(Vec::len).sum()
    }

    /// Whether no adapter is registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.values().all(Vec::is_empty)
    }
}
