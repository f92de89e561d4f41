//! The cache-aside resolution loop.

use std::sync::Arc;

use patstat_core::{PatentId, PatentRecord};
use patstat_sources::{AdapterRegistry, SourceError};
use patstat_store::CacheStore;
use serde::Serialize;

use crate::error::ResolveError;

/// The outcome of a successful resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// The resolved record.
    pub record: PatentRecord,
    /// Whether the record was served from the cache.
    pub cache_hit: bool,
    /// Human-readable source label, e.g. `"EPO"` or `"EPO (cached)"`.
    pub source: String,
}

/// Orchestrates identifier normalization, cache lookup and source fetches.
///
/// Concurrency notes: there is no per-identifier fetch lock, so concurrent
/// misses for the same identifier each reach the provider and the last
/// write-back wins. Negative results are never written to the cache.
pub struct PatentResolver {
    store: Arc<dyn CacheStore>,
    registry: Arc<AdapterRegistry>,
}

impl PatentResolver {
    /// Creates a resolver over a store and an adapter registry.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, registry: Arc<AdapterRegistry>) -> Self {
        Self { store, registry }
    }

    /// The underlying store, for observability endpoints.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Resolves a raw identifier to a record.
    ///
    /// Validation happens first, before any store or adapter access. A
    /// fresh cache entry short-circuits the source chain; on a miss the
    /// jurisdiction's adapters are consulted in registration order, and the
    /// first record found is written through the cache.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Validation`] for malformed identifiers.
    /// - [`ResolveError::Store`] when the cache backend fails (never
    ///   reported as a miss).
    /// - [`ResolveError::NotFound`] when every consulted source reports no
    ///   match, or no source covers the jurisdiction.
    /// - [`ResolveError::Source`] when the last consulted source failed.
    pub async fn resolve(&self, raw: &str) -> Result<Resolution, ResolveError> {
        let id = PatentId::normalize(raw)?;

        if let Some(entry) = self.store.get(&id).await? {
            tracing::debug!(%id, fetch_count = entry.fetch_count, "cache hit");
            let source = format!("{} (cached)", entry.record.source);
            return Ok(Resolution {
                record: entry.record,
                cache_hit: true,
                source,
            });
        }

        let mut last_error: Option<SourceError> = None;
        for adapter in self.registry.chain(id.jurisdiction()) {
            match adapter.fetch(&id).await {
                Ok(Some(record)) => return self.write_through(&id, adapter.name(), record).await,
                Ok(None) => {
                    tracing::debug!(%id, source = adapter.name(), "source reported no match");
                }
                Err(err) => {
                    tracing::warn!(%id, source = adapter.name(), error = %err, "source fetch failed");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => Err(ResolveError::Source(err)),
            None => Err(ResolveError::not_found(id)),
        }
    }

    async fn write_through(
        &self,
        id: &PatentId,
        source: &str,
        record: PatentRecord,
    ) -> Result<Resolution, ResolveError> {
        let entry = self.store.put(record).await?;
        tracing::info!(%id, source, "resolved from source");
        Ok(Resolution {
            record: entry.record,
            cache_hit: false,
            source: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use patstat_core::{Jurisdiction, PatentStatus};
    use patstat_sources::{EpoAdapter, EpoConfig, RetryPolicy, SourceAdapter, UsptoAdapter, UsptoConfig};
    use patstat_store::{CacheEntry, MemoryCacheStore, PurgeTarget, StoreError};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TTL: Duration = Duration::from_secs(3600);

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    async fn epo_backend() -> (MockServer, Arc<AdapterRegistry>) {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/accesstoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "expires_in": "1200"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest-services/published-data/publication/epodoc/EP0683520"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ops:world-patent-data": {
                    "exchange-documents": {
                        "exchange-document": {
                            "@kind": "B1",
                            "bibliographic-data": {
                                "application-reference": {
                                    "document-id": [
                                        {"@document-id-type": "epodoc", "date": {"$": "19940615"}}
                                    ]
                                },
                                "publication-reference": {
                                    "document-id": {"date": {"$": "19991103"}}
                                }
                            }
                        }
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = EpoConfig::new(Url::parse(&server.uri()).unwrap(), "key", "secret");
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(EpoAdapter::with_retry(config, fast_retry())));
        (server, Arc::new(registry))
    }

    #[tokio::test]
    async fn test_miss_then_hit_fetches_once() {
        let (_server, registry) = epo_backend().await;
        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(store, registry);

        let first = resolver.resolve("EP0683520").await.unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.source, "EPO");
        assert_eq!(first.record.status, PatentStatus::Granted);

        // Second resolution inside the TTL must not reach the provider; the
        // wiremock expectations above verify exactly one data fetch.
        let second = resolver.resolve("EP0683520").await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.source, "EPO (cached)");
    }

    #[tokio::test]
    async fn test_raw_input_is_normalized_before_lookup() {
        let (_server, registry) = epo_backend().await;
        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(store, registry);

        let first = resolver.resolve("  ep 0683520 ").await.unwrap();
        assert_eq!(first.record.id.as_str(), "EP0683520");

        let second = resolver.resolve("EP0683520").await.unwrap();
        assert!(second.cache_hit);
    }

    #[tokio::test]
    async fn test_not_found_is_terminal_and_never_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patent/application"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"count": 0, "results": []})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let config = UsptoConfig::new(Url::parse(&server.uri()).unwrap());
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(UsptoAdapter::with_retry(config, fast_retry())));

        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(Arc::clone(&store) as Arc<dyn CacheStore>, Arc::new(registry));

        let err = resolver.resolve("US9999999").await.unwrap_err();
        assert!(err.is_not_found());

        assert!(store.list_top(10).await.unwrap().is_empty());

        // A second attempt fetches again: negative results are not cached.
        let err = resolver.resolve("US9999999").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_id_fails_before_any_access() {
        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(store, Arc::new(AdapterRegistry::new()));

        let err = resolver.resolve("XX1234567").await.unwrap_err();
        assert!(matches!(err, ResolveError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_chain_is_not_found() {
        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(store, Arc::new(AdapterRegistry::new()));

        let err = resolver.resolve("EP1234567").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_provider_failure_stays_distinct_from_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/patent/application"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = UsptoConfig::new(Url::parse(&server.uri()).unwrap());
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(UsptoAdapter::with_retry(config, fast_retry())));

        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(store, Arc::new(registry));

        let err = resolver.resolve("US7654321").await.unwrap_err();
        assert!(matches!(err, ResolveError::Source(_)));
    }

    /// A chain falls through a failing adapter to a working one.
    struct ScriptedAdapter {
        name: &'static str,
        outcome: fn(&PatentId) -> Result<Option<PatentRecord>, SourceError>,
    }

    #[async_trait]
    impl SourceAdapter for ScriptedAdapter {
        async fn fetch(&self, id: &PatentId) -> Result<Option<PatentRecord>, SourceError> {
            (self.outcome)(id)
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn jurisdictions(&self) -> &'static [Jurisdiction] {
            &[Jurisdiction::Ep]
        }
    }

    #[tokio::test]
    async fn test_chain_falls_back_past_a_failing_adapter() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(ScriptedAdapter {
            name: "flaky",
            outcome: |_| Err(SourceError::http("flaky", 503)),
        }));
        registry.register(Arc::new(ScriptedAdapter {
            name: "steady",
            outcome: |id| {
                Ok(Some(PatentRecord::new(
                    id.clone(),
                    PatentStatus::Granted,
                    "steady",
                    json!({}),
                )))
            },
        }));

        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(store, Arc::new(registry));

        let resolution = resolver.resolve("EP1234567").await.unwrap();
        assert!(!resolution.cache_hit);
        assert_eq!(resolution.source, "steady");
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_last_source_error() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(ScriptedAdapter {
            name: "silent",
            outcome: |_| Ok(None),
        }));
        registry.register(Arc::new(ScriptedAdapter {
            name: "broken",
            outcome: |_| Err(SourceError::http("broken", 502)),
        }));

        let store = Arc::new(MemoryCacheStore::new(TTL));
        let resolver = PatentResolver::new(store, Arc::new(registry));

        let err = resolver.resolve("EP1234567").await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Source(SourceError::Http { status: 502, .. })
        ));
    }

    /// A store whose reads always fail.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _id: &PatentId) -> Result<Option<CacheEntry>, StoreError> {
            Err(StoreError::connection("store is down"))
        }

        async fn put(&self, _record: PatentRecord) -> Result<CacheEntry, StoreError> {
            Err(StoreError::connection("store is down"))
        }

        async fn list_stale(&self, _limit: usize) -> Result<Vec<CacheEntry>, StoreError> {
            Err(StoreError::connection("store is down"))
        }

        async fn list_top(&self, _limit: usize) -> Result<Vec<CacheEntry>, StoreError> {
            Err(StoreError::connection("store is down"))
        }

        async fn purge(&self, _target: PurgeTarget) -> Result<u64, StoreError> {
            Err(StoreError::connection("store is down"))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_miss() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(ScriptedAdapter {
            name: "unreachable",
            outcome: |_| panic!("the adapter must not be consulted when the store fails"),
        }));

        let resolver = PatentResolver::new(Arc::new(BrokenStore), Arc::new(registry));

        let err = resolver.resolve("EP1234567").await.unwrap_err();
        assert!(matches!(err, ResolveError::Store(_)));
    }
}
