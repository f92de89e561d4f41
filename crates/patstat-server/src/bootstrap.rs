//! Wires configuration into the running engine.

use std::sync::Arc;

use patstat_quota::QuotaTracker;
use patstat_resolver::PatentResolver;
use patstat_sources::{
    AdapterRegistry, EpoAdapter, EpoConfig, LensAdapter, LensConfig, UsptoAdapter, UsptoConfig,
};
use patstat_store::MemoryCacheStore;
use url::Url;

use crate::config::AppConfig;
use crate::state::AppState;

/// Builds the shared application state from validated configuration.
///
/// Each configured source becomes a registry entry; Lens is registered only
/// when its `enabled` toggle is set, so re-enabling fallback is a config
/// change. An empty registry is permitted (every resolution reports not
/// found) but logged loudly.
pub fn build_state(config: AppConfig) -> Result<AppState, String> {
    let store = Arc::new(MemoryCacheStore::new(config.cache.ttl()));
    let retry = config.retry.policy();

    let mut registry = AdapterRegistry::new();

    if let Some(ref epo) = config.sources.epo {
        let base_url =
            Url::parse(&epo.base_url).map_err(|e| format!("sources.epo.base_url: {e}"))?;
        let adapter_config = EpoConfig::new(base_url, &epo.consumer_key, &epo.consumer_secret)
            .with_request_timeout(std::time::Duration::from_millis(epo.timeout_ms));
        registry.register(Arc::new(EpoAdapter::with_retry(adapter_config, retry.clone())));
        tracing::info!("EPO source registered");
    }

    if let Some(ref uspto) = config.sources.uspto {
        let base_url =
            Url::parse(&uspto.base_url).map_err(|e| format!("sources.uspto.base_url: {e}"))?;
        let mut adapter_config = UsptoConfig::new(base_url)
            .with_request_timeout(std::time::Duration::from_millis(uspto.timeout_ms));
        if let Some(ref api_key) = uspto.api_key {
            adapter_config = adapter_config.with_api_key(api_key);
        }
        registry.register(Arc::new(UsptoAdapter::with_retry(
            adapter_config,
            retry.clone(),
        )));
        tracing::info!("USPTO source registered");
    }

    if config.sources.lens.enabled {
        let lens = &config.sources.lens;
        let base_url =
            Url::parse(&lens.base_url).map_err(|e| format!("sources.lens.base_url: {e}"))?;
        let adapter_config = LensConfig::new(base_url, &lens.api_token)
            .with_enabled(true)
            .with_request_timeout(std::time::Duration::from_millis(lens.timeout_ms));
        let adapter = LensAdapter::with_retry(adapter_config, retry.clone());
        if adapter.is_enabled() {
            registry.register(Arc::new(adapter));
            tracing::info!("Lens source registered as fallback");
        }
    }

    if registry.is_empty() {
        tracing::warn!("no sources configured; every resolution will report not found");
    }

    let resolver = Arc::new(PatentResolver::new(store, Arc::new(registry)));
    let quota = Arc::new(QuotaTracker::new(
        config.quota.tier_limits(),
        config.quota.window(),
    ));

    Ok(AppState::new(resolver, quota, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EpoSettings, UsptoSettings};

    #[test]
    fn test_default_config_builds_empty_registry() {
        let state = build_state(AppConfig::default()).unwrap();
        assert_eq!(state.quota.tracked_keys(), 0);
    }

    #[test]
    fn test_configured_sources_are_registered() {
        let mut config = AppConfig::default();
        config.sources.epo = Some(EpoSettings {
            base_url: "https://ops.example.com/3.2".into(),
            consumer_key: "k".into(),
            consumer_secret: "s".into(),
            timeout_ms: 1000,
        });
        config.sources.uspto = Some(UsptoSettings {
            base_url: "https://uspto.example.com/api".into(),
            api_key: None,
            timeout_ms: 1000,
        });
        assert!(build_state(config).is_ok());
    }

    #[test]
    fn test_bad_source_url_is_rejected() {
        let mut config = AppConfig::default();
        config.sources.uspto = Some(UsptoSettings {
            base_url: "not a url".into(),
            api_key: None,
            timeout_ms: 1000,
        });
        assert!(build_state(config).is_err());
    }
}
