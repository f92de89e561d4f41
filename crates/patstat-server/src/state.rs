//! Shared application state.

use std::sync::Arc;

use patstat_quota::QuotaTracker;
use patstat_resolver::PatentResolver;

use crate::config::AppConfig;

/// State shared by every handler and middleware layer.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<PatentResolver>,
    pub quota: Arc<QuotaTracker>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(resolver: Arc<PatentResolver>, quota: Arc<QuotaTracker>, config: AppConfig) -> Self {
        Self {
            resolver,
            quota,
            config: Arc::new(config),
        }
    }
}
