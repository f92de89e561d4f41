//! Lens.org adapter.
//!
//! Queries the Lens patent search API for legal-status data. Unlike the
//! office APIs, Lens asserts term dates itself, so the expiry it reports is
//! carried as-is instead of being recomputed from the filing date.

use std::time::Duration;

use async_trait::async_trait;
use patstat_core::{ExpiryDate, Jurisdiction, PatentId, PatentRecord, PatentStatus};
use reqwest::StatusCode;
use serde_json::{Value, json};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use url::Url;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::retry::RetryPolicy;

const PROVIDER: &str = "Lens";

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Configuration for the Lens adapter.
#[derive(Debug, Clone)]
pub struct LensConfig {
    /// Search endpoint URL.
    pub base_url: Url,

    /// Bearer token for the Lens API.
    pub api_token: String,

    /// Whether the adapter participates in resolution chains. The registry
    /// consults this toggle; a disabled adapter stays configured but is
    /// never called.
    pub enabled: bool,

    /// HTTP request timeout (default: 30 seconds).
    pub request_timeout: Duration,
}

impl LensConfig {
    /// Creates a disabled configuration; call [`enabled`](Self::with_enabled)
    /// to opt in.
    #[must_use]
    pub fn new(base_url: Url, api_token: impl Into<String>) -> Self {
        Self {
            base_url,
            api_token: api_token.into(),
            enabled: false,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sets whether the adapter is eligible for resolution chains.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// [`SourceAdapter`] for the Lens patent search API.
pub struct LensAdapter {
    http_client: reqwest::Client,
    config: LensConfig,
    retry: RetryPolicy,
}

impl LensAdapter {
    /// Creates an adapter with the default retry policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(config: LensConfig) -> Self {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Creates an adapter with an explicit retry policy.
    #[must_use]
    pub fn with_retry(config: LensConfig, retry: RetryPolicy) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            config,
            retry,
        }
    }

    /// Whether the adapter may be placed in resolution chains.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn attempt_fetch(&self, id: &PatentId) -> Result<Option<Value>, SourceError> {
        let body = json!({
            "query": {"match": {"ids": id.as_str()}},
            "include": ["legal_status", "jurisdiction"],
            "size": 1
        });

        let response = self
            .http_client
            .post(self.config.base_url.as_str())
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::network(PROVIDER, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let payload = response
                .json::<Value>()
                .await
                .map_err(|e| SourceError::parse(PROVIDER, e.to_string()))?;
            return Ok(Some(payload));
        }

        match status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::auth(
                PROVIDER,
                format!("search endpoint returned {status}"),
            )),
            _ => Err(SourceError::http(PROVIDER, status.as_u16())),
        }
    }

    fn normalize(&self, id: &PatentId, payload: Value) -> Option<PatentRecord> {
        if payload["total"].as_u64().unwrap_or(0) == 0 {
            return None;
        }
        let hit = payload["data"].as_array()?.first()?.clone();
        let legal_status = &hit["legal_status"];

        let label = legal_status["patent_status"].as_str().unwrap_or_default();
        let granted = legal_status["granted"].as_bool().unwrap_or(false);
        let status = match PatentStatus::from_provider_label(label) {
            PatentStatus::Unknown if granted => PatentStatus::Granted,
            other => other,
        };

        let term_date = legal_status["anticipated_term_date"]
            .as_str()
            .and_then(|s| Date::parse(s, ISO_DATE).ok());
        let discontinued = legal_status["discontinuation_date"]
            .as_str()
            .and_then(|s| Date::parse(s, ISO_DATE).ok());

        let reported_jurisdiction = hit["jurisdiction"].as_str().map(str::to_owned);

        let mut record = PatentRecord::new(id.clone(), status, PROVIDER, payload);
        if status == PatentStatus::Expired && !label.is_empty() {
            record = record.with_lapse_reason(label);
        }
        // Prefer the anticipated term; a lapsed patent's effective end is
        // its discontinuation date.
        if let Some(date) = term_date.or(discontinued) {
            record = record.with_expiry(ExpiryDate::asserted(date));
        }
        if let Some(code) = reported_jurisdiction {
            record.jurisdictions.insert("reported".to_string(), code);
        }
        Some(record)
    }
}

#[async_trait]
impl SourceAdapter for LensAdapter {
    async fn fetch(&self, id: &PatentId) -> Result<Option<PatentRecord>, SourceError> {
        let payload = self.retry.run(|_| self.attempt_fetch(id)).await?;
        Ok(payload.and_then(|value| self.normalize(id, value)))
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn jurisdictions(&self) -> &'static [Jurisdiction] {
        // Lens covers both offices; it acts as a fallback wherever enabled.
        &[Jurisdiction::Ep, Jurisdiction::Us]
    }
}
