//! USPTO adapter.
//!
//! Queries the US Patent Office application search by serial number. The
//! API is keyed with a static `X-Api-Key` header rather than OAuth2, and
//! signals a miss with either a 404 or an empty result list.

use std::time::Duration;

use async_trait::async_trait;
use patstat_core::{
    ExpiryDate, Jurisdiction, PatentId, PatentRecord, PatentStatus, utility_term_expiry,
};
use reqwest::StatusCode;
use serde_json::Value;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use url::Url;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::retry::RetryPolicy;

const PROVIDER: &str = "USPTO";

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Configuration for the USPTO adapter.
#[derive(Debug, Clone)]
pub struct UsptoConfig {
    /// API base URL.
    pub base_url: Url,

    /// Optional API key, sent as `X-Api-Key` when present.
    pub api_key: Option<String>,

    /// HTTP request timeout (default: 30 seconds).
    pub request_timeout: Duration,
}

impl UsptoConfig {
    /// Creates a configuration with the default timeout and no API key.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// [`SourceAdapter`] for the USPTO application search API.
pub struct UsptoAdapter {
    http_client: reqwest::Client,
    config: UsptoConfig,
    retry: RetryPolicy,
}

impl UsptoAdapter {
    /// Creates an adapter with the default retry policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(config: UsptoConfig) -> Self {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Creates an adapter with an explicit retry policy.
    #[must_use]
    pub fn with_retry(config: UsptoConfig, retry: RetryPolicy) -> Self {
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

    async fn attempt_fetch(&self, id: &PatentId) -> Result<Option<Value>, SourceError> {
        let url = format!(
            "{}/patent/application",
            self.config.base_url.as_str().trim_end_matches('/')
        );

        // The search endpoint takes the bare serial, not the prefixed id.
        let mut request = self
            .http_client
            .get(&url)
            .query(&[("searchText", id.serial())]);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("X-Api-Key", api_key);
        }

        let response = request
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
            _ => Err(SourceError::http(PROVIDER, status.as_u16())),
        }
    }

    fn normalize(&self, id: &PatentId, payload: Value) -> Option<PatentRecord> {
        let result = payload["results"].as_array()?.first()?.clone();

        let label = result["appStatus"].as_str().unwrap_or_default();
        let status = match PatentStatus::from_provider_label(label) {
            // The search only returns issued or prosecuting applications,
            // so an unmapped status string means the patent is in force.
            PatentStatus::Unknown => PatentStatus::Active,
            other => other,
        };

        let filing_date = result["appFilingDate"]
            .as_str()
            .and_then(|s| Date::parse(s, ISO_DATE).ok());

        let mut record = PatentRecord::new(id.clone(), status, PROVIDER, payload);
        if status == PatentStatus::Expired && !label.is_empty() {
            record = record.with_lapse_reason(label);
        }
        if let Some(filing) = filing_date
            && let Some(expiry) = utility_term_expiry(filing)
        {
            record = record.with_expiry(ExpiryDate::estimated(expiry));
        }
        Some(record)
    }
}

#[async_trait]
impl SourceAdapter for UsptoAdapter {
    async fn fetch(&self, id: &PatentId) -> Result<Option<PatentRecord>, SourceError> {
        let payload = self.retry.run(|_| self.attempt_fetch(id)).await?;
        Ok(payload.and_then(|value| self.normalize(id, value)))
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn jurisdictions(&self) -> &'static [Jurisdiction] {
        &[Jurisdiction::Us]
    }
}
