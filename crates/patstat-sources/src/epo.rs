//! EPO OPS adapter.
//!
//! Fetches published data from the European Patent Office's Open Patent
//! Services. Access requires a client-credentials OAuth2 bearer token; the
//! adapter caches the token with an expiry derived from the provider's
//! advertised lifetime minus a safety margin, and serializes acquisition per
//! adapter instance so concurrent fetches never race duplicate exchanges.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use patstat_core::{
    ExpiryDate, Jurisdiction, PatentId, PatentRecord, PatentStatus, utility_term_expiry,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tokio::sync::Mutex;
use url::Url;

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::retry::RetryPolicy;

const PROVIDER: &str = "EPO";

/// EPO dates come as compact `YYYYMMDD` strings.
const COMPACT_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

/// Floor for the token expiry safety margin.
const MIN_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Configuration for the EPO adapter.
#[derive(Debug, Clone)]
pub struct EpoConfig {
    /// OPS base URL (e.g. `https://ops.epo.org/3.2`).
    pub base_url: Url,

    /// OAuth2 consumer key.
    pub consumer_key: String,

    /// OAuth2 consumer secret.
    pub consumer_secret: String,

    /// HTTP request timeout (default: 30 seconds).
    pub request_timeout: Duration,

    /// Margin subtracted from the advertised token lifetime (default and
    /// floor: 60 seconds).
    pub token_safety_margin: Duration,

    /// Lifetime assumed when the token response omits `expires_in`
    /// (default: 20 minutes, the lifetime OPS is observed to advertise).
    pub assumed_token_lifetime: Duration,
}

impl EpoConfig {
    /// Creates a configuration with default timeouts and margins.
    #[must_use]
    pub fn new(
        base_url: Url,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            request_timeout: Duration::from_secs(30),
            token_safety_margin: MIN_SAFETY_MARGIN,
            assumed_token_lifetime: Duration::from_secs(20 * 60),
        }
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the token expiry safety margin (clamped to at least 60 seconds).
    #[must_use]
    pub fn with_token_safety_margin(mut self, margin: Duration) -> Self {
        self.token_safety_margin = margin.max(MIN_SAFETY_MARGIN);
        self
    }
}

/// A cached bearer token with its local expiry deadline.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// OAuth2 token response from the OPS token endpoint.
///
/// OPS returns `expires_in` as a string; accept a number as well.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    expires_in: Option<u64>,
}

fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::String(s)) => s.parse().ok(),
        None => None,
    })
}

/// [`SourceAdapter`] for EPO OPS published data.
pub struct EpoAdapter {
    http_client: reqwest::Client,
    config: EpoConfig,
    /// Cached token; the mutex is held across acquisition so only one
    /// exchange is in flight per adapter instance.
    token: Mutex<Option<CachedToken>>,
    retry: RetryPolicy,
}

impl EpoAdapter {
    /// Creates an adapter with the default retry policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(config: EpoConfig) -> Self {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Creates an adapter with an explicit retry policy.
    #[must_use]
    pub fn with_retry(config: EpoConfig, retry: RetryPolicy) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            config,
            token: Mutex::new(None),
            retry,
        }
    }

    fn base(&self) -> &str {
        self.config.base_url.as_str().trim_end_matches('/')
    }

    /// Returns a valid bearer token, exchanging credentials when the cached
    /// one is absent or expired.
    ///
    /// The lock is held for the duration of the exchange, so concurrent
    /// callers wait for the in-flight acquisition instead of issuing
    /// duplicates.
    async fn bearer_token(&self) -> Result<String, SourceError> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref()
            && cached.is_valid()
        {
            return Ok(cached.access_token.clone());
        }

        let token = self.exchange_credentials().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next fetch attempt re-acquires one.
    async fn invalidate_token(&self) {
        let mut guard = self.token.lock().await;
        *guard = None;
    }

    async fn exchange_credentials(&self) -> Result<CachedToken, SourceError> {
        let credentials = format!("{}:{}", self.config.consumer_key, self.config.consumer_secret);
        let auth = BASE64.encode(credentials.as_bytes());

        let response = self
            .http_client
            .post(format!("{}/auth/accesstoken", self.base()))
            .header("Authorization", format!("Basic {auth}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SourceError::network(PROVIDER, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::auth(
                PROVIDER,
                format!("token endpoint returned {status}"),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::parse(PROVIDER, format!("token response: {e}")))?;

        let lifetime = token
            .expires_in
            .map_or(self.config.assumed_token_lifetime, Duration::from_secs);
        let margin = self.config.token_safety_margin.max(MIN_SAFETY_MARGIN);
        let effective = lifetime.saturating_sub(margin);

        tracing::debug!(
            lifetime_secs = lifetime.as_secs(),
            effective_secs = effective.as_secs(),
            "EPO OAuth2 token obtained"
        );

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + effective,
        })
    }

    async fn attempt_fetch(&self, id: &PatentId) -> Result<Option<Value>, SourceError> {
        let token = self.bearer_token().await?;

        let url = format!(
            "{}/rest-services/published-data/publication/epodoc/{}",
            self.base(),
            id
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
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
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                // The token may have been revoked before its local expiry;
                // re-acquire on the next attempt.
                self.invalidate_token().await;
                Err(SourceError::auth(
                    PROVIDER,
                    format!("data endpoint returned {status}"),
                ))
            }
            _ => Err(SourceError::http(PROVIDER, status.as_u16())),
        }
    }

    fn normalize(&self, id: &PatentId, payload: Value) -> PatentRecord {
        let documents = exchange_documents(&payload);
        let filing_date = application_date(&documents).and_then(parse_compact_date);
        let grant_date = grant_date(&documents).and_then(parse_compact_date);

        let status = if grant_date.is_some() {
            PatentStatus::Granted
        } else {
            PatentStatus::Pending
        };

        let mut record = PatentRecord::new(id.clone(), status, PROVIDER, payload);
        if let Some(filing) = filing_date
            && let Some(expiry) = utility_term_expiry(filing)
        {
            record = record.with_expiry(ExpiryDate::estimated(expiry));
        }
        record
    }
}

#[async_trait]
impl SourceAdapter for EpoAdapter {
    async fn fetch(&self, id: &PatentId) -> Result<Option<PatentRecord>, SourceError> {
        let payload = self.retry.run(|_| self.attempt_fetch(id)).await?;
        Ok(payload.map(|value| self.normalize(id, value)))
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn jurisdictions(&self) -> &'static [Jurisdiction] {
        &[Jurisdiction::Ep]
    }
}

/// Collects the exchange documents, which OPS serves as either a single
/// object or a list.
fn exchange_documents(payload: &Value) -> Vec<&Value> {
    let documents = &payload["ops:world-patent-data"]["exchange-documents"]["exchange-document"];
    one_or_many(documents)
}

fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

/// A document-id date element is either `{"$": "YYYYMMDD"}` or a bare string.
fn date_element(doc_id: &Value) -> Option<&str> {
    match &doc_id["date"] {
        Value::Object(map) => map.get("$").and_then(Value::as_str),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Finds the application (filing) date: the epodoc document-id under any
/// document's application reference.
fn application_date<'a>(documents: &[&'a Value]) -> Option<&'a str> {
    for doc in documents {
        let doc_ids = &doc["bibliographic-data"]["application-reference"]["document-id"];
        for doc_id in one_or_many(doc_ids) {
            if doc_id["@document-id-type"] == "epodoc"
                && let Some(date) = date_element(doc_id)
            {
                return Some(date);
            }
        }
    }
    None
}

/// Finds the grant date: the publication date of the first B-kind document
/// (B1/B2/B3 publications are granted patents).
fn grant_date<'a>(documents: &[&'a Value]) -> Option<&'a str> {
    for doc in documents {
        let kind = doc["@kind"].as_str().unwrap_or_default();
        if !kind.starts_with('B') {
            continue;
        }
        let doc_ids = &doc["bibliographic-data"]["publication-reference"]["document-id"];
        for doc_id in one_or_many(doc_ids) {
            if let Some(date) = date_element(doc_id) {
                return Some(date);
            }
        }
    }
    None
}

fn parse_compact_date(input: &str) -> Option<Date> {
    Date::parse(input, COMPACT_DATE).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::Month;
    use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> EpoConfig {
        EpoConfig::new(Url::parse(&server.uri()).unwrap(), "key", "secret")
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    async fn mount_token(server: &MockServer, token: &str, expect: u64) {
        Mock::given(method("POST"))
            .and(path("/auth/accesstoken"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                // OPS advertises the lifetime as a string.
                "expires_in": "1200",
                "token_type": "BearerToken"
            })))
            .expect(expect)
            .mount(server)
            .await;
    }

    fn granted_payload() -> Value {
        json!({
            "ops:world-patent-data": {
                "exchange-documents": {
                    "exchange-document": [
                        {
                            "@kind": "A1",
                            "bibliographic-data": {
                                "application-reference": {
                                    "document-id": [
                                        {
                                            "@document-id-type": "epodoc",
                                            "date": {"$": "19940615"}
                                        }
                                    ]
                                }
                            }
                        },
                        {
                            "@kind": "B1",
                            "bibliographic-data": {
                                "publication-reference": {
                                    "document-id": {
                                        "date": {"$": "19991103"}
                                    }
                                }
                            }
                        }
                    ]
                }
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_granted_record() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 1).await;

        Mock::given(method("GET"))
            .and(path("/rest-services/published-data/publication/epodoc/EP0683520"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(granted_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), fast_retry());
        let id = PatentId::normalize("EP0683520").unwrap();

        let record = adapter.fetch(&id).await.unwrap().unwrap();
        assert_eq!(record.status, PatentStatus::Granted);
        assert_eq!(record.source, "EPO");
        assert_eq!(
            record.jurisdictions.get("primary").map(String::as_str),
            Some("EP")
        );

        let expiry = record.expiry.unwrap();
        assert!(expiry.computed);
        assert_eq!(
            expiry.date,
            Date::from_calendar_date(2014, Month::June, 15).unwrap()
        );
    }

    #[tokio::test]
    async fn test_pending_when_no_grant_publication() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 1).await;

        let payload = json!({
            "ops:world-patent-data": {
                "exchange-documents": {
                    "exchange-document": {
                        "@kind": "A1",
                        "bibliographic-data": {
                            "application-reference": {
                                "document-id": [
                                    {"@document-id-type": "epodoc", "date": {"$": "20200102"}}
                                ]
                            }
                        }
                    }
                }
            }
        });

        Mock::given(method("GET"))
            .and(path_regex(r"^/rest-services/published-data/publication/epodoc/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload))
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), fast_retry());
        let id = PatentId::normalize("EP1234567").unwrap();

        let record = adapter.fetch(&id).await.unwrap().unwrap();
        assert_eq!(record.status, PatentStatus::Pending);
        assert_eq!(
            record.expiry.unwrap().date,
            Date::from_calendar_date(2040, Month::January, 2).unwrap()
        );
    }

    #[tokio::test]
    async fn test_token_is_cached_across_fetches() {
        let server = MockServer::start().await;
        // Two fetches, one token exchange.
        mount_token(&server, "tok-1", 1).await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/rest-services/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(granted_payload()))
            .expect(2)
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), fast_retry());
        let id = PatentId::normalize("EP0683520").unwrap();

        adapter.fetch(&id).await.unwrap();
        adapter.fetch(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_token_reacquired_after_auth_failure() {
        let server = MockServer::start().await;
        // Initial exchange plus one re-acquisition after the 401.
        mount_token(&server, "tok-1", 2).await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/rest-services/"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/rest-services/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(granted_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), fast_retry());
        let id = PatentId::normalize("EP0683520").unwrap();

        let record = adapter.fetch(&id).await.unwrap().unwrap();
        assert_eq!(record.status, PatentStatus::Granted);
    }

    #[tokio::test]
    async fn test_not_found_on_404() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 1).await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/rest-services/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), fast_retry());
        let id = PatentId::normalize("EP9999999").unwrap();

        assert!(adapter.fetch(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_errors_retried_until_exhausted() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 1).await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/rest-services/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), fast_retry());
        let id = PatentId::normalize("EP0683520").unwrap();

        let err = adapter.fetch(&id).await.unwrap_err();
        assert!(matches!(err, SourceError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 1).await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/rest-services/"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), fast_retry());
        let id = PatentId::normalize("EP0683520").unwrap();

        let err = adapter.fetch(&id).await.unwrap_err();
        assert!(matches!(err, SourceError::Http { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_failed_token_exchange_is_an_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/accesstoken"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let adapter = EpoAdapter::with_retry(config(&server), RetryPolicy::none());
        let id = PatentId::normalize("EP0683520").unwrap();

        let err = adapter.fetch(&id).await.unwrap_err();
        assert!(matches!(err, SourceError::Auth { .. }));
    }

    #[test]
    fn test_safety_margin_floor() {
        let config = EpoConfig::new(Url::parse("https://ops.example.com").unwrap(), "k", "s")
            .with_token_safety_margin(Duration::from_secs(5));
        assert_eq!(config.token_safety_margin, Duration::from_secs(60));
    }

    #[test]
    fn test_expires_in_accepts_string_and_number() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "t", "expires_in": "1200"}"#).unwrap();
        assert_eq!(token.expires_in, Some(1200));

        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "t", "expires_in": 1200}"#).unwrap();
        assert_eq!(token.expires_in, Some(1200));

        let token: TokenResponse = serde_json::from_str(r#"{"access_token": "t"}"#).unwrap();
        assert_eq!(token.expires_in, None);
    }
}
