//! HTTP handlers.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use patstat_core::{PatentId, PatentStatus};
use patstat_resolver::Resolution;
use patstat_store::{CacheEntry, PurgeTarget};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::{Date, OffsetDateTime};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: usize = 10;
const MAX_LIST_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub patent: String,
}

/// Wire shape of a resolved patent status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub patent_number: String,
    pub status: PatentStatus,
    pub expiry_date: Option<Date>,
    /// Whether `expiry_date` is a filing-date + 20-years estimate rather
    /// than a provider-asserted date. Absent when there is no date at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_estimated: Option<bool>,
    pub jurisdictions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lapse_reason: Option<String>,
    pub source: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_fetched: OffsetDateTime,
    pub cache_hit: bool,
}

impl From<Resolution> for StatusResponse {
    fn from(resolution: Resolution) -> Self {
        let record = resolution.record;
        Self {
            patent_number: record.id.as_str().to_string(),
            status: record.status,
            expiry_date: record.expiry.map(|e| e.date),
            expiry_estimated: record.expiry.map(|e| e.computed),
            jurisdictions: record.jurisdictions,
            lapse_reason: record.lapse_reason,
            source: resolution.source,
            last_fetched: record.fetched_at,
            cache_hit: resolution.cache_hit,
        }
    }
}

/// `GET /api/v1/status?patent=…`
pub async fn patent_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let resolution = state
        .resolver
        .resolve(&query.patent)
        .await
        .map_err(|e| ApiError::from_resolve(&e, state.config.debug))?;
    Ok(Json(StatusResponse::from(resolution)))
}

/// `GET /api/v1/health` — liveness plus a store probe.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let store = state.resolver.store();
    match store.list_top(1).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "store": store.backend_name(),
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "store health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "store": store.backend_name(),
                })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }
}

/// Wire shape of a cache entry in the observability views.
#[derive(Debug, Serialize)]
pub struct CacheEntrySummary {
    pub patent_number: String,
    pub status: PatentStatus,
    pub source: String,
    pub fetch_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_fetched: OffsetDateTime,
}

impl From<CacheEntry> for CacheEntrySummary {
    fn from(entry: CacheEntry) -> Self {
        Self {
            patent_number: entry.record.id.as_str().to_string(),
            status: entry.record.status,
            source: entry.record.source,
            fetch_count: entry.fetch_count,
            last_fetched: entry.last_fetched,
        }
    }
}

/// `GET /api/v1/cache/top?limit=` — most popular entries.
pub async fn cache_top(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CacheEntrySummary>>, ApiError> {
    let entries = state
        .resolver
        .store()
        .list_top(query.limit())
        .await
        .map_err(|e| ApiError::internal(e.to_string(), state.config.debug))?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// `GET /api/v1/cache/stale?limit=` — expired entries, most popular first,
/// the refresh priority order.
pub async fn cache_stale(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CacheEntrySummary>>, ApiError> {
    let entries = state
        .resolver
        .store()
        .list_stale(query.limit())
        .await
        .map_err(|e| ApiError::internal(e.to_string(), state.config.debug))?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct PurgeQuery {
    pub patent: Option<String>,
}

/// `DELETE /api/v1/cache?patent=…` — admin purge of one entry, or all of
/// them when no identifier is given.
pub async fn purge_cache(
    State(state): State<AppState>,
    Query(query): Query<PurgeQuery>,
) -> Result<Json<Value>, ApiError> {
    let target = match &query.patent {
        Some(raw) => {
            let id = PatentId::normalize(raw).map_err(|e| {
                ApiError::from_resolve(&e.into(), state.config.debug)
            })?;
            PurgeTarget::One(id)
        }
        None => PurgeTarget::All,
    };

    let purged = state
        .resolver
        .store()
        .purge(target)
        .await
        .map_err(|e| ApiError::internal(e.to_string(), state.config.debug))?;
    tracing::info!(purged, "cache purge");
    Ok(Json(json!({ "purged": purged })))
}
