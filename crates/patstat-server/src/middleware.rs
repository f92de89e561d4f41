//! Quota enforcement middleware.
//!
//! Runs before resolution: derives the caller identity, charges one request
//! against the caller's window and either admits the request or answers 429.
//! Every response passing through gains `X-RateLimit-*` headers.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use patstat_quota::{CallerKey, QuotaDecision, Tier};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn quota_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let key = caller_key(&state, headers, &request);
    let tier = caller_tier(&state, headers);

    let decision = state.quota.check_and_consume(&key, tier);
    if !decision.allowed {
        tracing::warn!(tier = tier.label(), "request quota exhausted");
        let mut response = ApiError::quota_exceeded(decision.reset_at).into_response();
        annotate(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    annotate(&mut response, &decision);
    response
}

/// Derives the caller identity: first configured credential header, else
/// the client IP. Raw credentials are hashed inside [`CallerKey`] and never
/// kept.
fn caller_key(state: &AppState, headers: &HeaderMap, request: &Request) -> CallerKey {
    for name in &state.config.quota.credential_headers {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok())
            && !value.is_empty()
        {
            return CallerKey::from_credential(value);
        }
    }
    CallerKey::from_ip(client_ip(headers, request))
}

fn caller_tier(state: &AppState, headers: &HeaderMap) -> Tier {
    headers
        .get(&state.config.quota.tier_header)
        .and_then(|v| v.to_str().ok())
        .map_or(Tier::Free, Tier::from_label)
}

/// Client IP: first `X-Forwarded-For` hop when behind a proxy, else the
/// socket peer address.
fn client_ip(headers: &HeaderMap, request: &Request) -> IpAddr {
    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|v| v.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
        && let Ok(ip) = first.trim().parse()
    {
        return ip;
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip())
}

fn annotate(response: &mut Response, decision: &QuotaDecision) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", number(decision.limit));
    headers.insert("X-RateLimit-Remaining", number(decision.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        number(decision.reset_at.unix_timestamp().max(0) as u64),
    );
}

fn number(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}
