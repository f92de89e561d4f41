//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use patstat_resolver::ResolveError;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable error code.
    pub error: &'static str,
    /// Human-readable summary, always safe to expose.
    pub message: String,
    /// Internal detail; only populated when the server runs with `debug`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// Maps a resolution failure onto the HTTP surface.
    ///
    /// Upstream and store details are withheld unless `debug` is set, but
    /// the status codes stay distinct: a patent no source knows is a 404,
    /// a failing provider is a 502, a broken store is a 500.
    #[must_use]
    pub fn from_resolve(err: &ResolveError, debug: bool) -> Self {
        match err {
            ResolveError::Validation(e) => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorBody {
                    error: "validation_error",
                    message: e.to_string(),
                    detail: None,
                },
            },
            ResolveError::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                body: ErrorBody {
                    error: "not_found",
                    message: err.to_string(),
                    detail: None,
                },
            },
            ResolveError::Source(e) => Self {
                status: StatusCode::BAD_GATEWAY,
                body: ErrorBody {
                    error: "source_error",
                    message: format!("External source '{}' is unavailable", e.provider()),
                    detail: debug.then(|| e.to_string()),
                },
            },
            ResolveError::Store(e) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    error: "internal_error",
                    message: "Internal server error".to_string(),
                    detail: debug.then(|| e.to_string()),
                },
            },
        }
    }

    /// Builds the 429 returned when a caller's quota window is exhausted.
    #[must_use]
    pub fn quota_exceeded(reset_at: OffsetDateTime) -> Self {
        let reset = reset_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| reset_at.to_string());
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: ErrorBody {
                error: "rate_limit_exceeded",
                message: format!("Monthly request quota exhausted; resets at {reset}"),
                detail: None,
            },
        }
    }

    /// Generic 500 for infrastructure failures outside the resolver.
    #[must_use]
    pub fn internal(detail: impl Into<String>, debug: bool) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: "internal_error",
                message: "Internal server error".to_string(),
                detail: debug.then(|| detail.into()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
