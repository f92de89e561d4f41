//! Source adapter error types.

/// Errors that can occur while fetching from an external source.
///
/// "Patent not found" is not an error; adapters signal it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The provider could not be reached, including timeouts.
    #[error("{provider}: network error: {message}")]
    Network {
        /// The adapter that produced the error.
        provider: &'static str,
        /// Description of the network failure.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("{provider}: HTTP error: status {status}")]
    Http {
        /// The adapter that produced the error.
        provider: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// Credential exchange or bearer authentication failed.
    #[error("{provider}: authentication failed: {message}")]
    Auth {
        /// The adapter that produced the error.
        provider: &'static str,
        /// Description of the authentication failure.
        message: String,
    },

    /// The provider payload could not be parsed.
    #[error("{provider}: failed to parse response: {message}")]
    Parse {
        /// The adapter that produced the error.
        provider: &'static str,
        /// Description of the parse failure.
        message: String,
    },
}

impl SourceError {
    /// Creates a new `Network` error.
    #[must_use]
    pub fn network(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            provider,
            message: message.into(),
        }
    }

    /// Creates a new `Http` error.
    #[must_use]
    pub fn http(provider: &'static str, status: u16) -> Self {
        Self::Http { provider, status }
    }

    /// Creates a new `Auth` error.
    #[must_use]
    pub fn auth(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Auth {
            provider,
            message: message.into(),
        }
    }

    /// Creates a new `Parse` error.
    #[must_use]
    pub fn parse(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            provider,
            message: message.into(),
        }
    }

    /// The adapter this error came from.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Network { provider, .. }
            | Self::Http { provider, .. }
            | Self::Auth { provider, .. }
            | Self::Parse { provider, .. } => provider,
        }
    }

    /// Whether a retry may succeed.
    ///
    /// Timeouts and other network failures, server-side (5xx) errors, and
    /// auth failures (the retry re-acquires a token) are transient. Other
    /// client (4xx) errors and parse failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Auth { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Parse { .. } => false,
        }
    }
}
