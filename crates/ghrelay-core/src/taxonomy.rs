//! Error taxonomy - closed set of failure codes
//!
//! Every failure that reaches a result envelope is reduced to one [`ErrorCode`].
//! Raw failures are mapped with a single ordered keyword table; retryability is
//! derived from the code alone.

use serde::{Deserialize, Serialize};

/// Failure classification carried by every error envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input rejected before or by the remote service
    Validation,
    /// Missing, invalid or insufficient credentials
    Auth,
    /// Target resource does not exist
    NotFound,
    /// Request throttled by the remote service
    RateLimit,
    /// Connectivity problem or timeout
    Network,
    /// Remote service failure, including malformed payloads
    Server,
    /// No route can serve the capability in this environment
    AdapterUnsupported,
    /// Anything not matched by the table
    Unknown,
}

/// Ordered keyword table. First matching row wins, so rate-limit phrasing is
/// checked before auth (GitHub reports secondary limits as 403).
const PATTERNS: &[(ErrorCode, &[&str])] = &[
    (
        ErrorCode::RateLimit,
        &[
            "rate limit",
            "rate_limited",
            "secondary rate",
            "too many requests",
            "abuse detection",
        ],
    ),
    (
        ErrorCode::Auth,
        &[
            "bad credentials",
            "unauthorized",
            "authentication",
            "not logged in",
            "gh auth login",
            "forbidden",
            "resource not accessible",
            "insufficient scopes",
        ],
    ),
    (
        ErrorCode::NotFound,
        &[
            "not found",
            "not_found",
            "could not resolve",
            "no such",
            "does not exist",
        ],
    ),
    (
        ErrorCode::Network,
        &[
            "timed out",
            "timeout",
            "connection refused",
            "connection reset",
            "network",
            "dns error",
            "econnreset",
            "enotfound",
            "eai_again",
        ],
    ),
    (
        ErrorCode::Server,
        &[
            "server error",
            "internal error",
            "bad gateway",
            "service unavailable",
            "something went wrong",
            "malformed",
            "unexpected response",
        ],
    ),
    (
        ErrorCode::Validation,
        &[
            "invalid",
            "validation",
            "must be",
            "is required",
            "missing required",
            "unprocessable",
        ],
    ),
];

impl ErrorCode {
    /// Returns the wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Auth => "AUTH",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimit => "RATE_LIMIT",
            Self::Network => "NETWORK",
            Self::Server => "SERVER",
            Self::AdapterUnsupported => "ADAPTER_UNSUPPORTED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether a failure with this code may succeed on retry
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Server)
    }

    /// Classify a raw failure message (case-insensitive)
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        PATTERNS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(code, _)| *code)
            .unwrap_or(Self::Unknown)
    }

    /// Classify an HTTP status, letting rate-limit phrasing override the status
    #[must_use]
    pub fn from_http_status(status: u16, message: &str) -> Self {
        let by_message = Self::classify(message);
        if by_message == Self::RateLimit {
            return Self::RateLimit;
        }
        match status {
            401 | 403 => Self::Auth,
            404 => Self::NotFound,
            429 => Self::RateLimit,
            400 | 422 => Self::Validation,
            s if s >= 500 => Self::Server,
            _ => by_message,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
