//! Error types for ghrelay-core

use crate::taxonomy::ErrorCode;
use thiserror::Error;

/// Engine and collaborator error type
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any I/O
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No adapter can serve the request
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Network failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the remote API
    #[error("http error ({status}): {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// External command failed to run
    #[error("command failed: {0}")]
    Command(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Upstream payload could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Operation document could not be compiled
    #[error("document error: {0}")]
    Document(String),

    /// CLI environment detection could not complete
    #[error("preflight failed: {0}")]
    Preflight(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Map this error onto the closed taxonomy
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::Validation,
            Self::Unsupported(_) => ErrorCode::AdapterUnsupported,
            Self::Network(_) | Self::Timeout(_) => ErrorCode::Network,
            Self::Http { status, message } => ErrorCode::from_http_status(*status, message),
            Self::MalformedResponse(_) | Self::Json(_) => ErrorCode::Server,
            Self::Document(_) => ErrorCode::Unknown,
            Self::Command(msg) | Self::Preflight(msg) => ErrorCode::classify(msg),
            Self::Io(e) => ErrorCode::classify(&e.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
