//! Error types for the YDB binding
//!
//! Errors carry enough classification for the retry helper to decide
//! whether a request may be re-run:
//! - Retriable: transport failures, timeouts, overload and session churn
//! - Non-retriable: query errors, decode errors, configuration errors

use thiserror::Error;

use crate::tracing_support::ErrorClass;

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, Error>;

/// YDB statuses that are safe to retry for idempotent requests
const RETRIABLE_STATUSES: &[&str] = &[
    "OVERLOADED",
    "UNAVAILABLE",
    "BAD_SESSION",
    "SESSION_BUSY",
    "SESSION_EXPIRED",
    "ABORTED",
    "UNDETERMINED",
    "TIMEOUT",
];

/// Main error type for the binding
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The request never produced an HTTP response
    #[error("transport error: {message}")]
    Transport {
        message: String,
        timeout: bool,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The endpoint answered with a non-success HTTP status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// YDB rejected or failed the query
    #[error("query failed with status {status}: {message}")]
    Status { status: String, message: String },

    /// The response could not be decoded
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A value could not be built or converted
    #[error("value error: {message}")]
    Value { message: String },

    /// The binding was used after `close`
    #[error("database is closed")]
    Closed,
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a value error
    pub fn value(message: impl Into<String>) -> Self {
        Self::Value {
            message: message.into(),
        }
    }

    /// Create a status error from a YDB status and its issue messages
    pub fn status(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Classify the error for logging and retry decisions
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration { .. } | Self::Value { .. } | Self::Closed => ErrorClass::Unknown,
            Self::Transport { timeout: true, .. } => ErrorClass::Timeout,
            Self::Transport { .. } => ErrorClass::Network,
            Self::Http { status, .. } => ErrorClass::from_http_status(*status),
            Self::Status { status, .. } => ErrorClass::from_status(status),
            Self::Decode { .. } => ErrorClass::Decode,
        }
    }

    /// Whether re-running the same request may succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::Status { status, .. } => RETRIABLE_STATUSES.contains(&status.as_str()),
            _ => false,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
            timeout: e.is_timeout(),
            source: Some(Box::new(e)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}
