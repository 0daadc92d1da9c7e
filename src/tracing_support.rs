//! Tracing support for query execution
//!
//! Every request the binding sends produces one `QuerySpan` describing what
//! ran, how long it took, how many rows came back and, on failure, how the
//! error was classified. Spans are handed to a `SpanEmitter`; the default
//! emitter turns them into `tracing` events.
//!
//! # Span Fields
//!
//! - `db.system`: always `"ydb"`
//! - `operation`: the query template (`read`, `scan`, `batch_insert`, ...)
//! - `mode`: `data`, `scan` or `scheme`
//! - `rows`: rows returned (queries only)
//! - `attempts`: number of tries including retries
//!
//! # Example
//!
//! ```
//! use ycsb_ydb::query::Template;
//! use ycsb_ydb::tracing_support::SpanTimer;
//! use ycsb_ydb::QueryMode;
//!
//! let timer = SpanTimer::start(Template::Read, QueryMode::Data);
//! let span = timer.finish_success(1, 1);
//! assert!(!span.is_error());
//! ```

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::executor::QueryMode;
use crate::query::Template;

/// Error classification for YDB operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Authentication or authorization error
    Auth,
    /// Rate limiting error (HTTP 429)
    RateLimit,
    /// YQL compile or execution error
    Query,
    /// Response decoding error
    Decode,
    /// Request timeout
    Timeout,
    /// Network or connection error
    Network,
    /// Server overloaded or session unavailable
    Overloaded,
    /// Unknown error
    Unknown,
}

impl ErrorClass {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Auth => "auth",
            ErrorClass::RateLimit => "rate_limit",
            ErrorClass::Query => "query",
            ErrorClass::Decode => "decode",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Network => "network",
            ErrorClass::Overloaded => "overloaded",
            ErrorClass::Unknown => "unknown",
        }
    }

    /// Classify an error from an HTTP status code
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorClass::Auth,
            429 => ErrorClass::RateLimit,
            400 => ErrorClass::Query,
            408 | 504 => ErrorClass::Timeout,
            502 | 503 => ErrorClass::Network,
            _ => ErrorClass::Unknown,
        }
    }

    /// Classify an error from a YDB status code
    pub fn from_status(status: &str) -> Self {
        match status {
            "UNAUTHORIZED" => ErrorClass::Auth,
            "OVERLOADED" | "UNAVAILABLE" | "BAD_SESSION" | "SESSION_BUSY"
            | "SESSION_EXPIRED" | "ABORTED" => ErrorClass::Overloaded,
            "TIMEOUT" | "CANCELLED" => ErrorClass::Timeout,
            "BAD_REQUEST" | "SCHEME_ERROR" | "GENERIC_ERROR" | "PRECONDITION_FAILED"
            | "ALREADY_EXISTS" | "NOT_FOUND" => ErrorClass::Query,
            "UNDETERMINED" | "TRANSPORT_UNAVAILABLE" => ErrorClass::Network,
            _ => ErrorClass::Unknown,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Span metadata for one request
#[derive(Debug, Clone)]
pub struct QuerySpan {
    /// The query template
    pub operation: Template,
    /// The query mode
    pub mode: QueryMode,
    /// Rows returned (queries only)
    pub rows: Option<usize>,
    /// Tries including retries
    pub attempts: u32,
    /// Total duration across all attempts
    pub duration: Option<Duration>,
    /// Error class (if failed)
    pub error_class: Option<ErrorClass>,
    /// Error message (if failed)
    pub error_message: Option<String>,
}

impl QuerySpan {
    /// Create a new span for an operation
    pub fn new(operation: Template, mode: QueryMode) -> Self {
        Self {
            operation,
            mode,
            rows: None,
            attempts: 0,
            duration: None,
            error_class: None,
            error_message: None,
        }
    }

    /// Record an error
    pub fn record_error(&mut self, error_class: ErrorClass, message: impl Into<String>) {
        self.error_class = Some(error_class);
        self.error_message = Some(message.into());
    }

    /// Check if the span represents a failure
    pub fn is_error(&self) -> bool {
        self.error_class.is_some()
    }
}

/// Receives finished spans
pub trait SpanEmitter: Send + Sync {
    /// Emit a span
    fn emit_span(&self, span: &QuerySpan);
}

/// Emits spans as `tracing` debug events
///
/// Failures are reported here at debug level only; the binding logs them
/// once at error level.
#[derive(Debug, Clone, Default)]
pub struct TracingSpanEmitter;

impl SpanEmitter for TracingSpanEmitter {
    fn emit_span(&self, span: &QuerySpan) {
        let duration_us = span.duration.map(|d| d.as_micros() as u64).unwrap_or(0);
        match (&span.error_class, &span.error_message) {
            (Some(class), message) => tracing::debug!(
                db.system = "ydb",
                operation = %span.operation,
                mode = %span.mode,
                attempts = span.attempts,
                duration_us,
                error.class = %class,
                error.message = message.as_deref().unwrap_or(""),
                "ydb request failed"
            ),
            (None, _) => tracing::debug!(
                db.system = "ydb",
                operation = %span.operation,
                mode = %span.mode,
                attempts = span.attempts,
                duration_us,
                rows = span.rows.unwrap_or(0),
                "ydb request completed"
            ),
        }
    }
}

/// A span emitter that records spans in memory
#[derive(Debug, Default)]
pub struct RecordingSpanEmitter {
    spans: Mutex<Vec<QuerySpan>>,
}

impl RecordingSpanEmitter {
    /// Create a new recording emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans captured so far, oldest first
    pub fn spans(&self) -> Vec<QuerySpan> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Get the number of captured spans
    pub fn len(&self) -> usize {
        self.spans.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Check if no spans have been captured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpanEmitter for RecordingSpanEmitter {
    fn emit_span(&self, span: &QuerySpan) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.push(span.clone());
        }
    }
}

/// Times a request and produces its span
pub struct SpanTimer {
    start: Instant,
    span: QuerySpan,
}

impl SpanTimer {
    /// Start timing an operation
    pub fn start(operation: Template, mode: QueryMode) -> Self {
        Self {
            start: Instant::now(),
            span: QuerySpan::new(operation, mode),
        }
    }

    /// Finish timing and record success
    pub fn finish_success(mut self, rows: usize, attempts: u32) -> QuerySpan {
        self.span.duration = Some(self.start.elapsed());
        self.span.attempts = attempts;
        if self.span.operation_returns_rows() {
            self.span.rows = Some(rows);
        }
        self.span
    }

    /// Finish timing and record an error
    pub fn finish_error(
        mut self,
        error_class: ErrorClass,
        message: impl Into<String>,
        attempts: u32,
    ) -> QuerySpan {
        self.span.duration = Some(self.start.elapsed());
        self.span.attempts = attempts;
        self.span.record_error(error_class, message);
        self.span
    }
}

impl QuerySpan {
    fn operation_returns_rows(&self) -> bool {
        matches!(
            self.operation,
            Template::Read | Template::BatchRead | Template::Scan
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class_as_str() {
        assert_eq!(ErrorClass::Auth.as_str(), "auth");
        assert_eq!(ErrorClass::RateLimit.as_str(), "rate_limit");
        assert_eq!(ErrorClass::Query.as_str(), "query");
        assert_eq!(ErrorClass::Decode.as_str(), "decode");
        assert_eq!(ErrorClass::Timeout.as_str(), "timeout");
        assert_eq!(ErrorClass::Network.as_str(), "network");
        assert_eq!(ErrorClass::Overloaded.as_str(), "overloaded");
        assert_eq!(ErrorClass::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_error_class_from_http_status() {
        assert_eq!(ErrorClass::from_http_status(401), ErrorClass::Auth);
        assert_eq!(ErrorClass::from_http_status(403), ErrorClass::Auth);
        assert_eq!(ErrorClass::from_http_status(429), ErrorClass::RateLimit);
        assert_eq!(ErrorClass::from_http_status(400), ErrorClass::Query);
        assert_eq!(ErrorClass::from_http_status(504), ErrorClass::Timeout);
        assert_eq!(ErrorClass::from_http_status(502), ErrorClass::Network);
        assert_eq!(ErrorClass::from_http_status(500), ErrorClass::Unknown);
    }

    #[test]
    fn test_error_class_from_status() {
        assert_eq!(ErrorClass::from_status("OVERLOADED"), ErrorClass::Overloaded);
        assert_eq!(ErrorClass::from_status("BAD_SESSION"), ErrorClass::Overloaded);
        assert_eq!(ErrorClass::from_status("SCHEME_ERROR"), ErrorClass::Query);
        assert_eq!(ErrorClass::from_status("TIMEOUT"), ErrorClass::Timeout);
        assert_eq!(ErrorClass::from_status("UNAUTHORIZED"), ErrorClass::Auth);
        assert_eq!(ErrorClass::from_status("SOMETHING_NEW"), ErrorClass::Unknown);
    }

    #[test]
    fn test_span_timer_success() {
        let timer = SpanTimer::start(Template::Scan, QueryMode::Scan);
        std::thread::sleep(Duration::from_millis(5));

        let span = timer.finish_success(7, 2);
        assert!(span.duration.unwrap() >= Duration::from_millis(5));
        assert_eq!(span.rows, Some(7));
        assert_eq!(span.attempts, 2);
        assert!(!span.is_error());
    }

    #[test]
    fn test_span_timer_exec_has_no_rows() {
        let span = SpanTimer::start(Template::Insert, QueryMode::Data).finish_success(0, 1);
        assert!(span.rows.is_none());
    }

    #[test]
    fn test_span_timer_error() {
        let span = SpanTimer::start(Template::Delete, QueryMode::Data).finish_error(
            ErrorClass::Overloaded,
            "try later",
            5,
        );

        assert!(span.is_error());
        assert_eq!(span.error_class, Some(ErrorClass::Overloaded));
        assert_eq!(span.error_message.as_deref(), Some("try later"));
    }

    #[test]
    fn test_recording_span_emitter() {
        let emitter = RecordingSpanEmitter::new();
        assert!(emitter.is_empty());

        emitter.emit_span(&QuerySpan::new(Template::Read, QueryMode::Data));

        assert_eq!(emitter.len(), 1);
        assert_eq!(emitter.spans()[0].operation, Template::Read);
    }

    #[test]
    fn test_tracing_emitter_without_subscriber() {
        let mut span = QuerySpan::new(Template::Update, QueryMode::Data);
        TracingSpanEmitter.emit_span(&span);
        span.record_error(ErrorClass::Query, "bad");
        TracingSpanEmitter.emit_span(&span);
    }
}
