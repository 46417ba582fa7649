//! Error types for nsekit.

use chrono::NaiveTime;
use thiserror::Error;

/// Result type alias for nsekit operations.
pub type Result<T> = std::result::Result<T, NseError>;

/// Hard failures surfaced to callers.
///
/// Recoverable conditions (network trouble, empty payloads) are reported as
/// [`crate::Absence`] instead; this type is reserved for misuse and setup
/// problems.
#[derive(Error, Debug)]
pub enum NseError {
    /// A request was malformed before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid candle interval.
    #[error(transparent)]
    Interval(#[from] IntervalParseError),

    /// Invalid session window.
    #[error(transparent)]
    SessionWindow(#[from] SessionWindowError),
}

/// Error returned when parsing an invalid interval string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid interval '{0}', expected minutes (1, 3, 5, ...) or one of: D, W, M")]
pub struct IntervalParseError(pub String);

/// Error for invalid session windows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionWindowError {
    /// Opening time is not before the closing time.
    #[error("Invalid session window: {open} >= {close}")]
    InvalidRange {
        /// The opening time.
        open: NaiveTime,
        /// The closing time.
        close: NaiveTime,
    },

    /// An hour/minute pair does not form a valid time of day.
    #[error("Invalid time of day: {hour:02}:{minute:02}")]
    InvalidTime {
        /// The hour component.
        hour: u32,
        /// The minute component.
        minute: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_client_error_keeps_source() {
        let cause = std::io::Error::other("tls backend unavailable");
        let error = NseError::Client(Box::new(cause));
        assert_eq!(error.to_string(), "HTTP client error: tls backend unavailable");
        assert_eq!(
            error.source().map(ToString::to_string).as_deref(),
            Some("tls backend unavailable")
        );
    }
}
