//! Payload parsing errors.

use thiserror::Error;

/// Errors that can occur while interpreting a response payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The payload carried an explicit failure status.
    #[error("Payload reported status '{0}'")]
    FailureStatus(String),

    /// A required field is missing or has the wrong type.
    #[error("Missing or invalid field '{0}'")]
    MissingField(String),

    /// Parallel arrays disagree in length.
    #[error("Field '{field}' has {found} values, expected {expected}")]
    LengthMismatch {
        /// The offending field.
        field: &'static str,
        /// Length of the timestamp array.
        expected: usize,
        /// Length of the offending array.
        found: usize,
    },

    /// The payload holds no rows.
    #[error("Payload contains no data")]
    NoData,

    /// The payload is not valid CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),
}

impl PayloadError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }
}
