//! Mapping of fetch and payload failures onto query outcomes.

use nsekit_fetch::FetchError;
use nsekit_normalize::PayloadError;
use nsekit_types::{Absence, Fetched, NseError};

/// Internal short-circuit for query functions.
///
/// `Fatal` becomes the caller's `Err`; `Absent` becomes
/// [`Fetched::Absent`].
#[derive(Debug)]
pub(crate) enum QueryError {
    Fatal(NseError),
    Absent(Absence),
}

impl From<NseError> for QueryError {
    fn from(error: NseError) -> Self {
        Self::Fatal(error)
    }
}

impl From<FetchError> for QueryError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::InvalidRequest(msg) => Self::Fatal(NseError::InvalidRequest(msg)),
            FetchError::Client(e) => Self::Fatal(NseError::Client(Box::new(e))),
            FetchError::Rejected { status: 404 } => Self::Absent(Absence::NotFound),
            other => {
                tracing::warn!(error = %other, "endpoint unavailable");
                Self::Absent(Absence::Unavailable)
            }
        }
    }
}

impl From<PayloadError> for QueryError {
    fn from(error: PayloadError) -> Self {
        let absence = match error {
            PayloadError::FailureStatus(status) => Absence::FailureStatus(status),
            PayloadError::NoData => Absence::NoData,
            other => Absence::Malformed(other.to_string()),
        };
        tracing::debug!(%absence, "payload yielded no table");
        Self::Absent(absence)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(error: serde_json::Error) -> Self {
        Self::Absent(Absence::Malformed(error.to_string()))
    }
}

/// Folds absences into the success channel.
pub(crate) fn settle<T>(result: Result<Fetched<T>, QueryError>) -> nsekit_types::Result<Fetched<T>> {
    match result {
        Ok(fetched) => Ok(fetched),
        Err(QueryError::Absent(reason)) => Ok(Fetched::Absent(reason)),
        Err(QueryError::Fatal(error)) => Err(error),
    }
}
