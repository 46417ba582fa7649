//! Query results: table, raw payload, or a tagged absence.

use serde::{Deserialize, Serialize};

/// Selects what a query returns on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Parse and normalize the payload into a typed table.
    #[default]
    Table,
    /// Return the decoded payload without processing.
    Raw,
}

/// Undecorated response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPayload {
    /// A JSON document.
    Json(serde_json::Value),
    /// A text document (CSV listings).
    Text(String),
}

impl RawPayload {
    /// Returns the JSON document, if this is one.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Returns the text document, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// Why a query produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Absence {
    /// The endpoint could not be reached or kept failing.
    Unavailable,
    /// The payload carried an explicit failure status.
    FailureStatus(String),
    /// The payload was well-formed but empty.
    NoData,
    /// A lookup matched nothing.
    NotFound,
    /// The payload did not have the expected shape.
    Malformed(String),
}

impl std::fmt::Display for Absence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "endpoint unavailable"),
            Self::FailureStatus(status) => write!(f, "payload reported status '{status}'"),
            Self::NoData => write!(f, "no data returned"),
            Self::NotFound => write!(f, "no matching entry"),
            Self::Malformed(reason) => write!(f, "malformed payload: {reason}"),
        }
    }
}

/// Outcome of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// Processed data.
    Table(T),
    /// Unprocessed payload, returned in [`FetchMode::Raw`].
    Raw(RawPayload),
    /// No data is available right now.
    Absent(Absence),
}

impl<T> Fetched<T> {
    /// Returns the processed data, if any.
    #[must_use]
    pub fn table(self) -> Option<T> {
        match self {
            Self::Table(table) => Some(table),
            Self::Raw(_) | Self::Absent(_) => None,
        }
    }

    /// Returns the raw payload, if any.
    #[must_use]
    pub fn raw(self) -> Option<RawPayload> {
        match self {
            Self::Raw(payload) => Some(payload),
            Self::Table(_) | Self::Absent(_) => None,
        }
    }

    /// Returns the absence reason, if no data is available.
    #[must_use]
    pub const fn absence(&self) -> Option<&Absence> {
        match self {
            Self::Absent(reason) => Some(reason),
            Self::Table(_) | Self::Raw(_) => None,
        }
    }

    /// Returns true if no data is available.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent(_))
    }

    /// Maps the processed data, leaving raw payloads and absences untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Self::Table(table) => Fetched::Table(f(table)),
            Self::Raw(payload) => Fetched::Raw(payload),
            Self::Absent(reason) => Fetched::Absent(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_absence() {
        let absent: Fetched<u32> = Fetched::Absent(Absence::NoData);
        let mapped = absent.map(|n| n * 2);
        assert_eq!(mapped.absence(), Some(&Absence::NoData));
    }

    #[test]
    fn test_accessors() {
        let table = Fetched::Table(3);
        assert_eq!(table.clone().table(), Some(3));
        assert!(table.raw().is_none());

        let raw: Fetched<u32> = Fetched::Raw(RawPayload::Text("a,b".into()));
        assert!(!raw.is_absent());
        assert_eq!(raw.raw().unwrap().as_text(), Some("a,b"));
    }
}
