//! Candle data representation.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Resolution of an exchange-reported epoch timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochUnit {
    /// Seconds since the Unix epoch.
    Seconds,
    /// Milliseconds since the Unix epoch.
    Milliseconds,
}

/// Raw candle as reported by a charting endpoint (before normalization).
///
/// Intraday timestamps mark the END of the candle and encode exchange
/// wall-clock time as if it were UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCandle {
    /// Epoch timestamp in `unit`.
    pub timestamp: i64,
    /// Unit of `timestamp`.
    pub unit: EpochUnit,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

impl RawCandle {
    /// Creates a new raw candle.
    #[must_use]
    pub const fn new(
        timestamp: i64,
        unit: EpochUnit,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            unit,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns the timestamp in milliseconds since the epoch.
    #[must_use]
    pub const fn epoch_millis(&self) -> i64 {
        match self.unit {
            EpochUnit::Seconds => self.timestamp.saturating_mul(1000),
            EpochUnit::Milliseconds => self.timestamp,
        }
    }

    /// Returns the timestamp in whole seconds since the epoch.
    #[must_use]
    pub const fn epoch_seconds(&self) -> i64 {
        match self.unit {
            EpochUnit::Seconds => self.timestamp,
            EpochUnit::Milliseconds => self.timestamp.div_euclid(1000),
        }
    }

    /// Decodes the timestamp into exchange wall-clock time.
    ///
    /// Returns `None` if the timestamp is out of range.
    #[must_use]
    pub fn wall_clock(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp_millis(self.epoch_millis()).map(|dt| dt.naive_utc())
    }

    /// Converts into a normalized candle at the given datetime.
    #[must_use]
    pub const fn at(self, datetime: NaiveDateTime) -> Candle {
        Candle {
            datetime,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// A normalized OHLCV candle keyed by its opening time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time (exchange wall clock).
    pub datetime: NaiveDateTime,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

impl Candle {
    /// Creates a new candle.
    #[must_use]
    pub const fn new(
        datetime: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// An ordered, deduplicated table of normalized candles.
///
/// The table has no mutating accessors; it is treated as immutable once
/// produced by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandleTable {
    rows: Vec<Candle>,
}

impl CandleTable {
    /// Canonical column names, in order.
    pub const COLUMNS: [&'static str; 6] = ["datetime", "open", "high", "low", "close", "volume"];

    /// Creates a table from rows that are already normalized.
    #[must_use]
    pub const fn new(rows: Vec<Candle>) -> Self {
        Self { rows }
    }

    /// Creates an empty table.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    /// Returns the canonical column names.
    #[must_use]
    pub const fn columns(&self) -> &'static [&'static str] {
        &Self::COLUMNS
    }

    /// Returns the rows of the table.
    #[must_use]
    pub fn rows(&self) -> &[Candle] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.rows.iter()
    }

    /// Returns the first (oldest) row.
    #[must_use]
    pub fn first(&self) -> Option<&Candle> {
        self.rows.first()
    }

    /// Returns the last (newest) row.
    #[must_use]
    pub fn last(&self) -> Option<&Candle> {
        self.rows.last()
    }

    /// Consumes the table, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Candle> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a CandleTable {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
