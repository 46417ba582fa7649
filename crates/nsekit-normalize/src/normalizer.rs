//! Candle normalization: open-time correction, rounding, session filtering.

use chrono::{DurationRound, NaiveDateTime, TimeDelta, Timelike};
use nsekit_types::{Candle, CandleTable, EpochUnit, Interval, RawCandle, SessionWindow};
use std::collections::HashSet;

/// Converts exchange-reported candles into a clean candle table.
///
/// Intraday candles are stamped at the END of the bar; the normalizer shifts
/// them back to their open time, rounds to the minute, keeps rows inside the
/// session window, removes duplicate timestamps (first occurrence wins) and
/// sorts ascending. Daily, weekly and monthly bars are only deduplicated and
/// sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    interval: Interval,
    window: SessionWindow,
}

impl Normalizer {
    /// Creates a normalizer for the given interval and session window.
    #[must_use]
    pub const fn new(interval: Interval, window: SessionWindow) -> Self {
        Self { interval, window }
    }

    /// Creates a normalizer using the regular 09:15-15:30 session.
    #[must_use]
    pub fn for_interval(interval: Interval) -> Self {
        Self::new(interval, SessionWindow::regular())
    }

    /// Returns the candle interval.
    #[must_use]
    pub const fn interval(&self) -> Interval {
        self.interval
    }

    /// Returns the session window.
    #[must_use]
    pub const fn window(&self) -> SessionWindow {
        self.window
    }

    /// Normalizes raw candles into a table.
    ///
    /// Rows whose timestamps cannot be represented are dropped.
    #[must_use]
    pub fn normalize(&self, raw: &[RawCandle]) -> CandleTable {
        let offset_ms = self.interval.end_stamp_offset_secs() * 1000;

        let candles = raw.iter().filter_map(|row| {
            let corrected = RawCandle {
                timestamp: row.epoch_millis().saturating_sub(offset_ms),
                unit: EpochUnit::Milliseconds,
                ..*row
            };
            let datetime = corrected.wall_clock();
            if datetime.is_none() {
                tracing::trace!(timestamp = row.timestamp, "dropping out-of-range timestamp");
            }
            datetime.map(|dt| corrected.at(dt))
        });

        self.finish(candles.collect())
    }

    /// Re-applies rounding, session filtering, deduplication and sorting.
    ///
    /// `tidy(normalize(x)) == normalize(x)` for any input.
    #[must_use]
    pub fn tidy(&self, table: CandleTable) -> CandleTable {
        self.finish(table.into_rows())
    }

    fn finish(&self, candles: Vec<Candle>) -> CandleTable {
        let candles: Vec<Candle> = if self.interval.is_intraday() {
            candles
                .into_iter()
                .map(|c| Candle {
                    datetime: round_to_minute(c.datetime),
                    ..c
                })
                .filter(|c| self.window.contains_datetime(c.datetime))
                .collect()
        } else {
            candles
        };

        CandleTable::new(dedup_sorted(candles))
    }
}

/// Rounds to the minute: up when more than one second past it, down
/// otherwise. Sub-second parts are dropped.
#[must_use]
pub fn round_to_minute(datetime: NaiveDateTime) -> NaiveDateTime {
    let base = datetime
        .duration_trunc(TimeDelta::minutes(1))
        .unwrap_or(datetime);
    if datetime.second() > 1 {
        base + TimeDelta::minutes(1)
    } else {
        base
    }
}

/// Removes duplicate timestamps keeping the first, then sorts stably.
fn dedup_sorted(candles: Vec<Candle>) -> Vec<Candle> {
    let mut seen = HashSet::with_capacity(candles.len());
    let mut unique: Vec<Candle> = candles
        .into_iter()
        .filter(|c| seen.insert(c.datetime))
        .collect();
    unique.sort_by_key(|c| c.datetime);
    unique
}
