//! Candle interval definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::IntervalParseError;

/// Candle interval accepted by the charting endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Intraday bars of the given number of minutes.
    Minutes(u32),
    /// Daily bars.
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl Default for Interval {
    fn default() -> Self {
        Self::Minutes(3)
    }
}

impl Interval {
    /// Creates an intraday interval, rejecting zero minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if `minutes` is zero.
    pub fn from_minutes(minutes: u32) -> Result<Self, IntervalParseError> {
        if minutes == 0 {
            return Err(IntervalParseError(minutes.to_string()));
        }
        Ok(Self::Minutes(minutes))
    }

    /// Returns the bar length in minutes, or None for daily and longer bars.
    #[must_use]
    pub const fn minutes(&self) -> Option<u32> {
        match self {
            Self::Minutes(m) => Some(*m),
            Self::Daily | Self::Weekly | Self::Monthly => None,
        }
    }

    /// Returns true for minute-based bars.
    #[must_use]
    pub const fn is_intraday(&self) -> bool {
        matches!(self, Self::Minutes(_))
    }

    /// Returns the `chartType` code sent to the charting endpoint.
    #[must_use]
    pub const fn chart_type(&self) -> &'static str {
        match self {
            Self::Minutes(_) => "I",
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
        }
    }

    /// Returns the `timeInterval` value sent to the charting endpoint.
    #[must_use]
    pub const fn time_interval(&self) -> u32 {
        match self {
            Self::Minutes(m) => *m,
            Self::Daily | Self::Weekly | Self::Monthly => 1,
        }
    }

    /// Seconds between the reported (end-of-candle) timestamp and the
    /// candle's open time.
    ///
    /// Exchange candles are stamped at `open + interval - 1s`, so an
    /// `n`-minute candle is shifted back by `(n - 1) * 60 + 59` seconds.
    /// Daily, weekly and monthly bars are not shifted.
    #[must_use]
    pub const fn end_stamp_offset_secs(&self) -> i64 {
        match self {
            Self::Minutes(m) => {
                let m = if *m == 0 { 1 } else { *m };
                (m as i64 - 1) * 60 + 59
            }
            Self::Daily | Self::Weekly | Self::Monthly => 0,
        }
    }

}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minutes(m) => write!(f, "{m}"),
            Self::Daily => write!(f, "D"),
            Self::Weekly => write!(f, "W"),
            Self::Monthly => write!(f, "M"),
        }
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Upper-case `M` means month; lower-case `m` means minutes.
        match trimmed {
            "M" | "1M" => return Ok(Self::Monthly),
            t if t.ends_with('M') => return Err(IntervalParseError(s.to_string())),
            _ => {}
        }

        let lower = trimmed.to_lowercase();
        match lower.as_str() {
            "d" | "1d" | "day" | "daily" => return Ok(Self::Daily),
            "w" | "1w" | "week" | "weekly" => return Ok(Self::Weekly),
            "1mo" | "month" | "monthly" => return Ok(Self::Monthly),
            _ => {}
        }

        let digits = lower
            .strip_suffix("min")
            .or_else(|| lower.strip_suffix('m'))
            .or_else(|| lower.strip_prefix('m'))
            .unwrap_or(&lower);

        digits
            .parse::<u32>()
            .ok()
            .and_then(|m| Self::from_minutes(m).ok())
            .ok_or_else(|| IntervalParseError(s.to_string()))
    }
}
