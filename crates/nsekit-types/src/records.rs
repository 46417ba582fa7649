//! Typed rows produced from NSE listings, searches and snapshots.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Market segment accepted by the symbol search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// Cash equities.
    #[serde(rename = "EQ")]
    Equity,
    /// Futures and options.
    #[serde(rename = "FO")]
    Derivatives,
    /// Indices.
    #[serde(rename = "IDX")]
    Index,
}

impl Segment {
    /// Returns the segment code sent to the exchange.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "EQ",
            Self::Derivatives => "FO",
            Self::Index => "IDX",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instrument category reported by the symbol search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScripType {
    /// Cash equity.
    Equity,
    /// Index.
    Index,
    /// Futures contract.
    Futures,
    /// Options contract.
    Options,
}

impl ScripType {
    /// Returns the category name as reported by the exchange.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "Equity",
            Self::Index => "Index",
            Self::Futures => "Futures",
            Self::Options => "Options",
        }
    }
}

impl std::fmt::Display for ScripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One symbol search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Trading symbol without its series suffix (e.g. `RELIANCE`).
    pub symbol: String,
    /// Exchange token used by the charting endpoint.
    pub token: String,
    /// Instrument category (`Equity`, `Index`, `Futures`, `Options`).
    pub scrip_type: String,
    /// Human-readable description.
    pub description: String,
}

/// Short market codes accepted by [`MarketState`] lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketCode {
    /// Capital market.
    #[serde(rename = "CM")]
    CapitalMarket,
    /// Currency.
    #[serde(rename = "CUR")]
    Currency,
    /// Commodity.
    #[serde(rename = "COM")]
    Commodity,
    /// Debt.
    #[serde(rename = "DB")]
    Debt,
    /// Currency futures.
    #[serde(rename = "CURF")]
    CurrencyFutures,
}

impl MarketCode {
    /// Returns the market name as reported in the market status payload.
    #[must_use]
    pub const fn market_name(&self) -> &'static str {
        match self {
            Self::CapitalMarket => "Capital Market",
            Self::Currency => "Currency",
            Self::Commodity => "Commodity",
            Self::Debt => "Debt",
            Self::CurrencyFutures => "currencyfuture",
        }
    }
}

impl std::str::FromStr for MarketCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CM" => Ok(Self::CapitalMarket),
            "CUR" => Ok(Self::Currency),
            "COM" => Ok(Self::Commodity),
            "DB" => Ok(Self::Debt),
            "CURF" => Ok(Self::CurrencyFutures),
            _ => Err(format!("unknown market code '{s}'")),
        }
    }
}

/// Open/closed state of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    /// Market name (e.g. `Capital Market`).
    pub market: String,
    /// Status string (e.g. `Open`, `Closed`).
    pub status: String,
    /// Trade date as reported.
    pub trade_date: Option<String>,
    /// Status message.
    pub message: Option<String>,
}

impl MarketState {
    /// Returns true if the market reports itself open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status.eq_ignore_ascii_case("open")
    }
}

/// Live snapshot of one index constituent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConstituent {
    /// Trading symbol.
    pub symbol: String,
    /// Company name.
    pub name: Option<String>,
    /// Series (e.g. `EQ`).
    pub series: Option<String>,
    /// Whether the security trades in the F&O segment.
    pub derivatives: bool,
    /// Opening price.
    pub open: f64,
    /// Day high.
    pub high: f64,
    /// Day low.
    pub low: f64,
    /// Last traded price.
    pub close: f64,
    /// Previous session close.
    pub previous_close: f64,
    /// Absolute change.
    pub change: f64,
    /// Percentage change.
    pub changepct: f64,
    /// Traded volume.
    pub volume: f64,
    /// 52-week high.
    pub year_high: f64,
    /// 52-week low.
    pub year_low: f64,
}

/// One entry of the exchange's index list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexName {
    /// Index name as used by the trading system.
    pub trading_index: String,
    /// Full index name.
    pub full_name: String,
}

/// One row of the listed-equities CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityListing {
    /// Trading symbol.
    pub symbol: String,
    /// Company name.
    pub name: String,
    /// Series.
    pub series: String,
    /// Listing date.
    pub date_of_listing: Option<NaiveDate>,
    /// ISIN.
    pub isin_number: String,
    /// Face value in rupees.
    pub face_value: f64,
}

/// One row of the daily bhavcopy with delivery statistics.
///
/// Turnover is in absolute rupees (the source reports lakhs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BhavcopyRow {
    /// Trade date.
    pub date: Option<NaiveDate>,
    /// Trading symbol.
    pub symbol: String,
    /// Series.
    pub series: String,
    /// Previous session close.
    pub previous_close: f64,
    /// Opening price.
    pub open: f64,
    /// Day high.
    pub high: f64,
    /// Day low.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Volume-weighted average price.
    pub vwap: f64,
    /// Traded quantity.
    pub volume: f64,
    /// Turnover in rupees.
    pub turnover: f64,
    /// Delivered quantity, if reported.
    pub delivery_volume: Option<f64>,
    /// Delivered percentage, if reported.
    pub delivery_pct: Option<f64>,
}

/// Expiry dates and strike prices listed for a stock's options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContractInfo {
    /// Expiry dates in exchange order.
    pub expiry_dates: Vec<NaiveDate>,
    /// Strike prices, truncated to whole rupees.
    pub strike_prices: Vec<i64>,
}

/// Live snapshot of one traded security.
///
/// Volume is in shares and values in rupees (the source reports lakhs and
/// crores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySnapshot {
    /// Trading symbol.
    pub symbol: String,
    /// Series (e.g. `EQ`, `SM`, `BE`).
    pub series: String,
    /// Last traded price.
    pub close: f64,
    /// Previous session close.
    pub previous_close: f64,
    /// Absolute change.
    pub change: f64,
    /// Percentage change.
    pub changepct: f64,
    /// Traded quantity.
    pub volume: i64,
    /// Traded value in rupees.
    pub traded_value: f64,
    /// Market capitalisation in rupees.
    pub market_cap: f64,
}

/// One underlying of the F&O segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnoUnderlying {
    /// Underlying name.
    pub name: String,
    /// Trading symbol.
    pub symbol: String,
}

/// Universe selector of the pre-open session snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreOpenMarket {
    /// NIFTY 50 constituents.
    #[default]
    #[serde(rename = "NIFTY")]
    Nifty,
    /// NIFTY BANK constituents.
    #[serde(rename = "BANKNIFTY")]
    BankNifty,
    /// SME emerge securities.
    #[serde(rename = "SME")]
    Sme,
    /// F&O securities.
    #[serde(rename = "FO")]
    Derivatives,
    /// Securities outside the other groups.
    #[serde(rename = "OTHERS")]
    Others,
    /// Every security in the pre-open session.
    #[serde(rename = "ALL")]
    All,
}

impl PreOpenMarket {
    /// Returns the `key` parameter sent to the exchange.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nifty => "NIFTY",
            Self::BankNifty => "BANKNIFTY",
            Self::Sme => "SME",
            Self::Derivatives => "FO",
            Self::Others => "OTHERS",
            Self::All => "ALL",
        }
    }
}

impl std::fmt::Display for PreOpenMarket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pre-open session quote of one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreOpenQuote {
    /// Trading symbol.
    pub symbol: String,
    /// Indicative equilibrium price.
    pub iep: f64,
    /// Previous session close.
    pub previous_close: f64,
    /// Absolute change against the previous close.
    pub change: f64,
    /// Percentage change.
    pub changepct: f64,
    /// Final pre-open quantity.
    pub quantity: f64,
    /// Total turnover.
    pub total_turnover: f64,
    /// Market capitalisation.
    pub market_cap: f64,
    /// 52-week high.
    pub year_high: f64,
    /// 52-week low.
    pub year_low: f64,
}

/// Which end of the 52-week range a security has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YearExtremeKind {
    /// New 52-week high.
    High,
    /// New 52-week low.
    Low,
}

/// A security trading at a new 52-week high or low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearExtreme {
    /// Trading symbol.
    pub symbol: String,
    /// Series.
    pub series: String,
    /// Company or fund name.
    pub name: String,
    /// The new 52-week high or low.
    pub new_extreme: f64,
    /// The previous 52-week high or low.
    pub previous_extreme: f64,
    /// Date of the previous extreme.
    pub previous_date: Option<NaiveDate>,
    /// Last traded price.
    pub close: f64,
    /// Previous session close.
    pub previous_close: f64,
    /// Absolute change.
    pub change: f64,
    /// Percentage change, rounded to two decimals.
    pub changepct: f64,
}

/// Securities at a new 52-week extreme, with the exchange's data timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearExtremes {
    /// High or low.
    pub kind: YearExtremeKind,
    /// Rows in exchange order.
    pub rows: Vec<YearExtreme>,
    /// Exchange wall-clock time of the snapshot, when reported.
    pub timestamp: Option<NaiveDateTime>,
}

/// One trading holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    /// Holiday date.
    pub date: Option<NaiveDate>,
    /// Weekday name as reported.
    pub day: String,
    /// Occasion.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_code_names() {
        assert_eq!("cm".parse::<MarketCode>().unwrap().market_name(), "Capital Market");
        assert_eq!(
            "CURF".parse::<MarketCode>().unwrap().market_name(),
            "currencyfuture"
        );
        assert!("XYZ".parse::<MarketCode>().is_err());
    }

    #[test]
    fn test_market_state_open() {
        let state = MarketState {
            market: "Capital Market".into(),
            status: "Open".into(),
            trade_date: None,
            message: None,
        };
        assert!(state.is_open());
    }

    #[test]
    fn test_pre_open_keys() {
        assert_eq!(PreOpenMarket::default().as_str(), "NIFTY");
        assert_eq!(PreOpenMarket::Derivatives.to_string(), "FO");
        assert_eq!(
            serde_json::to_string(&PreOpenMarket::BankNifty).unwrap(),
            "\"BANKNIFTY\""
        );
    }

    #[test]
    fn test_segment_codes() {
        assert_eq!(Segment::Derivatives.as_str(), "FO");
        assert_eq!(ScripType::Options.to_string(), "Options");
    }
}
