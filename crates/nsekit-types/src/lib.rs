//! Core types for the nsekit NSE market data client.
//!
//! This crate provides the fundamental data structures used throughout nsekit:
//!
//! - [`RawCandle`] - Exchange-reported OHLCV row keyed by an epoch timestamp
//! - [`Candle`] / [`CandleTable`] - Normalized candles keyed by open time
//! - [`Interval`] - Candle interval (minutes, daily, weekly, monthly)
//! - [`SessionWindow`] - Regular trading session time-of-day window
//! - [`Fetched`] - Table, raw payload, or tagged absence returned by queries

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod candle;
mod error;
mod fetched;
mod interval;
mod records;
mod session;

pub use candle::{Candle, CandleTable, EpochUnit, RawCandle};
pub use error::{IntervalParseError, NseError, Result, SessionWindowError};
pub use fetched::{Absence, FetchMode, Fetched, RawPayload};
pub use interval::Interval;
pub use records::{
    BhavcopyRow, EquityListing, FnoUnderlying, Holiday, IndexConstituent, IndexName, MarketCode,
    MarketState, OptionContractInfo, PreOpenMarket, PreOpenQuote, ScripType, SecuritySnapshot,
    Segment, SymbolRecord, YearExtreme, YearExtremeKind, YearExtremes,
};
pub use session::SessionWindow;
