//! Payload parsing and candle normalization for nsekit.
//!
//! This crate provides the response-processing pipeline:
//!
//! - [`parse_chart_payload`] - Chart JSON to raw candles
//! - [`Normalizer`] - Raw candles to a session-filtered candle table
//! - [`parse_equity_list`] / [`parse_bhavcopy`] - CSV listings
//! - [`parse_symbol_search`], [`parse_market_status`],
//!   [`parse_index_constituents`], [`parse_index_list`] - JSON snapshots
//! - [`parse_option_contract_info`], [`parse_security_snapshots`],
//!   [`parse_pre_open`], [`parse_year_extremes`], [`parse_holidays`] -
//!   derivatives and live market data

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/nsekit/nsekit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod listing;
mod normalizer;
mod payload;
mod records;

pub use error::PayloadError;
pub use listing::{parse_bhavcopy, parse_equity_list};
pub use normalizer::{Normalizer, round_to_minute};
pub use payload::parse_chart_payload;
pub use records::{
    parse_fno_underlyings, parse_holidays, parse_index_constituents, parse_index_list,
    parse_market_status, parse_option_contract_info, parse_option_expiries, parse_option_strikes,
    parse_pre_open, parse_security_snapshots, parse_symbol_search, parse_year_extremes,
    select_symbol,
};
