//! NSE endpoint table and domain query client for nsekit.
//!
//! This crate provides the exchange-facing queries:
//!
//! - [`NseClient`] - Symbol search, historical and intraday candles, market
//!   status, index snapshots, equity list, bhavcopy, option contracts, live
//!   and pre-open snapshots, 52-week extremes and holidays
//! - [`Endpoints`] - Configurable endpoint URLs
//! - [`HistoricalRequest`] - Parameters of a historical candle query

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/nsekit/nsekit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod endpoints;
mod error;

pub use client::{HistoricalRequest, IST_OFFSET_SECS, NseClient, NseConfig};
pub use endpoints::{BHAVCOPY_DATE_FORMAT, DATE_PLACEHOLDER, Endpoints};
