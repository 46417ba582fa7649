//! Rust client for NSE India market data.
//!
//! This is a facade crate that re-exports functionality from the nsekit
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use nsekit_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = NseClient::with_defaults();
//!
//!     let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
//!         .unwrap()
//!         .and_hms_opt(9, 15, 0)
//!         .unwrap();
//!     let end = start + chrono::TimeDelta::hours(6);
//!     let request = HistoricalRequest::new("NIFTY 50", start, end, Interval::Minutes(5));
//!
//!     match client.historical_candles(&request, FetchMode::Table).await? {
//!         Fetched::Table(table) => println!("{} candles", table.len()),
//!         Fetched::Absent(reason) => println!("no data: {reason}"),
//!         Fetched::Raw(_) => {}
//!     }
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/nsekit/nsekit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use nsekit_types::*;

// Re-export fetch functionality
#[cfg(feature = "fetch")]
pub use nsekit_fetch::{
    COOKIE_FILE, ClientConfig, Codec, CookieError, CookieStore, CredentialBundle,
    DEFAULT_TTL_HOURS, FailureKind, FetchError, Method, Query, RawResponse, Request,
    SessionFetcher, decompress, decompress_with_codec, detect_codec,
};

// Re-export payload processing
#[cfg(feature = "normalize")]
pub use nsekit_normalize::{
    Normalizer, PayloadError, parse_bhavcopy, parse_chart_payload, parse_equity_list,
    parse_fno_underlyings, parse_holidays, parse_index_constituents, parse_index_list,
    parse_market_status, parse_option_contract_info, parse_option_expiries, parse_option_strikes,
    parse_pre_open, parse_security_snapshots, parse_symbol_search, parse_year_extremes,
    round_to_minute, select_symbol,
};

// Re-export the domain client
#[cfg(feature = "market")]
pub use nsekit_market::{
    BHAVCOPY_DATE_FORMAT, DATE_PLACEHOLDER, Endpoints, HistoricalRequest, IST_OFFSET_SECS,
    NseClient, NseConfig,
};

/// Prelude module for convenient imports.
///
/// ```
/// use nsekit_lib::prelude::*;
/// ```
pub mod prelude {
    pub use nsekit_types::{
        Absence, Candle, CandleTable, FetchMode, Fetched, Interval, MarketCode, NseError,
        PreOpenMarket, RawCandle, RawPayload, Result, ScripType, Segment, SessionWindow,
        SymbolRecord, YearExtremeKind,
    };

    #[cfg(feature = "fetch")]
    pub use nsekit_fetch::{ClientConfig, CookieStore, FetchError, SessionFetcher};

    #[cfg(feature = "normalize")]
    pub use nsekit_normalize::{Normalizer, parse_chart_payload};

    #[cfg(feature = "market")]
    pub use nsekit_market::{Endpoints, HistoricalRequest, NseClient, NseConfig};
}
