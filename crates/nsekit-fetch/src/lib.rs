//! Session-aware HTTP fetching for the NSE web endpoints.
//!
//! This crate provides the request pipeline:
//!
//! - [`SessionFetcher`] - Cookie-bootstrapping HTTP client with retries
//! - [`CookieStore`] - File-backed cache of session cookies
//! - [`decompress`] - Codec-sniffing body decompression
//! - [`Request`] / [`RawResponse`] - One logical request and its decoded body

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/nsekit/nsekit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod cookie;
mod decompress;
mod request;

pub use client::{ClientConfig, FailureKind, FetchError, SessionFetcher};
pub use cookie::{COOKIE_FILE, CookieError, CookieStore, CredentialBundle, DEFAULT_TTL_HOURS};
pub use decompress::{Codec, decompress, decompress_with_codec, detect_codec};
pub use request::{Method, Query, RawResponse, Request};
