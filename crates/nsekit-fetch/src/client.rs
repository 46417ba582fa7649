//! Session-aware HTTP client for the NSE web endpoints.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::cookie::{CookieStore, CredentialBundle, cookie_header};
use crate::decompress::decompress_with_codec;
use crate::request::{Method, Query, RawResponse, Request};

/// Page visited to obtain session cookies.
const DEFAULT_WARMUP_URL: &str =
    "https://www.nseindia.com/get-quote/equity/RELIANCE/Reliance-Industries-Limited";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Configuration for the session fetcher.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Attempts per request, including the first.
    pub max_retries: u32,
    /// Delay before the second attempt (in milliseconds).
    pub base_delay_ms: u64,
    /// Growth factor of the delay between consecutive attempts.
    pub backoff_factor: f64,
    /// Maximum delay between attempts (in milliseconds).
    pub max_delay_ms: u64,
    /// User agent string.
    pub user_agent: String,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Page visited to harvest session cookies.
    pub warmup_url: String,
    /// Cookies kept from the warm-up page; all cookies are kept when none
    /// of these are present.
    pub preferred_cookies: Vec<String>,
    /// Retry every 4xx status instead of failing fast.
    pub retry_client_errors: bool,
    /// Honor the system proxy environment variables.
    pub use_system_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let headers = [
            ("Accept", "*/*"),
            ("Accept-Encoding", "gzip, deflate, br, zstd"),
            ("Connection", "keep-alive"),
            ("Referer", "https://charting.nseindia.com/"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            max_retries: 2,
            base_delay_ms: 1_000,
            backoff_factor: 1.5,
            max_delay_ms: 30_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers,
            warmup_url: DEFAULT_WARMUP_URL.to_string(),
            preferred_cookies: vec!["nsit".to_string(), "nseappid".to_string()],
            retry_client_errors: false,
            use_system_proxy: true,
        }
    }
}

impl ClientConfig {
    /// Sets the number of attempts per request.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the backoff base delay and growth factor.
    #[must_use]
    pub const fn with_backoff(mut self, base_delay_ms: u64, backoff_factor: f64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.backoff_factor = backoff_factor;
        self
    }

    /// Sets the warm-up page.
    #[must_use]
    pub fn with_warmup_url(mut self, url: impl Into<String>) -> Self {
        self.warmup_url = url.into();
        self
    }

    /// Adds or replaces a default header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Retries every 4xx status instead of failing fast.
    #[must_use]
    pub const fn with_retry_client_errors(mut self, retry: bool) -> Self {
        self.retry_client_errors = retry;
        self
    }

    /// Enables or disables the system proxy.
    #[must_use]
    pub const fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.use_system_proxy = enabled;
        self
    }
}

/// Cause of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The attempt exceeded its timeout.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The server answered with a non-success status.
    Status(u16),
    /// The response body could not be read.
    Body,
    /// The request could not be built.
    Invalid(String),
    /// Any other transport error.
    Other(String),
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Connect => write!(f, "connection failed"),
            Self::Status(status) => write!(f, "status {status}"),
            Self::Body => write!(f, "failed to read body"),
            Self::Invalid(msg) => write!(f, "invalid request: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<&reqwest::Error> for FailureKind {
    fn from(error: &reqwest::Error) -> Self {
        if error.is_builder() {
            Self::Invalid(error.to_string())
        } else if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else if error.is_body() || error.is_decode() {
            Self::Body
        } else {
            Self::Other(error.to_string())
        }
    }
}

/// Errors that can occur during a fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request or configuration is unusable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The server answered with a status that is not retried.
    #[error("Request rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// Every attempt failed.
    #[error("Request failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Cause of the final failure.
        last: FailureKind,
    },
}

/// Per-fetch connection context.
struct Session {
    client: Client,
    cookies: BTreeMap<String, String>,
}

/// HTTP client that bootstraps NSE session cookies and retries failures.
///
/// Each call to [`fetch`](Self::fetch) opens a fresh connection context with
/// its own cookie jar. Cached cookies from the [`CookieStore`] are attached
/// when fresh; otherwise the warm-up page is visited first. A failed first
/// attempt forces a new warm-up before the remaining attempts.
#[derive(Debug, Clone)]
pub struct SessionFetcher {
    config: ClientConfig,
    cookies: CookieStore,
}

impl SessionFetcher {
    /// Creates a fetcher with the given configuration and cookie cache.
    #[must_use]
    pub const fn new(config: ClientConfig, cookies: CookieStore) -> Self {
        Self { config, cookies }
    }

    /// Creates a fetcher with default configuration, caching cookies in the
    /// working directory.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ClientConfig::default(), CookieStore::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the cookie cache.
    #[must_use]
    pub const fn cookie_store(&self) -> &CookieStore {
        &self.cookies
    }

    /// Sends a GET request with the given parameters.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn get(&self, url: &str, query: Query) -> Result<RawResponse, FetchError> {
        self.fetch(&Request::get(url).with_query(query)).await
    }

    /// Sends a POST request with the given parameters as a JSON body.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn post(&self, url: &str, query: Query) -> Result<RawResponse, FetchError> {
        self.fetch(&Request::post(url).with_query(query)).await
    }

    /// Sends a GET request and repeats it as a POST if the GET fails.
    ///
    /// # Errors
    ///
    /// Returns the POST's error if both methods fail, or the GET's error if
    /// the request itself is invalid.
    pub async fn fetch_with_fallback(
        &self,
        url: &str,
        query: Query,
    ) -> Result<RawResponse, FetchError> {
        let request = Request::get(url).with_query(query);
        match self.fetch(&request).await {
            Ok(response) => Ok(response),
            Err(e @ (FetchError::InvalidRequest(_) | FetchError::Client(_))) => Err(e),
            Err(e) => {
                tracing::debug!(url, error = %e, "GET failed, retrying as POST");
                self.fetch(&request.with_method(Method::Post)).await
            }
        }
    }

    /// Performs one logical request with cookie bootstrap and retries.
    ///
    /// Makes at most `max_retries` attempts, sleeping with exponential
    /// backoff between them (never after the last). Transport errors, 5xx,
    /// 401, 403, 408 and 429 are retried; other 4xx statuses fail at once
    /// unless [`ClientConfig::retry_client_errors`] is set.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidRequest`] for an empty or malformed URL, or
    ///   when `max_retries` is zero
    /// - [`FetchError::Rejected`] for a non-retried status
    /// - [`FetchError::Exhausted`] when every attempt failed
    pub async fn fetch(&self, request: &Request) -> Result<RawResponse, FetchError> {
        let url = request.parsed_url()?;
        if self.config.max_retries == 0 {
            return Err(FetchError::InvalidRequest(
                "max_retries must be at least 1".into(),
            ));
        }

        let mut session = self.connect()?;
        match self.cookies.load() {
            Some(bundle) => {
                tracing::debug!(count = bundle.cookies().len(), "using cached cookies");
                session.cookies = bundle.into_cookies();
            }
            None => self.bootstrap(&mut session).await,
        }

        let mut last = FailureKind::Other("no attempt made".into());
        for attempt in 0..self.config.max_retries {
            tracing::debug!(
                url = %url,
                method = %request.method(),
                attempt,
                "sending request"
            );

            let failure = match self.send(&session, &url, request).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if let Some(error) = self.terminal_error(&failure) {
                tracing::warn!(url = %url, %failure, "request failed without retry");
                return Err(error);
            }

            tracing::debug!(url = %url, attempt, %failure, "attempt failed");
            if attempt == 0 {
                self.bootstrap(&mut session).await;
            }
            last = failure;

            if attempt + 1 < self.config.max_retries {
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }
        }

        tracing::warn!(
            url = %url,
            attempts = self.config.max_retries,
            failure = %last,
            "request failed after all retries"
        );
        Err(FetchError::Exhausted {
            attempts: self.config.max_retries,
            last,
        })
    }

    /// Calculates the delay after the given zero-based attempt.
    ///
    /// `base_delay_ms * backoff_factor^attempt`, capped at `max_delay_ms`,
    /// with a deterministic jitter of up to ±25%.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let exp_delay =
            self.config.base_delay_ms as f64 * self.config.backoff_factor.max(1.0).powi(exponent);

        let capped_delay = exp_delay.min(self.config.max_delay_ms as f64);

        // Deterministic jitter in [-25%, +25%], stepping by 6.25%
        let phase = f64::from(attempt.wrapping_mul(17) % 9) / 4.0 - 1.0;
        let jittered = capped_delay + capped_delay / 4.0 * phase;

        Duration::from_millis(jittered.max(0.0).round() as u64)
    }

    /// Returns the error to surface immediately for a non-retried failure.
    fn terminal_error(&self, failure: &FailureKind) -> Option<FetchError> {
        match failure {
            FailureKind::Status(status) if !self.is_retryable_status(*status) => {
                Some(FetchError::Rejected { status: *status })
            }
            FailureKind::Invalid(msg) => Some(FetchError::InvalidRequest(msg.clone())),
            _ => None,
        }
    }

    /// Determines if a status is worth another attempt.
    const fn is_retryable_status(&self, status: u16) -> bool {
        if self.config.retry_client_errors {
            return true;
        }
        !matches!(status, 400..=499) || matches!(status, 401 | 403 | 408 | 429)
    }

    fn connect(&self) -> Result<Session, FetchError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(&self.config.user_agent)
            .default_headers(self.header_map(&self.config.headers))
            .gzip(true);
        if !self.config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(FetchError::Client)?;

        Ok(Session {
            client,
            cookies: BTreeMap::new(),
        })
    }

    /// Visits the warm-up page and replaces the session's cookies.
    ///
    /// Failures are logged; the session keeps its previous cookies.
    async fn bootstrap(&self, session: &mut Session) {
        let url = match Url::parse(&self.config.warmup_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %self.config.warmup_url, error = %e, "invalid warm-up URL");
                return;
            }
        };

        let response = match session.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to fetch warm-up page");
                return;
            }
        };

        let harvested: BTreeMap<String, String> = response
            .cookies()
            .filter(|cookie| !cookie.name().is_empty())
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();

        let selected = self.select_cookies(harvested);
        if selected.is_empty() {
            tracing::warn!(url = %url, status = %response.status(), "warm-up page set no cookies");
            return;
        }

        let bundle = CredentialBundle::captured_now(selected);
        self.cookies.save(&bundle);
        tracing::info!(count = bundle.cookies().len(), "refreshed session cookies");
        session.cookies = bundle.into_cookies();
    }

    /// Keeps the preferred cookies, or all of them when none is present.
    fn select_cookies(&self, all: BTreeMap<String, String>) -> BTreeMap<String, String> {
        let preferred: BTreeMap<String, String> = all
            .iter()
            .filter(|(name, _)| self.config.preferred_cookies.contains(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if preferred.is_empty() { all } else { preferred }
    }

    async fn send(
        &self,
        session: &Session,
        url: &Url,
        request: &Request,
    ) -> Result<RawResponse, FailureKind> {
        let mut builder = match request.method() {
            Method::Get => {
                let builder = session.client.get(url.clone());
                if request.query().is_empty() {
                    builder
                } else {
                    builder.query(&request.query().to_query_pairs())
                }
            }
            Method::Post => session
                .client
                .post(url.clone())
                .json(&request.query().to_json()),
        };
        builder = builder.headers(self.header_map(request.headers()));
        if let Some(cookie) = cookie_header(&session.cookies) {
            builder = builder.header(COOKIE, cookie);
        }

        let response = builder.send().await.map_err(|e| FailureKind::from(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FailureKind::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(|e| FailureKind::from(&e))?;
        let (decoded, codec) = decompress_with_codec(&body);
        tracing::trace!(%codec, bytes = decoded.len(), "decoded response body");

        Ok(RawResponse::new(
            status.as_u16(),
            final_url,
            content_type,
            codec,
            Bytes::from(decoded),
        ))
    }

    fn header_map(&self, headers: &BTreeMap<String, String>) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid header"),
            }
        }
        map
    }
}
