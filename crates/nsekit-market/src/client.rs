//! Domain query client.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Utc};
use nsekit_fetch::{ClientConfig, CookieStore, Query, SessionFetcher};
use nsekit_normalize::{
    Normalizer, PayloadError, parse_bhavcopy, parse_chart_payload, parse_equity_list,
    parse_fno_underlyings, parse_holidays, parse_index_constituents, parse_index_list,
    parse_market_status, parse_option_contract_info, parse_option_expiries, parse_option_strikes,
    parse_pre_open, parse_security_snapshots, parse_symbol_search, parse_year_extremes,
    select_symbol,
};
use nsekit_types::{
    Absence, BhavcopyRow, CandleTable, EquityListing, FetchMode, Fetched, FnoUnderlying, Holiday,
    IndexConstituent, IndexName, Interval, MarketCode, MarketState, NseError,
    OptionContractInfo, PreOpenMarket, PreOpenQuote, RawPayload, Result, ScripType,
    SecuritySnapshot, Segment, SessionWindow, SymbolRecord, YearExtremeKind, YearExtremes,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Endpoints;
use crate::error::{QueryError, settle};

/// Offset of Indian Standard Time from UTC, in seconds.
pub const IST_OFFSET_SECS: i64 = 19_800;

/// Configuration for [`NseClient`].
#[derive(Debug, Clone, Default)]
pub struct NseConfig {
    /// HTTP behavior: timeouts, retries, headers, warm-up page.
    pub client: ClientConfig,
    /// Session cookie cache.
    pub cookies: CookieStore,
    /// Endpoint URLs.
    pub endpoints: Endpoints,
    /// Trading session used to filter intraday candles.
    pub session: SessionWindow,
}

impl NseConfig {
    /// Sets the HTTP configuration.
    #[must_use]
    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    /// Sets the cookie cache.
    #[must_use]
    pub fn with_cookies(mut self, cookies: CookieStore) -> Self {
        self.cookies = cookies;
        self
    }

    /// Sets the endpoint URLs.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the session window.
    #[must_use]
    pub const fn with_session_window(mut self, session: SessionWindow) -> Self {
        self.session = session;
        self
    }
}

/// Parameters of a historical candle query.
///
/// `start` and `end` are exchange wall-clock times (IST).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRequest {
    /// Symbol, token search text or description fragment.
    pub symbol: String,
    /// First wall-clock time of the range.
    pub start: NaiveDateTime,
    /// Last wall-clock time of the range.
    pub end: NaiveDateTime,
    /// Candle interval.
    pub interval: Interval,
    /// Segment passed to the symbol search.
    pub segment: Option<Segment>,
    /// Instrument type used to disambiguate search results.
    pub scrip_type: Option<ScripType>,
}

impl HistoricalRequest {
    /// Creates a request for any instrument type.
    pub fn new(
        symbol: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            interval,
            segment: None,
            scrip_type: None,
        }
    }

    /// Restricts the symbol search to a segment.
    #[must_use]
    pub const fn with_segment(mut self, segment: Segment) -> Self {
        self.segment = Some(segment);
        self
    }

    /// Restricts the symbol match to an instrument type.
    #[must_use]
    pub const fn with_scrip_type(mut self, scrip_type: ScripType) -> Self {
        self.scrip_type = Some(scrip_type);
        self
    }

    /// Returns the `fromDate`/`toDate` epochs sent to the chart endpoint.
    ///
    /// Intraday ranges are sent as wall-clock epochs (UTC shifted by the IST
    /// offset); daily, weekly and monthly ranges as true UTC epochs.
    #[must_use]
    pub fn chart_range(&self) -> (i64, i64) {
        let shift = if self.interval.is_intraday() {
            0
        } else {
            IST_OFFSET_SECS
        };
        (
            self.start.and_utc().timestamp() - shift,
            self.end.and_utc().timestamp() - shift,
        )
    }

    fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(NseError::InvalidRequest("symbol is empty".into()));
        }
        if self.start > self.end {
            return Err(NseError::InvalidRequest(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Client for the NSE market data endpoints.
///
/// Every query returns [`Fetched`]: a typed table, the raw payload in
/// [`FetchMode::Raw`], or an [`Absence`] when the exchange could not be
/// reached or returned nothing usable. `Err` is reserved for requests that
/// cannot be sent at all.
#[derive(Debug, Clone)]
pub struct NseClient {
    fetcher: SessionFetcher,
    endpoints: Endpoints,
    session: SessionWindow,
}

impl NseClient {
    /// Creates a client from its configuration.
    #[must_use]
    pub fn new(config: NseConfig) -> Self {
        Self {
            fetcher: SessionFetcher::new(config.client, config.cookies),
            endpoints: config.endpoints,
            session: config.session,
        }
    }

    /// Creates a client against the live exchange with default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(NseConfig::default())
    }

    /// Returns the underlying session fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &SessionFetcher {
        &self.fetcher
    }

    /// Returns the endpoint table.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Returns the session window applied to intraday candles.
    #[must_use]
    pub const fn session_window(&self) -> SessionWindow {
        self.session
    }

    /// Searches instruments by symbol or description.
    ///
    /// The query is upper-cased. Without a segment the search spans all of
    /// them.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty or the endpoint URL is invalid.
    pub async fn search_symbols(
        &self,
        query: &str,
        segment: Option<Segment>,
        mode: FetchMode,
    ) -> Result<Fetched<Vec<SymbolRecord>>> {
        settle(self.try_search_symbols(query, segment, mode).await)
    }

    async fn try_search_symbols(
        &self,
        query: &str,
        segment: Option<Segment>,
        mode: FetchMode,
    ) -> std::result::Result<Fetched<Vec<SymbolRecord>>, QueryError> {
        let symbol = query.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(NseError::InvalidRequest("symbol query is empty".into()).into());
        }

        let params = Query::new()
            .with("segment", segment.map_or("", |s| s.as_str()))
            .with("symbol", symbol.as_str());
        let response = self
            .fetcher
            .fetch_with_fallback(&self.endpoints.symbol_search, params)
            .await?;
        tabulate(response.json()?, mode, parse_symbol_search)
    }

    /// Resolves a query to a single instrument.
    ///
    /// Results are filtered by `scrip_type`, then matched by exact symbol,
    /// symbol prefix, and description, in that order.
    ///
    /// # Errors
    ///
    /// See [`search_symbols`](Self::search_symbols).
    pub async fn lookup_symbol(
        &self,
        query: &str,
        segment: Option<Segment>,
        scrip_type: Option<ScripType>,
    ) -> Result<Fetched<SymbolRecord>> {
        let found = self
            .search_symbols(query, segment, FetchMode::Table)
            .await?
            .map(|records| select_symbol(&records, query, scrip_type));

        Ok(match found {
            Fetched::Table(Some(record)) => Fetched::Table(record),
            Fetched::Table(None) | Fetched::Absent(Absence::NoData) => {
                tracing::debug!(query, "no matching symbol");
                Fetched::Absent(Absence::NotFound)
            }
            Fetched::Raw(payload) => Fetched::Raw(payload),
            Fetched::Absent(reason) => Fetched::Absent(reason),
        })
    }

    /// Downloads historical candles for any instrument.
    ///
    /// The symbol is resolved to its token first; the candles are then
    /// normalized with the client's session window.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty, `start` is after `end`, or
    /// an endpoint URL is invalid.
    pub async fn historical_candles(
        &self,
        request: &HistoricalRequest,
        mode: FetchMode,
    ) -> Result<Fetched<CandleTable>> {
        settle(self.try_historical_candles(request, mode).await)
    }

    async fn try_historical_candles(
        &self,
        request: &HistoricalRequest,
        mode: FetchMode,
    ) -> std::result::Result<Fetched<CandleTable>, QueryError> {
        request.validate()?;

        let record = match self
            .lookup_symbol(&request.symbol, request.segment, request.scrip_type)
            .await?
        {
            Fetched::Table(record) => record,
            Fetched::Raw(payload) => return Ok(Fetched::Raw(payload)),
            Fetched::Absent(reason) => return Err(QueryError::Absent(reason)),
        };

        let (from, to) = request.chart_range();
        let params = Query::new()
            .with("chartType", request.interval.chart_type())
            .with("fromDate", from)
            .with("symbol", record.symbol.as_str())
            .with("symbolType", record.scrip_type.as_str())
            .with("timeInterval", request.interval.time_interval())
            .with("toDate", to)
            .with("token", record.token.as_str());

        tracing::debug!(
            symbol = %record.symbol,
            token = %record.token,
            interval = %request.interval,
            from,
            to,
            "fetching chart"
        );
        let response = self
            .fetcher
            .fetch_with_fallback(&self.endpoints.chart, params)
            .await?;

        let normalizer = Normalizer::new(request.interval, self.session);
        tabulate(response.json()?, mode, |payload| {
            Ok(normalizer.normalize(&parse_chart_payload(payload)?))
        })
    }

    /// Downloads intraday candles for an equity from the equity chart.
    ///
    /// `start` and `end` are exchange wall-clock times. Rows stamped before
    /// `start` are dropped before normalization.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty, the interval is not intraday,
    /// `start` is after `end`, or the endpoint URL is invalid.
    pub async fn intraday_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
        mode: FetchMode,
    ) -> Result<Fetched<CandleTable>> {
        settle(
            self.try_intraday_candles(symbol, start, end, interval, mode)
                .await,
        )
    }

    async fn try_intraday_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
        mode: FetchMode,
    ) -> std::result::Result<Fetched<CandleTable>, QueryError> {
        let request = HistoricalRequest::new(symbol, start, end, interval);
        request.validate()?;
        let Some(minutes) = interval.minutes() else {
            return Err(NseError::InvalidRequest(format!(
                "interval {interval} is not intraday"
            ))
            .into());
        };

        let params = Query::new()
            .with("exch", "N")
            .with("tradingSymbol", format!("{}-EQ", symbol.trim().to_uppercase()))
            .with("fromDate", 0)
            .with("toDate", end.and_utc().timestamp() - IST_OFFSET_SECS)
            .with("timeInterval", minutes)
            .with("chartPeriod", "I")
            .with("chartStart", 0);

        let response = self.fetcher.get(&self.endpoints.equity_chart, params).await?;

        let first = start.and_utc().timestamp();
        let normalizer = Normalizer::new(interval, self.session);
        tabulate(response.json()?, mode, |payload| {
            let raw: Vec<_> = parse_chart_payload(payload)?
                .into_iter()
                .filter(|row| row.epoch_seconds() >= first)
                .collect();
            Ok(normalizer.normalize(&raw))
        })
    }

    /// Returns the state of every market.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn market_status(&self, mode: FetchMode) -> Result<Fetched<Vec<MarketState>>> {
        settle(self.try_market_status(mode).await)
    }

    async fn try_market_status(
        &self,
        mode: FetchMode,
    ) -> std::result::Result<Fetched<Vec<MarketState>>, QueryError> {
        let response = self
            .fetcher
            .get(&self.endpoints.market_status, Query::new())
            .await?;
        tabulate(response.json()?, mode, parse_market_status)
    }

    /// Returns whether one market reports itself open.
    ///
    /// A market missing from the payload yields [`Absence::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn is_market_open(&self, market: MarketCode) -> Result<Fetched<bool>> {
        let states = self.market_status(FetchMode::Table).await?;
        let name = market.market_name();
        let open = states.map(|states| {
            states
                .iter()
                .find(|state| state.market == name)
                .map(MarketState::is_open)
        });

        Ok(match open {
            Fetched::Table(Some(open)) => Fetched::Table(open),
            Fetched::Table(None) => {
                tracing::debug!(market = name, "market missing from status payload");
                Fetched::Absent(Absence::NotFound)
            }
            Fetched::Raw(payload) => Fetched::Raw(payload),
            Fetched::Absent(reason) => Fetched::Absent(reason),
        })
    }

    /// Returns the live snapshot of an index's constituents.
    ///
    /// # Errors
    ///
    /// Returns an error if the index name is empty or the endpoint URL is
    /// invalid.
    pub async fn index_constituents(
        &self,
        index: &str,
        mode: FetchMode,
    ) -> Result<Fetched<Vec<IndexConstituent>>> {
        settle(self.try_index_constituents(index, mode).await)
    }

    async fn try_index_constituents(
        &self,
        index: &str,
        mode: FetchMode,
    ) -> std::result::Result<Fetched<Vec<IndexConstituent>>, QueryError> {
        let index = index.trim();
        if index.is_empty() {
            return Err(NseError::InvalidRequest("index name is empty".into()).into());
        }
        let response = self
            .fetcher
            .get(
                &self.endpoints.index_constituents,
                Query::new().with("index", index),
            )
            .await?;
        tabulate(response.json()?, mode, parse_index_constituents)
    }

    /// Returns the names of all exchange indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn all_indices(&self) -> Result<Fetched<Vec<IndexName>>> {
        settle(self.try_all_indices().await)
    }

    async fn try_all_indices(&self) -> std::result::Result<Fetched<Vec<IndexName>>, QueryError> {
        let response = self
            .fetcher
            .get(&self.endpoints.index_list, Query::new())
            .await?;
        tabulate(response.json()?, FetchMode::Table, parse_index_list)
    }

    /// Returns all listed equities.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn equity_list(&self, mode: FetchMode) -> Result<Fetched<Vec<EquityListing>>> {
        settle(self.try_equity_list(mode).await)
    }

    async fn try_equity_list(
        &self,
        mode: FetchMode,
    ) -> std::result::Result<Fetched<Vec<EquityListing>>, QueryError> {
        let response = self
            .fetcher
            .get(&self.endpoints.equity_list, Query::new())
            .await?;
        if mode == FetchMode::Raw {
            return Ok(Fetched::Raw(RawPayload::Text(response.text())));
        }
        non_empty(parse_equity_list(response.body_without_bom()).await?)
    }

    /// Returns the bhavcopy with delivery data for a trade date.
    ///
    /// Without a date the current exchange date is used, which has no file
    /// until the exchange publishes it after the close. `series` keeps only
    /// rows of that series (e.g. `EQ`).
    ///
    /// # Errors
    ///
    /// Returns an error if the bhavcopy URL is invalid.
    pub async fn bhavcopy(
        &self,
        date: Option<NaiveDate>,
        series: Option<&str>,
        mode: FetchMode,
    ) -> Result<Fetched<Vec<BhavcopyRow>>> {
        settle(self.try_bhavcopy(date, series, mode).await)
    }

    async fn try_bhavcopy(
        &self,
        date: Option<NaiveDate>,
        series: Option<&str>,
        mode: FetchMode,
    ) -> std::result::Result<Fetched<Vec<BhavcopyRow>>, QueryError> {
        let date = date.unwrap_or_else(exchange_today);
        let url = self.endpoints.bhavcopy_url(date);
        tracing::debug!(%date, %url, "fetching bhavcopy");

        let response = self.fetcher.get(&url, Query::new()).await?;
        if mode == FetchMode::Raw {
            return Ok(Fetched::Raw(RawPayload::Text(response.text())));
        }
        non_empty(parse_bhavcopy(response.body_without_bom(), series).await?)
    }

    /// Returns the expiry dates and strike prices of a stock's options.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty or the endpoint URL is
    /// invalid.
    pub async fn stock_option_details(
        &self,
        symbol: &str,
        mode: FetchMode,
    ) -> Result<Fetched<OptionContractInfo>> {
        settle(
            self.try_option_contract(symbol, mode, parse_option_contract_info)
                .await,
        )
    }

    /// Returns only the expiry dates of a stock's options.
    ///
    /// # Errors
    ///
    /// See [`stock_option_details`](Self::stock_option_details).
    pub async fn option_expiries(
        &self,
        symbol: &str,
        mode: FetchMode,
    ) -> Result<Fetched<Vec<NaiveDate>>> {
        settle(self.try_option_contract(symbol, mode, parse_option_expiries).await)
    }

    /// Returns only the strike prices of a stock's options.
    ///
    /// # Errors
    ///
    /// See [`stock_option_details`](Self::stock_option_details).
    pub async fn option_strikes(&self, symbol: &str, mode: FetchMode) -> Result<Fetched<Vec<i64>>> {
        settle(self.try_option_contract(symbol, mode, parse_option_strikes).await)
    }

    async fn try_option_contract<T>(
        &self,
        symbol: &str,
        mode: FetchMode,
        parse: impl FnOnce(&Value) -> std::result::Result<T, PayloadError>,
    ) -> std::result::Result<Fetched<T>, QueryError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(NseError::InvalidRequest("option symbol is empty".into()).into());
        }
        let response = self
            .fetcher
            .get(
                &self.endpoints.option_contract_info,
                Query::new().with("symbol", symbol.as_str()),
            )
            .await?;
        tabulate(response.json()?, mode, parse)
    }

    /// Returns the live snapshot of every traded security.
    ///
    /// A non-empty `series` keeps only those series (e.g. `["EQ", "SM"]`).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn all_securities_snapshot(
        &self,
        series: &[&str],
        mode: FetchMode,
    ) -> Result<Fetched<Vec<SecuritySnapshot>>> {
        settle(self.try_all_securities_snapshot(series, mode).await)
    }

    async fn try_all_securities_snapshot(
        &self,
        series: &[&str],
        mode: FetchMode,
    ) -> std::result::Result<Fetched<Vec<SecuritySnapshot>>, QueryError> {
        let response = self
            .fetcher
            .get(&self.endpoints.live_securities, Query::new())
            .await?;
        tabulate(response.json()?, mode, |payload| {
            parse_security_snapshots(payload, series)
        })
    }

    /// Returns the underlyings traded in the F&O segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn fno_underlyings(&self, mode: FetchMode) -> Result<Fetched<Vec<FnoUnderlying>>> {
        let url = &self.endpoints.fno_underlyings;
        settle(
            self.try_json(url, Query::new(), mode, parse_fno_underlyings)
                .await,
        )
    }

    /// Returns the pre-open session quotes of a market group.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn pre_open(
        &self,
        market: PreOpenMarket,
        mode: FetchMode,
    ) -> Result<Fetched<Vec<PreOpenQuote>>> {
        let params = Query::new().with("key", market.as_str());
        settle(self.try_json(&self.endpoints.pre_open, params, mode, parse_pre_open).await)
    }

    /// Returns the securities trading at a new 52-week high or low.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn year_extremes(
        &self,
        kind: YearExtremeKind,
        mode: FetchMode,
    ) -> Result<Fetched<YearExtremes>> {
        let url = self.endpoints.year_extremes(kind);
        settle(
            self.try_json(url, Query::new(), mode, |payload| {
                parse_year_extremes(payload, kind)
            })
            .await,
        )
    }

    /// Returns the capital-market trading holidays of the current year.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub async fn holidays(&self, mode: FetchMode) -> Result<Fetched<Vec<Holiday>>> {
        let params = Query::new().with("type", "trading");
        settle(self.try_json(&self.endpoints.holidays, params, mode, parse_holidays).await)
    }

    async fn try_json<T>(
        &self,
        url: &str,
        params: Query,
        mode: FetchMode,
        parse: impl FnOnce(&Value) -> std::result::Result<T, PayloadError>,
    ) -> std::result::Result<Fetched<T>, QueryError> {
        let response = self.fetcher.get(url, params).await?;
        tabulate(response.json()?, mode, parse)
    }
}

/// Parses a JSON payload, or hands it back untouched in raw mode.
fn tabulate<T>(
    payload: Value,
    mode: FetchMode,
    parse: impl FnOnce(&Value) -> std::result::Result<T, PayloadError>,
) -> std::result::Result<Fetched<T>, QueryError> {
    match mode {
        FetchMode::Raw => Ok(Fetched::Raw(RawPayload::Json(payload))),
        FetchMode::Table => Ok(Fetched::Table(parse(&payload)?)),
    }
}

fn non_empty<T>(rows: Vec<T>) -> std::result::Result<Fetched<Vec<T>>, QueryError> {
    if rows.is_empty() {
        return Err(PayloadError::NoData.into());
    }
    Ok(Fetched::Table(rows))
}

/// Current calendar date in India.
fn exchange_today() -> NaiveDate {
    (Utc::now() + TimeDelta::seconds(IST_OFFSET_SECS)).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_intraday_range_is_wall_clock() {
        let request = HistoricalRequest::new("NIFTY 50", at(15, 9, 15), at(15, 15, 30), Interval::Minutes(5));
        let (from, to) = request.chart_range();
        assert_eq!(from, at(15, 9, 15).and_utc().timestamp());
        assert_eq!(to - from, 6 * 3600 + 15 * 60);
    }

    #[test]
    fn test_daily_range_is_true_epoch() {
        let request = HistoricalRequest::new("NIFTY 50", at(15, 0, 0), at(19, 0, 0), Interval::Daily);
        let (from, _) = request.chart_range();
        // 2024-01-15 00:00 IST is 2024-01-14 18:30 UTC
        assert_eq!(from, at(14, 18, 30).and_utc().timestamp());
    }

    #[test]
    fn test_validate() {
        let reversed = HistoricalRequest::new("TCS", at(16, 0, 0), at(15, 0, 0), Interval::Daily);
        assert!(matches!(reversed.validate(), Err(NseError::InvalidRequest(_))));

        let blank = HistoricalRequest::new("  ", at(15, 0, 0), at(16, 0, 0), Interval::Daily);
        assert!(blank.validate().is_err());

        let ok = HistoricalRequest::new("TCS", at(15, 0, 0), at(15, 0, 0), Interval::Daily)
            .with_scrip_type(ScripType::Equity)
            .with_segment(Segment::Equity);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_non_empty() {
        assert!(matches!(
            non_empty::<u8>(Vec::new()),
            Err(QueryError::Absent(Absence::NoData))
        ));
        assert_eq!(non_empty(vec![1]).unwrap(), Fetched::Table(vec![1]));
    }
}
