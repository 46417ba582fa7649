//! NSE endpoint table.

use chrono::NaiveDate;
use nsekit_types::YearExtremeKind;
use serde::{Deserialize, Serialize};

const WWW_HOST: &str = "https://www.nseindia.com";
const CHARTING_HOST: &str = "https://charting.nseindia.com";
const ARCHIVES_HOST: &str = "https://nsearchives.nseindia.com";
const INDICES_HOST: &str = "https://iislliveblob.niftyindices.com";

const CHART_PATH: &str = "/v1/charts/symbolHistoricalData";
const SYMBOL_SEARCH_PATH: &str = "/v1/exchanges/symbolsDynamic";
const EQUITY_CHART_PATH: &str = "/Charts/ChartData/";
const MARKET_STATUS_PATH: &str = "/api/marketStatus";
const INDEX_CONSTITUENTS_PATH: &str = "/api/equity-stockIndices";
const INDEX_LIST_PATH: &str = "/assets/json/IndexMapping.json";
const EQUITY_LIST_PATH: &str = "/content/equities/EQUITY_L.csv";
const BHAVCOPY_PATH: &str = "/products/content/sec_bhavdata_full_{date}.csv";
const OPTION_CONTRACT_INFO_PATH: &str = "/api/option-chain-contract-info";
const LIVE_SECURITIES_PATH: &str = "/api/live-analysis-stocksTraded";
const FNO_UNDERLYINGS_PATH: &str = "/api/underlying-information";
const PRE_OPEN_PATH: &str = "/api/market-data-pre-open";
const YEAR_HIGH_PATH: &str = "/api/live-analysis-data-52weekhighstock";
const YEAR_LOW_PATH: &str = "/api/live-analysis-data-52weeklowstock";
const HOLIDAYS_PATH: &str = "/api/holiday-master";

/// Placeholder replaced by the formatted trade date in [`Endpoints::bhavcopy`].
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Date format of the bhavcopy archive file names (`15012024`).
pub const BHAVCOPY_DATE_FORMAT: &str = "%d%m%Y";

/// URLs of the NSE endpoints queried by [`crate::NseClient`].
///
/// The defaults point at the live exchange hosts. [`Endpoints::rebased`]
/// keeps the paths and swaps the host, which is useful for mirrors and
/// local test servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Symbol history chart (row-object payload, millisecond epochs).
    pub chart: String,
    /// Symbol search returning tokens and instrument types.
    pub symbol_search: String,
    /// Equity intraday chart (parallel-array payload, second epochs).
    pub equity_chart: String,
    /// Open/closed state of each market.
    pub market_status: String,
    /// Live snapshot of an index's constituents.
    pub index_constituents: String,
    /// List of all exchange indices.
    pub index_list: String,
    /// Listed equities CSV.
    pub equity_list: String,
    /// Bhavcopy CSV template; `{date}` is replaced by the trade date.
    pub bhavcopy: String,
    /// `strftime` format used for `{date}` in the bhavcopy template.
    pub bhavcopy_date_format: String,
    /// Expiry dates and strikes of a stock's options.
    pub option_contract_info: String,
    /// Live snapshot of every traded security.
    pub live_securities: String,
    /// F&O underlying list.
    pub fno_underlyings: String,
    /// Pre-open session snapshot.
    pub pre_open: String,
    /// Securities at a new 52-week high.
    pub year_high: String,
    /// Securities at a new 52-week low.
    pub year_low: String,
    /// Trading holiday calendar.
    pub holidays: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            chart: format!("{CHARTING_HOST}{CHART_PATH}"),
            symbol_search: format!("{CHARTING_HOST}{SYMBOL_SEARCH_PATH}"),
            equity_chart: format!("{CHARTING_HOST}{EQUITY_CHART_PATH}"),
            market_status: format!("{WWW_HOST}{MARKET_STATUS_PATH}"),
            index_constituents: format!("{WWW_HOST}{INDEX_CONSTITUENTS_PATH}"),
            index_list: format!("{INDICES_HOST}{INDEX_LIST_PATH}"),
            equity_list: format!("{ARCHIVES_HOST}{EQUITY_LIST_PATH}"),
            bhavcopy: format!("{ARCHIVES_HOST}{BHAVCOPY_PATH}"),
            bhavcopy_date_format: BHAVCOPY_DATE_FORMAT.to_string(),
            option_contract_info: format!("{WWW_HOST}{OPTION_CONTRACT_INFO_PATH}"),
            live_securities: format!("{WWW_HOST}{LIVE_SECURITIES_PATH}"),
            fno_underlyings: format!("{WWW_HOST}{FNO_UNDERLYINGS_PATH}"),
            pre_open: format!("{WWW_HOST}{PRE_OPEN_PATH}"),
            year_high: format!("{WWW_HOST}{YEAR_HIGH_PATH}"),
            year_low: format!("{WWW_HOST}{YEAR_LOW_PATH}"),
            holidays: format!("{WWW_HOST}{HOLIDAYS_PATH}"),
        }
    }
}

impl Endpoints {
    /// Serves every endpoint from `base`, keeping the default paths.
    #[must_use]
    pub fn rebased(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            chart: format!("{base}{CHART_PATH}"),
            symbol_search: format!("{base}{SYMBOL_SEARCH_PATH}"),
            equity_chart: format!("{base}{EQUITY_CHART_PATH}"),
            market_status: format!("{base}{MARKET_STATUS_PATH}"),
            index_constituents: format!("{base}{INDEX_CONSTITUENTS_PATH}"),
            index_list: format!("{base}{INDEX_LIST_PATH}"),
            equity_list: format!("{base}{EQUITY_LIST_PATH}"),
            bhavcopy: format!("{base}{BHAVCOPY_PATH}"),
            bhavcopy_date_format: BHAVCOPY_DATE_FORMAT.to_string(),
            option_contract_info: format!("{base}{OPTION_CONTRACT_INFO_PATH}"),
            live_securities: format!("{base}{LIVE_SECURITIES_PATH}"),
            fno_underlyings: format!("{base}{FNO_UNDERLYINGS_PATH}"),
            pre_open: format!("{base}{PRE_OPEN_PATH}"),
            year_high: format!("{base}{YEAR_HIGH_PATH}"),
            year_low: format!("{base}{YEAR_LOW_PATH}"),
            holidays: format!("{base}{HOLIDAYS_PATH}"),
        }
    }

    /// Sets the bhavcopy template and its date format.
    #[must_use]
    pub fn with_bhavcopy(mut self, template: impl Into<String>, date_format: impl Into<String>) -> Self {
        self.bhavcopy = template.into();
        self.bhavcopy_date_format = date_format.into();
        self
    }

    /// Sets the symbol history chart URL.
    #[must_use]
    pub fn with_chart(mut self, url: impl Into<String>) -> Self {
        self.chart = url.into();
        self
    }

    /// Sets the symbol search URL.
    #[must_use]
    pub fn with_symbol_search(mut self, url: impl Into<String>) -> Self {
        self.symbol_search = url.into();
        self
    }

    /// Returns the URL of the 52-week high or low snapshot.
    #[must_use]
    pub fn year_extremes(&self, kind: YearExtremeKind) -> &str {
        match kind {
            YearExtremeKind::High => &self.year_high,
            YearExtremeKind::Low => &self.year_low,
        }
    }

    /// Returns the bhavcopy URL for a trade date.
    #[must_use]
    pub fn bhavcopy_url(&self, date: NaiveDate) -> String {
        let stamp = date.format(&self.bhavcopy_date_format).to_string();
        self.bhavcopy.replace(DATE_PLACEHOLDER, &stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hosts() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.chart,
            "https://charting.nseindia.com/v1/charts/symbolHistoricalData"
        );
        assert_eq!(
            endpoints.market_status,
            "https://www.nseindia.com/api/marketStatus"
        );
        assert_eq!(
            endpoints.holidays,
            "https://www.nseindia.com/api/holiday-master"
        );
    }

    #[test]
    fn test_rebased_keeps_paths() {
        let endpoints = Endpoints::rebased("http://127.0.0.1:8080/");
        assert_eq!(
            endpoints.index_constituents,
            "http://127.0.0.1:8080/api/equity-stockIndices"
        );
        assert_eq!(endpoints.equity_chart, "http://127.0.0.1:8080/Charts/ChartData/");
        assert_eq!(
            endpoints.year_low,
            "http://127.0.0.1:8080/api/live-analysis-data-52weeklowstock"
        );
    }

    #[test]
    fn test_bhavcopy_url() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.bhavcopy_url(date),
            "https://nsearchives.nseindia.com/products/content/sec_bhavdata_full_15012024.csv"
        );

        let custom = endpoints.with_bhavcopy("http://mirror/bhav?date={date}", "%d-%b-%Y");
        assert_eq!(custom.bhavcopy_url(date), "http://mirror/bhav?date=15-Jan-2024");
    }
}
