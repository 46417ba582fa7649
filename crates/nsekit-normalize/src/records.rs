//! JSON snapshot mappers: symbol search, market status, index data,
//! derivatives and live market snapshots.

use chrono::{NaiveDate, NaiveDateTime};
use nsekit_types::{
    FnoUnderlying, Holiday, IndexConstituent, IndexName, MarketState, OptionContractInfo,
    PreOpenQuote, ScripType, SecuritySnapshot, SymbolRecord, YearExtreme, YearExtremeKind,
    YearExtremes,
};
use serde_json::Value;

use crate::PayloadError;
use crate::listing::{LAKH, parse_date};
use crate::payload::number;

/// Traded values and market caps are reported in crores.
const CRORE: f64 = 10_000_000.0;

/// Timestamp format of the 52-week extreme snapshots (`15-Jan-2024 15:30:00`).
const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// Parses the symbol search response (`{"data": [{symbol, scripcode, type, description}]}`).
///
/// Symbols are trimmed of their `-SERIES` suffix (`RELIANCE-EQ` becomes
/// `RELIANCE`).
///
/// # Errors
///
/// Returns an error if `data` is missing or empty.
pub fn parse_symbol_search(payload: &Value) -> Result<Vec<SymbolRecord>, PayloadError> {
    let rows = data_array(payload)?;
    let records: Vec<SymbolRecord> = rows
        .iter()
        .filter_map(|row| {
            let symbol = text(row, "symbol")?;
            Some(SymbolRecord {
                symbol: symbol.split('-').next().unwrap_or_default().to_string(),
                token: text(row, "scripcode")?,
                scrip_type: text(row, "type").unwrap_or_default(),
                description: text(row, "description").unwrap_or_default(),
            })
        })
        .collect();

    if records.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(records)
}

/// Picks the best match for `query` among search results.
///
/// After the optional type filter, matches are tried in order: exact
/// symbol, symbol prefix, description containing the query. Comparisons use
/// the upper-cased query.
#[must_use]
pub fn select_symbol(
    records: &[SymbolRecord],
    query: &str,
    scrip_type: Option<ScripType>,
) -> Option<SymbolRecord> {
    let query = query.trim().to_uppercase();
    let candidates: Vec<&SymbolRecord> = records
        .iter()
        .filter(|r| scrip_type.is_none_or(|t| r.scrip_type == t.as_str()))
        .collect();

    candidates
        .iter()
        .find(|r| r.symbol == query)
        .or_else(|| candidates.iter().find(|r| r.symbol.starts_with(&query)))
        .or_else(|| {
            candidates
                .iter()
                .find(|r| r.description.to_uppercase().contains(&query))
        })
        .map(|r| (*r).clone())
}

/// Parses the market status response (`{"marketState": [...]}`).
///
/// # Errors
///
/// Returns an error if `marketState` is missing or empty.
pub fn parse_market_status(payload: &Value) -> Result<Vec<MarketState>, PayloadError> {
    let rows = payload
        .get("marketState")
        .and_then(Value::as_array)
        .ok_or_else(|| PayloadError::missing("marketState"))?;

    let states: Vec<MarketState> = rows
        .iter()
        .filter_map(|row| {
            Some(MarketState {
                market: text(row, "market")?,
                status: text(row, "marketStatus").unwrap_or_default(),
                trade_date: text(row, "tradeDate"),
                message: text(row, "marketStatusMessage"),
            })
        })
        .collect();

    if states.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(states)
}

/// Parses the index constituents snapshot.
///
/// The first row of `data` describes the index itself and is skipped.
/// Company name and F&O flag come from each row's `meta` object.
///
/// # Errors
///
/// Returns an error if `data` is missing or holds only the index row.
pub fn parse_index_constituents(payload: &Value) -> Result<Vec<IndexConstituent>, PayloadError> {
    let rows = data_array(payload)?;
    let constituents: Vec<IndexConstituent> = rows
        .iter()
        .skip(1)
        .filter_map(|row| {
            let meta = row.get("meta");
            let price = |field: &str| row.get(field).and_then(number).unwrap_or_default();
            Some(IndexConstituent {
                symbol: text(row, "symbol")?,
                name: meta.and_then(|m| text(m, "companyName")),
                series: text(row, "series"),
                derivatives: meta
                    .and_then(|m| m.get("isFNOSec"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                open: price("open"),
                high: price("dayHigh"),
                low: price("dayLow"),
                close: price("lastPrice"),
                previous_close: price("previousClose"),
                change: price("change"),
                changepct: price("pChange"),
                volume: price("totalTradedVolume"),
                year_high: price("yearHigh"),
                year_low: price("yearLow"),
            })
        })
        .collect();

    if constituents.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(constituents)
}

/// Parses the index name list.
///
/// Entries are either two-element arrays `[trading_index, full_name]` or
/// objects keyed `TradingIndex`/`FullName` (any casing, with or without
/// underscores).
///
/// # Errors
///
/// Returns an error if the payload is not a non-empty list.
pub fn parse_index_list(payload: &Value) -> Result<Vec<IndexName>, PayloadError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| PayloadError::missing("<root array>"))?;

    let names: Vec<IndexName> = rows
        .iter()
        .filter_map(|row| match row {
            Value::Array(pair) => Some(IndexName {
                trading_index: pair.first().and_then(as_text)?,
                full_name: pair.get(1).and_then(as_text)?,
            }),
            Value::Object(map) => {
                let lookup = |wanted: &str| {
                    map.iter()
                        .find(|(k, _)| k.replace('_', "").eq_ignore_ascii_case(wanted))
                        .and_then(|(_, v)| as_text(v))
                };
                Some(IndexName {
                    trading_index: lookup("tradingindex")?,
                    full_name: lookup("fullname")?,
                })
            }
            _ => None,
        })
        .collect();

    if names.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(names)
}

/// Parses the expiry dates of a stock's option contracts.
///
/// # Errors
///
/// Returns an error if `expiryDates` is missing, holds a date that is not
/// `DD-Mon-YYYY`, or is empty.
pub fn parse_option_expiries(payload: &Value) -> Result<Vec<NaiveDate>, PayloadError> {
    let raw = payload
        .get("expiryDates")
        .and_then(Value::as_array)
        .ok_or_else(|| PayloadError::missing("expiryDates"))?;

    let dates = raw
        .iter()
        .map(|value| {
            value
                .as_str()
                .and_then(parse_date)
                .ok_or_else(|| PayloadError::missing("expiryDates"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if dates.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(dates)
}

/// Parses the strike prices of a stock's option contracts.
///
/// Strikes are truncated to whole rupees.
///
/// # Errors
///
/// Returns an error if `strikePrice` is missing, holds a non-numeric entry,
/// or is empty.
pub fn parse_option_strikes(payload: &Value) -> Result<Vec<i64>, PayloadError> {
    let raw = payload
        .get("strikePrice")
        .and_then(Value::as_array)
        .ok_or_else(|| PayloadError::missing("strikePrice"))?;

    let strikes = raw
        .iter()
        .map(|value| {
            number(value)
                .map(|strike| strike.trunc() as i64)
                .ok_or_else(|| PayloadError::missing("strikePrice"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if strikes.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(strikes)
}

/// Parses both the expiry dates and the strike prices.
///
/// # Errors
///
/// See [`parse_option_expiries`] and [`parse_option_strikes`].
pub fn parse_option_contract_info(payload: &Value) -> Result<OptionContractInfo, PayloadError> {
    Ok(OptionContractInfo {
        expiry_dates: parse_option_expiries(payload)?,
        strike_prices: parse_option_strikes(payload)?,
    })
}

/// Parses the all-securities live snapshot (`{"total": {"data": [...]}}`).
///
/// Volume is converted from lakhs of shares to shares, traded value and
/// market cap from crores to rupees. A non-empty `series` keeps only rows of
/// those series.
///
/// # Errors
///
/// Returns an error if `total.data` is missing, or no row survives the
/// series filter.
pub fn parse_security_snapshots(
    payload: &Value,
    series: &[&str],
) -> Result<Vec<SecuritySnapshot>, PayloadError> {
    let rows = payload
        .get("total")
        .and_then(|total| total.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| PayloadError::missing("total.data"))?;

    let snapshots: Vec<SecuritySnapshot> = rows
        .iter()
        .filter_map(|row| {
            let price = |field: &str| row.get(field).and_then(number).unwrap_or_default();
            Some(SecuritySnapshot {
                symbol: text(row, "symbol")?,
                series: text(row, "series").unwrap_or_default(),
                close: price("lastPrice"),
                previous_close: price("previousClose"),
                change: price("change"),
                changepct: row
                    .get("pchange")
                    .or_else(|| row.get("pChange"))
                    .and_then(number)
                    .unwrap_or_default(),
                volume: (price("totalTradedVolume") * LAKH).round() as i64,
                traded_value: price("totalTradedValue") * CRORE,
                market_cap: price("totalMarketCap") * CRORE,
            })
        })
        .filter(|snapshot| series.is_empty() || series.contains(&snapshot.series.as_str()))
        .collect();

    if snapshots.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(snapshots)
}

/// Parses the F&O underlying list (`{"data": {"UnderlyingList": [...]}}`).
///
/// # Errors
///
/// Returns an error if the list is missing or empty.
pub fn parse_fno_underlyings(payload: &Value) -> Result<Vec<FnoUnderlying>, PayloadError> {
    let rows = payload
        .get("data")
        .and_then(|data| data.get("UnderlyingList"))
        .and_then(Value::as_array)
        .ok_or_else(|| PayloadError::missing("data.UnderlyingList"))?;

    let underlyings: Vec<FnoUnderlying> = rows
        .iter()
        .filter_map(|row| {
            Some(FnoUnderlying {
                name: text(row, "underlying")?,
                symbol: text(row, "symbol")?,
            })
        })
        .collect();

    if underlyings.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(underlyings)
}

/// Parses the pre-open session snapshot.
///
/// Each row's quote lives under `metadata`; rows without one are skipped.
///
/// # Errors
///
/// Returns an error if `data` is missing or no row carries metadata.
pub fn parse_pre_open(payload: &Value) -> Result<Vec<PreOpenQuote>, PayloadError> {
    let rows = data_array(payload)?;
    let quotes: Vec<PreOpenQuote> = rows
        .iter()
        .filter_map(|row| {
            let meta = row.get("metadata")?;
            let price = |field: &str| meta.get(field).and_then(number).unwrap_or_default();
            Some(PreOpenQuote {
                symbol: text(meta, "symbol")?,
                iep: price("iep"),
                previous_close: price("previousClose"),
                change: price("change"),
                changepct: price("pChange"),
                quantity: price("finalQuantity"),
                total_turnover: price("totalTurnover"),
                market_cap: price("marketCap"),
                year_high: price("yearHigh"),
                year_low: price("yearLow"),
            })
        })
        .collect();

    if quotes.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(quotes)
}

/// Parses the securities at a new 52-week high or low.
///
/// The percentage change is rounded to two decimals. The snapshot
/// `timestamp` is kept when it parses as `DD-Mon-YYYY HH:MM:SS`.
///
/// # Errors
///
/// Returns an error if `data` is missing or empty.
pub fn parse_year_extremes(
    payload: &Value,
    kind: YearExtremeKind,
) -> Result<YearExtremes, PayloadError> {
    let rows = data_array(payload)?;
    let extremes: Vec<YearExtreme> = rows
        .iter()
        .filter_map(|row| {
            let price = |field: &str| row.get(field).and_then(number).unwrap_or_default();
            Some(YearExtreme {
                symbol: text(row, "symbol")?,
                series: text(row, "series").unwrap_or_default(),
                // The exchange spells this key `comapnyName`.
                name: text(row, "comapnyName")
                    .or_else(|| text(row, "companyName"))
                    .unwrap_or_default(),
                new_extreme: price("new52WHL"),
                previous_extreme: price("prev52WHL"),
                previous_date: text(row, "prevHLDate").as_deref().and_then(parse_date),
                close: price("ltp"),
                previous_close: price("prevClose"),
                change: price("change"),
                changepct: (price("pChange") * 100.0).round() / 100.0,
            })
        })
        .collect();

    if extremes.is_empty() {
        return Err(PayloadError::NoData);
    }

    let timestamp = text(payload, "timestamp").and_then(|raw| {
        NaiveDateTime::parse_from_str(&raw, SNAPSHOT_TIMESTAMP_FORMAT).ok()
    });
    Ok(YearExtremes {
        kind,
        rows: extremes,
        timestamp,
    })
}

/// Parses the capital-market trading holidays (`{"CM": [...]}`).
///
/// # Errors
///
/// Returns an error if `CM` is missing or empty.
pub fn parse_holidays(payload: &Value) -> Result<Vec<Holiday>, PayloadError> {
    let rows = payload
        .get("CM")
        .and_then(Value::as_array)
        .ok_or_else(|| PayloadError::missing("CM"))?;

    let holidays: Vec<Holiday> = rows
        .iter()
        .map(|row| Holiday {
            date: text(row, "tradingDate").as_deref().and_then(parse_date),
            day: text(row, "weekDay").unwrap_or_default(),
            description: text(row, "description").unwrap_or_default(),
        })
        .collect();

    if holidays.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(holidays)
}

fn data_array(payload: &Value) -> Result<&Vec<Value>, PayloadError> {
    let rows = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| PayloadError::missing("data"))?;
    if rows.is_empty() {
        return Err(PayloadError::NoData);
    }
    Ok(rows)
}

fn text(row: &Value, field: &str) -> Option<String> {
    row.get(field).and_then(as_text)
}

/// Reads a string, rendering numbers as text.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_payload() -> Value {
        json!({"data": [
            {"symbol": "RELIANCEP-EQ", "scripcode": "9999", "type": "Equity", "description": "RELIANCE PARTLY PAID"},
            {"symbol": "RELIANCE-EQ", "scripcode": 2885, "type": "Equity", "description": "RELIANCE INDUSTRIES LTD"},
            {"symbol": "RELIANCE26JANFUT", "scripcode": "35001", "type": "Futures", "description": "RELIANCE 27 JAN 2026 FUT"}
        ]})
    }

    #[test]
    fn test_symbol_search_strips_series() {
        let records = parse_symbol_search(&search_payload()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].symbol, "RELIANCE");
        assert_eq!(records[1].token, "2885");
        assert_eq!(records[2].symbol, "RELIANCE26JANFUT");
    }

    #[test]
    fn test_select_symbol_priority() {
        let records = parse_symbol_search(&search_payload()).unwrap();

        let exact = select_symbol(&records, "reliance", None).unwrap();
        assert_eq!(exact.token, "2885");

        let prefix = select_symbol(&records, "RELIANCE26", None).unwrap();
        assert_eq!(prefix.scrip_type, "Futures");

        let described = select_symbol(&records, "PARTLY", None).unwrap();
        assert_eq!(described.token, "9999");

        let futures = select_symbol(&records, "RELIANCE", Some(ScripType::Futures)).unwrap();
        assert_eq!(futures.token, "35001");

        assert!(select_symbol(&records, "TCS", None).is_none());
        assert!(select_symbol(&records, "RELIANCE", Some(ScripType::Index)).is_none());
    }

    #[test]
    fn test_market_status() {
        let payload = json!({"marketState": [
            {"market": "Capital Market", "marketStatus": "Open", "tradeDate": "15-Jan-2024 10:15", "marketStatusMessage": "Normal Market is Open"},
            {"market": "Currency", "marketStatus": "Closed"}
        ]});

        let states = parse_market_status(&payload).unwrap();
        assert_eq!(states.len(), 2);
        assert!(states[0].is_open());
        assert_eq!(states[1].trade_date, None);
        assert!(!states[1].is_open());

        assert!(parse_market_status(&json!({})).is_err());
    }

    #[test]
    fn test_index_constituents_skip_index_row() {
        let payload = json!({"data": [
            {"symbol": "NIFTY BANK", "lastPrice": 48_000.0},
            {"symbol": "HDFCBANK", "series": "EQ", "open": 1650.0, "dayHigh": 1660.0, "dayLow": 1640.0,
             "lastPrice": 1655.5, "previousClose": 1648.0, "change": 7.5, "pChange": 0.45,
             "totalTradedVolume": 1_234_567, "yearHigh": 1757.0, "yearLow": 1363.0,
             "meta": {"companyName": "HDFC Bank Limited", "isFNOSec": true}}
        ]});

        let rows = parse_index_constituents(&payload).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "HDFCBANK");
        assert_eq!(rows[0].name.as_deref(), Some("HDFC Bank Limited"));
        assert!(rows[0].derivatives);
        assert!((rows[0].close - 1655.5).abs() < f64::EPSILON);

        let only_index = json!({"data": [{"symbol": "NIFTY BANK"}]});
        assert!(matches!(
            parse_index_constituents(&only_index),
            Err(PayloadError::NoData)
        ));
    }

    #[test]
    fn test_index_list_shapes() {
        let arrays = json!([["NIFTY 50", "Nifty 50"], ["NIFTY BANK", "Nifty Bank"]]);
        let names = parse_index_list(&arrays).unwrap();
        assert_eq!(names[1].trading_index, "NIFTY BANK");
        assert_eq!(names[1].full_name, "Nifty Bank");

        let objects = json!([{"TradingIndex": "NIFTY IT", "FullName": "Nifty IT"}]);
        let names = parse_index_list(&objects).unwrap();
        assert_eq!(names[0].full_name, "Nifty IT");

        assert!(parse_index_list(&json!([])).is_err());
    }

    #[test]
    fn test_option_contract_info() {
        let payload = json!({
            "expiryDates": ["25-Jan-2024", "29-Feb-2024"],
            "strikePrice": ["3400.00", 3450, 3500.5]
        });

        let info = parse_option_contract_info(&payload).unwrap();
        assert_eq!(
            info.expiry_dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 25).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            ]
        );
        assert_eq!(info.strike_prices, vec![3400, 3450, 3500]);

        let expiries_only = json!({"expiryDates": ["25-Jan-2024"]});
        assert_eq!(parse_option_expiries(&expiries_only).unwrap().len(), 1);
        assert!(parse_option_strikes(&expiries_only).is_err());

        let bad_date = json!({"expiryDates": ["2024-01-25"]});
        assert!(matches!(
            parse_option_expiries(&bad_date),
            Err(PayloadError::MissingField(_))
        ));
    }

    #[test]
    fn test_security_snapshots_scale_units() {
        let payload = json!({"total": {"data": [
            {"symbol": "RELIANCE", "series": "EQ", "lastPrice": 2612.35, "previousClose": 2580.5,
             "change": 31.85, "pchange": 1.23, "totalTradedVolume": 51.23,
             "totalTradedValue": 1334.9, "totalMarketCap": 176_750.2},
            {"symbol": "SMEX", "series": "SM", "lastPrice": 90.0, "totalTradedVolume": 0.02},
            {"symbol": "GOLDBEES", "series": "BE", "lastPrice": 60.0}
        ]}});

        let all = parse_security_snapshots(&payload, &[]).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].volume, 5_123_000);
        assert!((all[0].traded_value - 13_349_000_000.0).abs() < 1.0);
        assert!((all[0].changepct - 1.23).abs() < f64::EPSILON);
        assert_eq!(all[1].volume, 2_000);

        let filtered = parse_security_snapshots(&payload, &["EQ", "SM"]).unwrap();
        let symbols: Vec<&str> = filtered.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["RELIANCE", "SMEX"]);

        assert!(matches!(
            parse_security_snapshots(&payload, &["GS"]),
            Err(PayloadError::NoData)
        ));
    }

    #[test]
    fn test_fno_underlyings() {
        let payload = json!({"data": {"UnderlyingList": [
            {"underlying": "Reliance Industries Limited", "symbol": "RELIANCE", "serialNumber": 1}
        ]}});
        let rows = parse_fno_underlyings(&payload).unwrap();
        assert_eq!(rows[0].symbol, "RELIANCE");
        assert_eq!(rows[0].name, "Reliance Industries Limited");
        assert!(parse_fno_underlyings(&json!({"data": {}})).is_err());
    }

    #[test]
    fn test_pre_open_skips_rows_without_metadata() {
        let payload = json!({"data": [
            {"metadata": {"symbol": "TCS", "iep": 3801.0, "previousClose": 3790.0, "change": 11.0,
                          "pChange": 0.29, "finalQuantity": 12_000, "totalTurnover": 45_612_000.0,
                          "marketCap": 1_375_000.0, "yearHigh": 4000.0, "yearLow": 3100.0}},
            {"detail": {}}
        ]});
        let quotes = parse_pre_open(&payload).unwrap();
        assert_eq!(quotes.len(), 1);
        assert!((quotes[0].iep - 3801.0).abs() < f64::EPSILON);
        assert!((quotes[0].quantity - 12_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_year_extremes_with_timestamp() {
        let payload = json!({
            "timestamp": "15-Jan-2024 15:30:00",
            "data": [{"symbol": "ITC", "series": "EQ", "comapnyName": "ITC Limited",
                      "new52WHL": 499.7, "prev52WHL": 499.0, "prevHLDate": "12-Jan-2024",
                      "ltp": 495.1, "prevClose": "490.10", "change": 5.0, "pChange": 1.020_198}]
        });
        let extremes = parse_year_extremes(&payload, YearExtremeKind::High).unwrap();
        assert_eq!(extremes.kind, YearExtremeKind::High);
        assert_eq!(
            extremes.timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(15, 30, 0)
        );

        let row = &extremes.rows[0];
        assert_eq!(row.name, "ITC Limited");
        assert_eq!(row.previous_date, NaiveDate::from_ymd_opt(2024, 1, 12));
        assert!((row.previous_close - 490.1).abs() < 1e-9);
        assert!((row.changepct - 1.02).abs() < 1e-9);

        let untimed = json!({"data": [{"symbol": "ITC"}]});
        let extremes = parse_year_extremes(&untimed, YearExtremeKind::Low).unwrap();
        assert_eq!(extremes.timestamp, None);
    }

    #[test]
    fn test_holidays() {
        let payload = json!({"CM": [
            {"tradingDate": "26-Jan-2024", "weekDay": "Friday", "description": "Republic Day"},
            {"tradingDate": "tbd", "weekDay": "", "description": "Special session"}
        ], "FO": []});
        let holidays = parse_holidays(&payload).unwrap();
        assert_eq!(holidays[0].date, NaiveDate::from_ymd_opt(2024, 1, 26));
        assert_eq!(holidays[0].description, "Republic Day");
        assert_eq!(holidays[1].date, None);
        assert!(matches!(parse_holidays(&json!({"CM": []})), Err(PayloadError::NoData)));
    }
}
