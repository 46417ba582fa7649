//! CSV listings: the equity master list and the daily bhavcopy.

use chrono::NaiveDate;
use csv_async::{AsyncReaderBuilder, Trim};
use futures::StreamExt;
use nsekit_types::{BhavcopyRow, EquityListing};
use serde::Deserialize;

use crate::PayloadError;

/// Date format used by NSE CSV and JSON payloads (`15-Jan-2024`).
const DATE_FORMAT: &str = "%d-%b-%Y";

/// Turnover and volumes are reported in lakhs.
pub(crate) const LAKH: f64 = 100_000.0;

#[derive(Debug, Deserialize)]
struct EquityRecord {
    #[serde(rename = "SYMBOL")]
    symbol: String,
    #[serde(rename = "NAME OF COMPANY")]
    name: String,
    #[serde(rename = "SERIES")]
    series: String,
    #[serde(rename = "DATE OF LISTING")]
    date_of_listing: String,
    #[serde(rename = "ISIN NUMBER")]
    isin_number: String,
    #[serde(rename = "FACE VALUE", default)]
    face_value: String,
}

#[derive(Debug, Deserialize)]
struct BhavcopyRecord {
    #[serde(rename = "DATE1")]
    date: String,
    #[serde(rename = "SYMBOL")]
    symbol: String,
    #[serde(rename = "SERIES")]
    series: String,
    #[serde(rename = "PREV_CLOSE")]
    previous_close: String,
    #[serde(rename = "OPEN_PRICE")]
    open: String,
    #[serde(rename = "HIGH_PRICE")]
    high: String,
    #[serde(rename = "LOW_PRICE")]
    low: String,
    #[serde(rename = "CLOSE_PRICE")]
    close: String,
    #[serde(rename = "AVG_PRICE")]
    vwap: String,
    #[serde(rename = "TTL_TRD_QNTY")]
    volume: String,
    #[serde(rename = "TURNOVER_LACS")]
    turnover: String,
    #[serde(rename = "DELIV_QTY", default)]
    delivery_volume: String,
    #[serde(rename = "DELIV_PER", default)]
    delivery_pct: String,
}

/// Parses the listed-equities CSV.
///
/// Header names are trimmed, so the padded headers of the exchange file
/// (`" SERIES"`, `" DATE OF LISTING"`) match. Unparseable listing dates
/// become `None`.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or lacks a required column.
pub async fn parse_equity_list(data: &[u8]) -> Result<Vec<EquityListing>, PayloadError> {
    let mut reader = AsyncReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .create_deserializer(data);
    let mut records = reader.deserialize::<EquityRecord>();

    let mut rows = Vec::new();
    while let Some(record) = records.next().await {
        let record = record?;
        rows.push(EquityListing {
            date_of_listing: parse_date(&record.date_of_listing),
            face_value: parse_number(&record.face_value).unwrap_or_default(),
            symbol: record.symbol,
            name: record.name,
            series: record.series,
            isin_number: record.isin_number,
        });
    }
    Ok(rows)
}

/// Parses a bhavcopy CSV with delivery data, optionally keeping one series.
///
/// Turnover is converted from lakhs to rupees. Delivery columns reported as
/// `-` become `None`.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or lacks a required column.
pub async fn parse_bhavcopy(
    data: &[u8],
    series: Option<&str>,
) -> Result<Vec<BhavcopyRow>, PayloadError> {
    let mut reader = AsyncReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .create_deserializer(data);
    let mut records = reader.deserialize::<BhavcopyRecord>();

    let mut rows = Vec::new();
    while let Some(record) = records.next().await {
        let record = record?;
        if series.is_some_and(|s| !record.series.eq_ignore_ascii_case(s.trim())) {
            continue;
        }

        let number = |field: &str| parse_number(field).unwrap_or_default();
        rows.push(BhavcopyRow {
            date: parse_date(&record.date),
            previous_close: number(&record.previous_close),
            open: number(&record.open),
            high: number(&record.high),
            low: number(&record.low),
            close: number(&record.close),
            vwap: number(&record.vwap),
            volume: number(&record.volume),
            turnover: number(&record.turnover) * LAKH,
            delivery_volume: parse_number(&record.delivery_volume),
            delivery_pct: parse_number(&record.delivery_pct),
            symbol: record.symbol,
            series: record.series,
        });
    }
    Ok(rows)
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EQUITY_CSV: &str = "\
SYMBOL,NAME OF COMPANY, SERIES, DATE OF LISTING, PAID UP VALUE, MARKET LOT, ISIN NUMBER, FACE VALUE
20MICRONS,20 Microns Limited,EQ,06-OCT-2008,5,1,INE144J01027,5
RELIANCE,Reliance Industries Limited,EQ,29-NOV-1995,10,1,INE002A01018,10
NEWCO,New Company Limited,BE,not-a-date,1,1,INE000X01010,1
";

    const BHAVCOPY_CSV: &str = "\
SYMBOL, SERIES, DATE1, PREV_CLOSE, OPEN_PRICE, HIGH_PRICE, LOW_PRICE, LAST_PRICE, CLOSE_PRICE, AVG_PRICE, TTL_TRD_QNTY, TURNOVER_LACS, NO_OF_TRADES, DELIV_QTY, DELIV_PER
RELIANCE, EQ, 15-Jan-2024, 2580.50, 2590.00, 2620.00, 2585.10, 2610.00, 2612.35, 2605.42, 5123456, 133490.12, 120345, 2561728, 50.00
RELIANCE, BL, 15-Jan-2024, 2580.50, 2600.00, 2600.00, 2600.00, 2600.00, 2600.00, 2600.00, 1000, 26.00, 1, -, -
";

    #[tokio::test]
    async fn test_equity_list() {
        let rows = parse_equity_list(EQUITY_CSV.as_bytes()).await.unwrap();
        assert_eq!(rows.len(), 3);

        let reliance = &rows[1];
        assert_eq!(reliance.symbol, "RELIANCE");
        assert_eq!(reliance.series, "EQ");
        assert_eq!(reliance.isin_number, "INE002A01018");
        assert_eq!(reliance.date_of_listing, NaiveDate::from_ymd_opt(1995, 11, 29));
        assert!((reliance.face_value - 10.0).abs() < f64::EPSILON);

        assert_eq!(rows[2].date_of_listing, None);
    }

    #[tokio::test]
    async fn test_bhavcopy() {
        let rows = parse_bhavcopy(BHAVCOPY_CSV.as_bytes(), None).await.unwrap();
        assert_eq!(rows.len(), 2);

        let eq = &rows[0];
        assert_eq!(eq.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert!((eq.close - 2612.35).abs() < 1e-9);
        assert!((eq.vwap - 2605.42).abs() < 1e-9);
        assert!((eq.turnover - 13_349_012_000.0).abs() < 1e-3);
        assert_eq!(eq.delivery_volume, Some(2_561_728.0));

        assert_eq!(rows[1].delivery_volume, None);
        assert_eq!(rows[1].delivery_pct, None);
    }

    #[tokio::test]
    async fn test_bhavcopy_series_filter() {
        let rows = parse_bhavcopy(BHAVCOPY_CSV.as_bytes(), Some("BL"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].series, "BL");
    }

    #[tokio::test]
    async fn test_missing_column_is_an_error() {
        let result = parse_equity_list(b"SYMBOL\nRELIANCE\n").await;
        assert!(matches!(result, Err(PayloadError::Csv(_))));
    }
}
