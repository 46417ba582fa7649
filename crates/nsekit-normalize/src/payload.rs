//! Chart payload parsing.

use nsekit_types::{EpochUnit, RawCandle};
use serde_json::{Map, Value};

use crate::PayloadError;

/// Success marker of status-wrapped payloads.
const STATUS_OK: &str = "Ok";

/// Parallel-array field names, in column order.
const ARRAY_FIELDS: [&str; 6] = ["t", "o", "h", "l", "c", "v"];

/// Row-object field names, in column order.
const ROW_FIELDS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

/// Parses a chart response into raw candles.
///
/// Two shapes are accepted:
///
/// - `{"s": "Ok", "t": [...], "o": [...], "h", "l", "c", "v"}` with epoch
///   seconds, from the equity intraday chart;
/// - `{"data": [{"time", "open", "high", "low", "close", "volume"}, ...]}`
///   with epoch milliseconds, from the symbol history chart.
///
/// Numeric strings are accepted wherever a number is expected.
///
/// # Errors
///
/// - [`PayloadError::FailureStatus`] if `s` is present and not `"Ok"`, or
///   `status` is `false`
/// - [`PayloadError::NoData`] if the payload holds no rows
/// - [`PayloadError::MissingField`] / [`PayloadError::LengthMismatch`] for
///   malformed payloads
pub fn parse_chart_payload(payload: &Value) -> Result<Vec<RawCandle>, PayloadError> {
    let object = payload
        .as_object()
        .ok_or_else(|| PayloadError::missing("<root object>"))?;

    if let Some(status) = object.get("s") {
        let status = status
            .as_str()
            .map_or_else(|| status.to_string(), str::to_string);
        if status != STATUS_OK {
            return Err(PayloadError::FailureStatus(status));
        }
        return parse_parallel_arrays(object);
    }

    if object.get("status") == Some(&Value::Bool(false)) {
        return Err(PayloadError::FailureStatus("false".into()));
    }

    match object.get("data") {
        Some(Value::Array(rows)) => parse_row_objects(rows),
        Some(Value::Null) => Err(PayloadError::NoData),
        Some(_) => Err(PayloadError::missing("data")),
        None if object.contains_key("t") => parse_parallel_arrays(object),
        None => Err(PayloadError::missing("data")),
    }
}

fn parse_parallel_arrays(object: &Map<String, Value>) -> Result<Vec<RawCandle>, PayloadError> {
    let mut columns: Vec<&Vec<Value>> = Vec::with_capacity(ARRAY_FIELDS.len());
    for field in ARRAY_FIELDS {
        let column = object
            .get(field)
            .and_then(Value::as_array)
            .ok_or_else(|| PayloadError::missing(field))?;
        columns.push(column);
    }

    let expected = columns[0].len();
    for (field, column) in ARRAY_FIELDS.iter().zip(&columns) {
        if column.len() != expected {
            return Err(PayloadError::LengthMismatch {
                field: *field,
                expected,
                found: column.len(),
            });
        }
    }
    if expected == 0 {
        return Err(PayloadError::NoData);
    }

    (0..expected)
        .map(|i| {
            let value = |col: usize| number(&columns[col][i]);
            Ok(RawCandle::new(
                epoch(&columns[0][i]).ok_or_else(|| PayloadError::missing("t"))?,
                EpochUnit::Seconds,
                value(1).ok_or_else(|| PayloadError::missing("o"))?,
                value(2).ok_or_else(|| PayloadError::missing("h"))?,
                value(3).ok_or_else(|| PayloadError::missing("l"))?,
                value(4).ok_or_else(|| PayloadError::missing("c"))?,
                value(5).unwrap_or(0.0),
            ))
        })
        .collect()
}

fn parse_row_objects(rows: &[Value]) -> Result<Vec<RawCandle>, PayloadError> {
    if rows.is_empty() {
        return Err(PayloadError::NoData);
    }

    rows.iter()
        .map(|row| {
            let field = |name: &str| row.get(name).and_then(number);
            let [time, open, high, low, close, volume] = ROW_FIELDS;
            Ok(RawCandle::new(
                row.get(time)
                    .and_then(epoch)
                    .ok_or_else(|| PayloadError::missing(time))?,
                EpochUnit::Milliseconds,
                field(open).ok_or_else(|| PayloadError::missing(open))?,
                field(high).ok_or_else(|| PayloadError::missing(high))?,
                field(low).ok_or_else(|| PayloadError::missing(low))?,
                field(close).ok_or_else(|| PayloadError::missing(close))?,
                field(volume).unwrap_or(0.0),
            ))
        })
        .collect()
}

/// Reads a number, accepting numeric strings.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Reads an integral epoch, truncating fractional values.
fn epoch(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parallel_arrays() {
        let payload = json!({
            "s": "Ok",
            "t": [1_705_310_279, 1_705_310_459],
            "o": [2500.5, 2501.0],
            "h": [2502.0, 2503.5],
            "l": [2499.0, 2500.0],
            "c": [2501.0, 2503.0],
            "v": [1200, 900]
        });

        let rows = parse_chart_payload(&payload).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, 1_705_310_279);
        assert_eq!(rows[0].unit, EpochUnit::Seconds);
        assert!((rows[1].high - 2503.5).abs() < f64::EPSILON);
        assert!((rows[1].volume - 900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_row_objects() {
        let payload = json!({
            "status": true,
            "data": [
                {"time": 1_705_310_279_000_i64, "open": 21_500.0, "high": 21_510.0,
                 "low": 21_490.0, "close": "21505.5", "volume": 0}
            ]
        });

        let rows = parse_chart_payload(&payload).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].unit, EpochUnit::Milliseconds);
        assert_eq!(rows[0].epoch_seconds(), 1_705_310_279);
        assert!((rows[0].close - 21_505.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failure_status_short_circuits() {
        let payload = json!({"s": "no_data", "t": [1], "o": [1]});
        assert!(matches!(
            parse_chart_payload(&payload),
            Err(PayloadError::FailureStatus(s)) if s == "no_data"
        ));

        let payload = json!({"status": false, "data": []});
        assert!(matches!(
            parse_chart_payload(&payload),
            Err(PayloadError::FailureStatus(_))
        ));
    }

    #[test]
    fn test_empty_payloads() {
        assert!(matches!(
            parse_chart_payload(&json!({"data": []})),
            Err(PayloadError::NoData)
        ));
        assert!(matches!(
            parse_chart_payload(&json!({"s": "Ok", "t": [], "o": [], "h": [], "l": [], "c": [], "v": []})),
            Err(PayloadError::NoData)
        ));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            parse_chart_payload(&json!({"s": "Ok", "t": [1, 2], "o": [1.0], "h": [1.0, 2.0], "l": [1.0, 2.0], "c": [1.0, 2.0], "v": [1, 2]})),
            Err(PayloadError::LengthMismatch { field: "o", expected: 2, found: 1 })
        ));
        assert!(matches!(
            parse_chart_payload(&json!({"s": "Ok", "t": [1]})),
            Err(PayloadError::MissingField(f)) if f == "o"
        ));
        assert!(matches!(
            parse_chart_payload(&json!({"data": [{"time": 1}]})),
            Err(PayloadError::MissingField(f)) if f == "open"
        ));
        assert!(matches!(
            parse_chart_payload(&json!([1, 2, 3])),
            Err(PayloadError::MissingField(_))
        ));
    }
}
