//! Payload parsing and normalization end to end.

use chrono::{NaiveDate, NaiveDateTime};
use nsekit_normalize::{Normalizer, PayloadError, parse_chart_payload};
use nsekit_types::{Interval, SessionWindow};
use serde_json::json;

fn stamp(h: u32, m: u32, s: u32) -> i64 {
    wall(h, m, s).and_utc().timestamp()
}

fn wall(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

#[test]
fn test_intraday_chart_to_table() {
    let payload = json!({
        "s": "Ok",
        "t": [stamp(9, 14, 59), stamp(9, 17, 59), stamp(9, 20, 59), stamp(9, 17, 59), stamp(15, 32, 59)],
        "o": [1.0, 2.0, 3.0, 99.0, 5.0],
        "h": [1.0, 2.0, 3.0, 99.0, 5.0],
        "l": [1.0, 2.0, 3.0, 99.0, 5.0],
        "c": [1.0, 2.0, 3.0, 99.0, 5.0],
        "v": [10, 20, 30, 990, 50]
    });

    let raw = parse_chart_payload(&payload).unwrap();
    let table = Normalizer::for_interval(Interval::Minutes(3)).normalize(&raw);

    let times: Vec<NaiveDateTime> = table.iter().map(|c| c.datetime).collect();
    assert_eq!(times, vec![wall(9, 15, 0), wall(9, 18, 0)]);
    assert!((table.rows()[0].open - 2.0).abs() < f64::EPSILON);
}

#[test]
fn test_row_object_chart_with_custom_window() {
    let ms = |h, m, s| stamp(h, m, s) * 1000;
    let payload = json!({"data": [
        {"time": ms(9, 14, 59), "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 1},
        {"time": ms(15, 30, 59), "open": 2.0, "high": 2.0, "low": 2.0, "close": 2.0, "volume": 2}
    ]});

    let raw = parse_chart_payload(&payload).unwrap();
    let window = SessionWindow::from_hm(9, 14, 15, 31).unwrap();
    let table = Normalizer::new(Interval::Minutes(1), window).normalize(&raw);

    assert_eq!(table.len(), 2);
    assert_eq!(table.first().unwrap().datetime, wall(9, 14, 0));
    assert_eq!(table.last().unwrap().datetime, wall(15, 30, 0));
}

#[test]
fn test_failure_status_never_reaches_normalizer() {
    let payload = json!({"s": "error", "t": [stamp(10, 0, 59)]});
    assert!(matches!(
        parse_chart_payload(&payload),
        Err(PayloadError::FailureStatus(_))
    ));
}

#[test]
fn test_tidy_after_normalize_is_noop() {
    let payload = json!({
        "s": "Ok",
        "t": [stamp(10, 4, 59), stamp(10, 0, 7), stamp(9, 59, 59), stamp(10, 9, 30)],
        "o": [1.0, 2.0, 3.0, 4.0],
        "h": [1.0, 2.0, 3.0, 4.0],
        "l": [1.0, 2.0, 3.0, 4.0],
        "c": [1.0, 2.0, 3.0, 4.0],
        "v": [1, 2, 3, 4]
    });
    let normalizer = Normalizer::for_interval(Interval::Minutes(5));

    let table = normalizer.normalize(&parse_chart_payload(&payload).unwrap());
    assert_eq!(normalizer.tidy(table.clone()), table);
}
