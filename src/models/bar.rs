//! Historical OHLCV bars and timestamp normalization.
//!
//! The broker's history query returns its timestamp column in whichever
//! representation the SDK version produced: integer epoch seconds, integer
//! epoch milliseconds, or a datetime string. [`normalize_timestamp`] maps
//! all three onto one `DateTime<Utc>`.

use chrono::{DateTime, DurationRound, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::GatewayError;

/// Integer timestamps above this magnitude are milliseconds, below it seconds.
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Datetime layouts accepted for string timestamps, tried in order.
const STRING_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Bar aggregation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Minute,
    Hour,
    Daily,
}

/// Host request for historical bars between two dates (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
}

/// Timestamp cell of a raw history row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Int(i64),
    Text(String),
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub interval: Interval,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    pub amount: Decimal,
}

/// Normalizes a raw history timestamp.
///
/// Integers with magnitude above [`MILLIS_THRESHOLD`] are epoch
/// milliseconds, anything else epoch seconds. Strings are parsed as RFC 3339
/// first, then as naive datetimes (space or `T` separated, optional
/// fractional seconds) which are taken as UTC.
///
/// # Errors
///
/// Returns [`GatewayError::Timestamp`] if the value is out of range or the
/// string matches no accepted layout.
pub fn normalize_timestamp(raw: &RawTimestamp) -> crate::Result<DateTime<Utc>> {
    match raw {
        RawTimestamp::Int(value) => {
            let parsed = if value.abs() > MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(*value)
            } else {
                DateTime::from_timestamp(*value, 0)
            };
            parsed.ok_or_else(|| GatewayError::Timestamp(format!("out of range: {value}")))
        }
        RawTimestamp::Text(text) => parse_datetime_str(text.trim()),
    }
}

fn parse_datetime_str(text: &str) -> crate::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    STRING_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| GatewayError::Timestamp(format!("unrecognized layout: {text:?}")))
}

/// Returns the start of the bucket `datetime` falls into.
fn bucket_start(datetime: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    let step = match interval {
        Interval::Minute => TimeDelta::minutes(1),
        Interval::Hour => TimeDelta::hours(1),
        Interval::Daily => TimeDelta::days(1),
    };
    datetime.duration_trunc(step).unwrap_or(datetime)
}

/// Aggregates minute bars into `interval` buckets.
///
/// Input order does not matter; output is sorted by bucket start. Open is
/// the first bar's open, close the last bar's close, high/low the extremes,
/// volume and amount the sums.
pub fn resample(mut bars: Vec<Bar>, interval: Interval) -> Vec<Bar> {
    bars.sort_by_key(|b| b.datetime);

    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let start = bucket_start(bar.datetime, interval);
        match out.last_mut() {
            Some(current) if current.datetime == start => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
                current.amount += bar.amount;
            }
            _ => out.push(Bar {
                datetime: start,
                interval,
                ..bar
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minute(symbol: &str, ts: &str, open: Decimal, close: Decimal, volume: u64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            datetime: parse_datetime_str(ts).unwrap(),
            interval: Interval::Minute,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume,
            amount: close * Decimal::from(volume),
        }
    }

    #[test]
    fn seconds_and_millis_agree() {
        let secs = normalize_timestamp(&RawTimestamp::Int(1_700_000_000)).unwrap();
        let millis = normalize_timestamp(&RawTimestamp::Int(1_700_000_000_000)).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn threshold_boundary_is_seconds() {
        // Exactly 10^12 is not above the threshold, so it reads as seconds.
        let at = normalize_timestamp(&RawTimestamp::Int(MILLIS_THRESHOLD)).unwrap();
        assert_eq!(at.timestamp(), MILLIS_THRESHOLD);
        let above = normalize_timestamp(&RawTimestamp::Int(MILLIS_THRESHOLD + 1)).unwrap();
        assert_eq!(above.timestamp(), 1_000_000_000);
    }

    #[test]
    fn string_layouts() {
        let expected = "2023-11-15T10:00:00+00:00";
        for text in [
            "2023-11-15 10:00:00",
            "2023-11-15T10:00:00",
            "2023-11-15 10:00:00.000",
            "2023-11-15 10:00",
            "2023-11-15T10:00:00Z",
        ] {
            let dt = normalize_timestamp(&RawTimestamp::Text(text.to_string())).unwrap();
            assert_eq!(dt.to_rfc3339(), expected, "layout {text}");
        }
    }

    #[test]
    fn rejects_garbage_string() {
        let err = normalize_timestamp(&RawTimestamp::Text("yesterday".to_string())).unwrap_err();
        assert!(matches!(err, GatewayError::Timestamp(_)));
    }

    #[test]
    fn raw_timestamp_deserializes_untagged() {
        let int: RawTimestamp = serde_json::from_str("1700000000").unwrap();
        let text: RawTimestamp = serde_json::from_str("\"2023-11-15 10:00:00\"").unwrap();
        assert_eq!(int, RawTimestamp::Int(1_700_000_000));
        assert_eq!(text, RawTimestamp::Text("2023-11-15 10:00:00".to_string()));
    }

    #[test]
    fn resample_to_hour() {
        let bars = vec![
            minute("2330", "2024-01-15 01:01:00", dec!(580), dec!(582), 10),
            minute("2330", "2024-01-15 01:00:00", dec!(579), dec!(580), 5),
            minute("2330", "2024-01-15 02:00:00", dec!(582), dec!(581), 7),
        ];
        let hourly = resample(bars, Interval::Hour);

        assert_eq!(hourly.len(), 2);
        let first = &hourly[0];
        assert_eq!(first.datetime.to_rfc3339(), "2024-01-15T01:00:00+00:00");
        assert_eq!(first.interval, Interval::Hour);
        assert_eq!(first.open, dec!(579));
        assert_eq!(first.close, dec!(582));
        assert_eq!(first.high, dec!(582));
        assert_eq!(first.low, dec!(579));
        assert_eq!(first.volume, 15);
        assert_eq!(hourly[1].volume, 7);
    }

    #[test]
    fn resample_minute_keeps_rows() {
        let bars = vec![
            minute("2330", "2024-01-15 01:00:00", dec!(579), dec!(580), 5),
            minute("2330", "2024-01-15 01:01:00", dec!(580), dec!(582), 10),
        ];
        assert_eq!(resample(bars, Interval::Minute).len(), 2);
    }
}
