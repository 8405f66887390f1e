//! Value normalization
//!
//! Pure functions that convert raw scalar representations from the record
//! source into canonical types:
//! - monetary strings with currency symbols and thousands separators
//! - millisecond duration counts
//! - `DD-Mon` date strings projected to `YYYY-MM` buckets
//!
//! Every normalizer resolves bad input locally (0, zero duration, or `None`)
//! and never returns an error.

use chrono::{Duration, NaiveDate};
use serde_json::Value;

/// Normalize a raw monetary value to a float.
///
/// Textual values follow a Latin-American convention: `.` and `,` are
/// thousands separators, never decimal points, and `$` and spaces are
/// noise. A lone `-` stands for "no value". Anything that still fails to
/// parse becomes 0.
pub fn normalize_monetary(raw: &Value) -> f64 {
    match raw {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '.' | ',' | '$' | ' '))
                .collect();
            if cleaned.is_empty() || cleaned == "-" {
                return 0.0;
            }
            match cleaned.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!(value = %s, "unparseable monetary value, defaulting to 0");
                    0.0
                }
            }
        }
        _ => 0.0,
    }
}

/// Normalize a raw duration value, interpreted as a count of milliseconds.
/// Null or unparseable input becomes a zero-length duration.
pub fn normalize_duration(raw: &Value) -> Duration {
    let millis = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match millis {
        Some(ms) if ms.is_finite() => Duration::milliseconds(ms.round() as i64),
        _ => Duration::zero(),
    }
}

/// Total hours in a duration, for rate computations.
pub fn duration_hours(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 3_600_000.0
}

/// Normalize a `DD-Mon` date string (no year) to a `YYYY-MM` month bucket,
/// anchoring it to the given year. Unparseable input yields `None`; such
/// rows are excluded from month-keyed aggregates.
pub fn normalize_month(raw: &str, anchor_year: i32) -> Option<String> {
    let dated = format!("{}-{}", raw.trim(), anchor_year);
    NaiveDate::parse_from_str(&dated, "%d-%b-%Y")
        .ok()
        .map(|d| d.format("%Y-%m").to_string())
}

/// Coerce a raw value to a number. Non-numeric input yields `None` —
/// missing, not zero — so the cleaner can drop rows that lack key measures.
pub fn coerce_numeric(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_monetary_thousands_separators() {
        assert_eq!(normalize_monetary(&json!("1.234.567")), 1_234_567.0);
        assert_eq!(normalize_monetary(&json!("$ 1.000")), 1000.0);
        assert_eq!(normalize_monetary(&json!("2,500")), 2500.0);
    }

    #[test]
    fn test_monetary_null_and_dash() {
        assert_eq!(normalize_monetary(&Value::Null), 0.0);
        assert_eq!(normalize_monetary(&json!("-")), 0.0);
        assert_eq!(normalize_monetary(&json!("")), 0.0);
    }

    #[test]
    fn test_monetary_numeric_passthrough() {
        assert_eq!(normalize_monetary(&json!(1450.8)), 1450.8);
        assert_eq!(normalize_monetary(&json!(0)), 0.0);
    }

    #[test]
    fn test_monetary_garbage_defaults_to_zero() {
        assert_eq!(normalize_monetary(&json!("n/a")), 0.0);
        assert_eq!(normalize_monetary(&json!(true)), 0.0);
    }

    #[test]
    fn test_duration_from_milliseconds() {
        let d = normalize_duration(&json!(3_600_000));
        assert_eq!(d, Duration::milliseconds(3_600_000));
        assert_eq!(duration_hours(d), 1.0);

        let from_str = normalize_duration(&json!("1800000"));
        assert_eq!(duration_hours(from_str), 0.5);
    }

    #[test]
    fn test_duration_invalid_is_zero() {
        assert_eq!(normalize_duration(&Value::Null), Duration::zero());
        assert_eq!(normalize_duration(&json!("soon")), Duration::zero());
    }

    #[test]
    fn test_month_bucket() {
        assert_eq!(normalize_month("05-Jan", 2024), Some("2024-01".to_string()));
        assert_eq!(normalize_month("28-Dec", 2024), Some("2024-12".to_string()));
        assert_eq!(normalize_month("garbage", 2024), None);
        assert_eq!(normalize_month("32-Jan", 2024), None);
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&json!(42)), Some(42.0));
        assert_eq!(coerce_numeric(&json!("3.5")), Some(3.5));
        assert_eq!(coerce_numeric(&json!(" 120 ")), Some(120.0));
        assert_eq!(coerce_numeric(&json!("abc")), None);
        assert_eq!(coerce_numeric(&Value::Null), None);
    }
}
