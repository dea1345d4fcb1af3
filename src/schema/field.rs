//! Loosely-typed leaf fields and their coercions
//!
//! Entry fields arrive as whatever JSON the exporting device wrote: numbers,
//! numeric strings, or garbage. Coercion happens per field so that one bad
//! value only drops its own record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A present (non-null) leaf value from an ingestion entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field(pub Value);

/// Naive layouts accepted in addition to RFC 3339; all are read as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl Field {
    /// Coerce to a finite f64 from a JSON number or a numeric string
    pub fn as_number(&self) -> Option<f64> {
        let value = match &self.0 {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        value.is_finite().then_some(value)
    }

    /// Coerce to text; numbers are rendered, empty strings rejected
    pub fn as_text(&self) -> Option<String> {
        match &self.0 {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Parse as an instant (RFC 3339, or naive date-time assumed UTC)
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match &self.0 {
            Value::String(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// Parse a calendar date and anchor it at midnight UTC
    pub fn as_midnight(&self) -> Option<DateTime<Utc>> {
        match &self.0 {
            Value::String(s) => parse_date(s).map(midnight_utc),
            _ => None,
        }
    }
}

/// Parse a timestamp string as written by device exports
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Midnight UTC at the start of `date`
pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
