//! Timestamps.
//!
//! Every metric carries its instant twice: as whole epoch seconds, which is
//! what buckets and the wire format key on, and as an ISO-8601 string for
//! human consumption. `Timestamp` keeps the two in lock-step.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The current time in whole epoch seconds.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// An instant, in epoch seconds and ISO-8601 form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Timestamp {
    secs: i64,
    iso8601: String,
}

impl Timestamp {
    /// The current instant.
    pub fn now() -> Timestamp {
        Timestamp::from_datetime(Utc::now())
    }

    /// Build from epoch seconds. Returns `None` if chrono cannot represent
    /// the instant.
    pub fn from_secs(secs: i64) -> Option<Timestamp> {
        Utc.timestamp_opt(secs, 0).single().map(Timestamp::from_datetime)
    }

    fn from_datetime(dt: DateTime<Utc>) -> Timestamp {
        let secs = dt.timestamp();
        // drop sub-second precision so both forms name the same instant
        let whole = Utc.timestamp_opt(secs, 0).single().unwrap_or(dt);
        Timestamp {
            secs: secs,
            iso8601: whole.to_rfc3339(),
        }
    }

    /// Parse a JSON value as a timestamp.
    ///
    /// Numbers are epoch seconds, with any fraction truncated. Strings may
    /// be numeric epoch seconds, `@<secs>`, `now`, RFC 3339, or one of
    /// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`, all
    /// read as UTC.
    pub fn parse(value: &Value) -> Option<Timestamp> {
        match *value {
            Value::Number(ref n) => n.as_f64().and_then(from_float_secs),
            Value::String(ref s) => Timestamp::parse_str(s),
            _ => None,
        }
    }

    /// Parse a string as a timestamp. See `Timestamp::parse`.
    pub fn parse_str(raw: &str) -> Option<Timestamp> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if s.eq_ignore_ascii_case("now") {
            return Some(Timestamp::now());
        }
        let numeric = if s.starts_with('@') { &s[1..] } else { s };
        if let Ok(f) = f64::from_str(numeric) {
            return from_float_secs(f);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Timestamp::from_datetime(dt.with_timezone(&Utc)));
        }
        for fmt in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Timestamp::from_datetime(Utc.from_utc_datetime(&naive)));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Timestamp::from_datetime(Utc.from_utc_datetime(&naive)))
    }

    /// Whole epoch seconds.
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// The RFC 3339 rendering, always in UTC.
    pub fn iso8601(&self) -> &str {
        &self.iso8601
    }
}

fn from_float_secs(f: f64) -> Option<Timestamp> {
    if !f.is_finite() || f.abs() > i64::max_value() as f64 {
        return None;
    }
    Timestamp::from_secs(f.trunc() as i64)
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Timestamp {{ {} / {} }}", self.secs, self.iso8601)
    }
}
