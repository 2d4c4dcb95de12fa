//! Calendar date parsing and the parts derived from a date.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Date formats tried in order. Slash dates are read month-first; a slash date
/// that is only valid day-first (`25/01/2024`) falls through to `%d/%m/%Y`.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y-%b-%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a calendar date, accepting ISO, slash, compact and named-month
/// forms as well as timestamps (the time part is discarded).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    None
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Eight-digit `YYYYMMDD` key.
pub fn date_id(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

pub fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Every column of the date dimension, derived from one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub date_id: i64,
    pub date: String,
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub quarter: i64,
    pub day_name: String,
}

impl DateParts {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date_id: date_id(date),
            date: format_iso(date),
            year: i64::from(date.year()),
            month: i64::from(date.month()),
            day: i64::from(date.day()),
            quarter: i64::from(quarter(date)),
            day_name: day_name(date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_date("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(" 2024/01/15 "), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("01/15/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("25/01/2024"), Some(ymd(2024, 1, 25)));
        assert_eq!(parse_date("20240115"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("15-Jan-2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("January 15, 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15 08:30:00"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn rejects_invalid_dates() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("32/13/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn derives_parts() {
        let parts = DateParts::from_date(ymd(2024, 3, 31));
        assert_eq!(parts.date_id, 20240331);
        assert_eq!(parts.date, "2024-03-31");
        assert_eq!(parts.quarter, 1);
        assert_eq!(parts.day_name, "Sunday");
        assert_eq!(quarter(ymd(2024, 10, 1)), 4);
    }
}
