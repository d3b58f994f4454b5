//! Calendar date recognition for raw cells.
//!
//! Text cells are matched against a fixed list of layouts whose components
//! are assembled straight into a [`NaiveDate`], so date-only strings never
//! pass through a timezone. Numeric cells are spreadsheet serial day counts.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::data::CellValue;

/// Serial day number of 1970-01-01 in the 1900 date system.
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;
const MILLIS_PER_DAY: f64 = 86_400.0 * 1000.0;

const FALLBACK_DATETIME_FORMATS: &[&str] =
    &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M:%S"];
const FALLBACK_DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

#[derive(Debug, Clone, Copy)]
enum FieldOrder {
    YearMonthDay,
    DayMonthYear,
}

struct DatePattern {
    regex: Regex,
    order: FieldOrder,
}

fn date_patterns() -> &'static [DatePattern] {
    static PATTERNS: OnceLock<Vec<DatePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})$", FieldOrder::YearMonthDay),
            (
                r"^(\d{4})-(\d{1,2})-(\d{1,2})T\d{2}:\d{2}:\d{2}(?:\.\d{3})?Z?$",
                FieldOrder::YearMonthDay,
            ),
            (r"^(\d{4})年(\d{1,2})月(\d{1,2})日$", FieldOrder::YearMonthDay),
            (r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$", FieldOrder::DayMonthYear),
            (r"^(\d{4})\.(\d{1,2})\.(\d{1,2})$", FieldOrder::YearMonthDay),
        ]
        .into_iter()
        .map(|(pattern, order)| DatePattern {
            regex: Regex::new(pattern).expect("date pattern compiles"),
            order,
        })
        .collect()
    })
}

/// Returns the calendar date a cell denotes, or `None` when it is not a date.
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty => None,
        CellValue::Number(serial) => serial_to_date(*serial),
        CellValue::Text(text) => parse_date_str(text),
    }
}

/// Converts a spreadsheet serial day count to a date.
///
/// Fractional days are the time of day and do not move the date. The date
/// is taken in UTC so the result does not depend on the host timezone.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let millis = ((serial - UNIX_EPOCH_SERIAL) * MILLIS_PER_DAY).round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.date_naive())
}

/// Converts a timestamp back to a fractional serial day count.
pub fn datetime_to_serial(value: NaiveDateTime) -> f64 {
    value.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_SERIAL
}

pub fn parse_date_str(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for pattern in date_patterns() {
        let Some(caps) = pattern.regex.captures(trimmed) else {
            continue;
        };
        let fields = (
            caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()),
            caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()),
            caps.get(3).and_then(|m| m.as_str().parse::<u32>().ok()),
        );
        let (Some(first), Some(month), Some(last)) = fields else {
            continue;
        };
        let (year, day) = match pattern.order {
            FieldOrder::YearMonthDay => (first, last),
            FieldOrder::DayMonthYear => (last, first),
        };
        if let Some(date) = i32::try_from(year)
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        {
            return Some(date);
        }
    }
    parse_date_fallback(trimmed)
}

fn parse_date_fallback(value: &str) -> Option<NaiveDate> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.date_naive());
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed.date());
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    None
}
