//! Locale-aware value parsing.
//!
//! RULE: Nothing in this module fails. Unparseable amounts become 0.0,
//! unparseable dates become `None`, and callers substitute neutral values.

use crate::record::FieldValue;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

// ── Amounts ──────────────────────────────────────────────────────────────────

/// Parse a monetary cell, disambiguating `1.234,56` from `1,234.56`.
pub fn parse_amount(value: Option<&FieldValue>) -> f64 {
    match value {
        Some(FieldValue::Number(n)) if n.is_finite() => *n,
        Some(FieldValue::Text(s)) => parse_amount_str(s),
        _ => 0.0,
    }
}

pub fn parse_amount_str(input: &str) -> f64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let normalized = normalize_separators(trimmed);
    let cleaned: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn normalize_separators(s: &str) -> String {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    match (last_comma, last_dot) {
        // Both present: whichever comes last is the decimal separator.
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => normalize_single(s, ','),
        (None, Some(_)) => normalize_single(s, '.'),
        (None, None) => s.to_string(),
    }
}

/// Only one kind of separator present: repeated separators or a single one
/// followed by exactly three digits mean thousands grouping.
fn normalize_single(s: &str, sep: char) -> String {
    let occurrences = s.matches(sep).count();
    if occurrences > 1 {
        return s.replace(sep, "");
    }

    let after = s.rsplit(sep).next().unwrap_or("");
    let trailing_digits = after.chars().filter(|c| c.is_ascii_digit()).count();
    if trailing_digits == 3 {
        s.replace(sep, "")
    } else {
        s.replace(sep, ".")
    }
}

// ── Digits ───────────────────────────────────────────────────────────────────

/// First and second significant digits of a positive value.
/// The second digit is 0 when the value has a single significant digit.
pub fn significant_digits(value: f64) -> Option<(u8, u8)> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    // `{:e}` renders the shortest round-trip mantissa, e.g. "1.2345e3".
    let rendered = format!("{value:e}");
    let mut mantissa = rendered.split('e').next()?.chars().filter(|c| c.is_ascii_digit());
    let first = mantissa.next()?.to_digit(10)? as u8;
    let second = mantissa.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as u8;
    if first == 0 {
        return None;
    }
    Some((first, second))
}

pub fn leading_digit(value: f64) -> Option<u8> {
    significant_digits(value.abs()).map(|(first, _)| first)
}

/// Numeric part of a sequential identifier: every digit, in order.
/// `INV-000123` → 123.
pub fn extract_sequence_number(id: &str) -> Option<u64> {
    let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

// ── Dates ────────────────────────────────────────────────────────────────────

/// A parsed date cell. `has_time` is false for date-only inputs,
/// in which case the hour of day is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub datetime: NaiveDateTime,
    pub has_time: bool,
}

impl ParsedDate {
    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    pub fn hour(&self) -> Option<u32> {
        self.has_time.then(|| self.datetime.hour())
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.datetime.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Day of week with Sunday = 0.
    pub fn weekday_index(&self) -> u32 {
        self.datetime.weekday().num_days_from_sunday()
    }

    /// Fractional days elapsed since `earlier`.
    pub fn days_since(&self, earlier: &ParsedDate) -> f64 {
        (self.datetime - earlier.datetime).num_seconds() as f64 / 86_400.0
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Largest spreadsheet serial accepted (31 Dec 9999).
const MAX_SERIAL_DATE: f64 = 2_958_465.0;

pub fn parse_date(value: Option<&FieldValue>) -> Option<ParsedDate> {
    match value? {
        FieldValue::Text(s) => parse_date_str(s),
        FieldValue::Number(n) => parse_serial_date(*n),
        _ => None,
    }
}

pub fn parse_date_str(input: &str) -> Option<ParsedDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(ParsedDate { datetime: dt.naive_utc(), has_time: true });
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ParsedDate { datetime, has_time: true });
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(ParsedDate {
                datetime: date.and_time(NaiveTime::MIN),
                has_time: false,
            });
        }
    }

    None
}

/// Spreadsheet serial date: days since 1899-12-30, fraction = time of day.
fn parse_serial_date(serial: f64) -> Option<ParsedDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL_DATE).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let whole_days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    let datetime = epoch
        .checked_add_signed(Duration::days(whole_days))?
        .checked_add_signed(Duration::seconds(seconds))?;
    Some(ParsedDate { datetime, has_time: seconds > 0 })
}
