//! FILENAME: core/grid-model/src/format.rs
//! PURPOSE: Plain-text formatting of cell values.
//! CONTEXT: Used as the fallback value formatter, by clipboard serialization,
//! and by the `size` aggregation's grouped-digit output.

use chrono::DateTime;

use crate::cell::CellValue;

/// Formats any cell value as display text. Absent and null values render empty.
pub fn format_cell_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty | CellValue::Null => String::new(),
        CellValue::Number(n) => format_general(*n),
        CellValue::Text(s) => s.clone(),
        CellValue::Boolean(b) => b.to_string(),
        CellValue::Date(days) => format_date(*days),
        CellValue::DateTime(ms) => format_date_time(*ms),
    }
}

/// Format a number in general format (auto-detect best representation).
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs_value = value.abs();

    if abs_value >= 1e15 || abs_value < 1e-4 {
        return format!("{:e}", value);
    }

    if value.fract() == 0.0 {
        return format!("{:.0}", value);
    }

    let formatted = format!("{:.10}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Formats a number with locale-style digit grouping ("1234567" -> "1,234,567").
pub fn format_grouped(value: f64) -> String {
    add_thousands_separator(&format_general(value))
}

/// Add thousands separators to a plain decimal string.
fn add_thousands_separator(s: &str) -> String {
    if s.contains('e') || s == "NaN" {
        return s.to_string();
    }

    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (s, None),
    };

    let negative = integer_part.starts_with('-');
    let digits: Vec<char> = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    if negative {
        result.push('-');
    }
    let len = digits.len();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}

/// Formats days-since-epoch as `YYYY-MM-DD`.
pub fn format_date(days: i64) -> String {
    match days.checked_mul(86_400).and_then(|secs| DateTime::from_timestamp(secs, 0)) {
        Some(date) => date.date_naive().format("%Y-%m-%d").to_string(),
        None => days.to_string(),
    }
}

/// Formats milliseconds-since-epoch as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_date_time(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(moment) => moment.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}
