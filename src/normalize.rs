//! Text cleanup and tolerant value coercion.
//!
//! Shared by the transformer for review bodies, replies, names and the
//! numeric and date fields of raw reviews.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// Maximum number of characters kept from a cleaned text
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Clean a free-text value.
///
/// Applies NFKC normalization, trims, collapses every whitespace run to a
/// single space and truncates to `max_length` characters. Returns `None` for
/// missing input and for text without any ASCII letter or digit.
#[must_use]
pub fn clean_text(text: Option<&str>, max_length: usize) -> Option<String> {
    let text = text?;
    if text.is_empty() {
        return None;
    }

    let normalized = text.nfkc().collect::<String>();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    if !collapsed.chars().any(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(truncate_chars(&collapsed, max_length))
}

/// Keep at most `max` characters of `text`.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Coerce a JSON value to a float, falling back to `0.0`.
#[must_use]
pub fn to_float(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

/// Coerce a JSON value to an integer, falling back to `0`.
///
/// Floats are truncated toward zero; strings must hold an integer literal.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Reduce an ISO-8601 timestamp to its calendar day (`YYYY-MM-DD`).
///
/// The day is taken in the timestamp's own offset. Invalid or missing input
/// yields `None`.
#[must_use]
pub fn format_date(date: Option<&str>) -> Option<String> {
    let date = date?.trim();
    if date.is_empty() {
        return None;
    }

    let day = DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d"))
        .ok()?;

    Some(day.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(
            clean_text(Some("  Très   bien\n\tlivré  "), MAX_TEXT_LENGTH).as_deref(),
            Some("Très bien livré")
        );
    }

    #[test]
    fn test_clean_text_rejects_symbol_only() {
        assert_eq!(clean_text(Some("!!! ... ???"), MAX_TEXT_LENGTH), None);
        assert_eq!(clean_text(Some(""), MAX_TEXT_LENGTH), None);
        assert_eq!(clean_text(None, MAX_TEXT_LENGTH), None);
    }

    #[test]
    fn test_clean_text_nfkc() {
        // Full-width letters fold to ASCII under NFKC.
        assert_eq!(clean_text(Some("ＯＫ"), MAX_TEXT_LENGTH).as_deref(), Some("OK"));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("éèàù", 2), "éè");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_coercions() {
        assert_eq!(to_float(Some(&json!(4))), 4.0);
        assert_eq!(to_float(Some(&json!("4.5"))), 4.5);
        assert_eq!(to_float(Some(&json!("n/a"))), 0.0);
        assert_eq!(to_float(None), 0.0);
        assert_eq!(to_int(Some(&json!(1234))), 1234);
        assert_eq!(to_int(Some(&json!(12.9))), 12);
        assert_eq!(to_int(Some(&json!("42"))), 42);
        assert_eq!(to_int(Some(&json!("4.2"))), 0);
        assert_eq!(to_int(Some(&Value::Null)), 0);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(Some("2024-05-17T21:13:45.000Z")).as_deref(), Some("2024-05-17"));
        assert_eq!(format_date(Some("2024-05-17T23:30:00+02:00")).as_deref(), Some("2024-05-17"));
        assert_eq!(format_date(Some("2024-05-17")).as_deref(), Some("2024-05-17"));
        assert_eq!(format_date(Some("yesterday")), None);
        assert_eq!(format_date(None), None);
    }
}
