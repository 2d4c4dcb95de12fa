//! Polars `AnyValue` conversions.
//!
//! Raw extracts arrive as text and cleaned tables carry typed columns, so every
//! stage reads cells through these helpers instead of matching on dtypes.

use polars::prelude::AnyValue;

/// Spellings of "no value" found in raw extracts. Compared after trimming.
pub const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NULL", "null", "None", "-"];

/// Returns true when `value` is blank or one of [`NULL_TOKENS`].
pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_TOKENS.contains(&trimmed)
}

/// Converts a cell to its text form, or `None` for a null cell.
///
/// Floats are rendered without trailing zeros so that `3.0` and `3` compare
/// equal when used as join or deduplication keys.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use hdw_common::any_to_text;
///
/// assert_eq!(any_to_text(AnyValue::Null), None);
/// assert_eq!(any_to_text(AnyValue::Int64(42)), Some("42".to_string()));
/// assert_eq!(any_to_text(AnyValue::Float64(2.50)), Some("2.5".to_string()));
/// assert_eq!(any_to_text(AnyValue::String("I10")), Some("I10".to_string()));
/// ```
pub fn any_to_text(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(v.to_string()),
        AnyValue::Int16(v) => Some(v.to_string()),
        AnyValue::Int32(v) => Some(v.to_string()),
        AnyValue::Int64(v) => Some(v.to_string()),
        AnyValue::UInt8(v) => Some(v.to_string()),
        AnyValue::UInt16(v) => Some(v.to_string()),
        AnyValue::UInt32(v) => Some(v.to_string()),
        AnyValue::UInt64(v) => Some(v.to_string()),
        AnyValue::Float32(v) => Some(format_numeric(f64::from(v))),
        AnyValue::Float64(v) => Some(format_numeric(v)),
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Boolean(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Converts a cell to text, mapping null to an empty string.
pub fn any_to_string(value: AnyValue<'_>) -> String {
    any_to_text(value).unwrap_or_default()
}

/// Formats a floating-point number without trailing zeros.
///
/// # Examples
///
/// ```
/// use hdw_common::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(1250000.5), "1250000.5");
/// assert_eq!(format_numeric(0.0), "0");
/// assert_eq!(format_numeric(-0.0), "0");
/// ```
pub fn format_numeric(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let s = format!("{v}");
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Converts a cell to `f64`. Text cells are parsed; non-finite values are rejected.
pub fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(f64::from(v)),
        AnyValue::Int16(v) => Some(f64::from(v)),
        AnyValue::Int32(v) => Some(f64::from(v)),
        AnyValue::Int64(v) => Some(v as f64),
        AnyValue::UInt8(v) => Some(f64::from(v)),
        AnyValue::UInt16(v) => Some(f64::from(v)),
        AnyValue::UInt32(v) => Some(f64::from(v)),
        AnyValue::UInt64(v) => Some(v as f64),
        AnyValue::Float32(v) => Some(f64::from(v)).filter(|v| v.is_finite()),
        AnyValue::Float64(v) => Some(v).filter(|v| v.is_finite()),
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(&s),
        _ => None,
    }
}

/// Converts a cell to `i64`.
///
/// Floats and numeric text are accepted only when they hold a whole number,
/// so `"7.0"` becomes `7` while `"7.5"` is rejected.
pub fn any_to_i64(value: AnyValue<'_>) -> Option<i64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(i64::from(v)),
        AnyValue::Int16(v) => Some(i64::from(v)),
        AnyValue::Int32(v) => Some(i64::from(v)),
        AnyValue::Int64(v) => Some(v),
        AnyValue::UInt8(v) => Some(i64::from(v)),
        AnyValue::UInt16(v) => Some(i64::from(v)),
        AnyValue::UInt32(v) => Some(i64::from(v)),
        AnyValue::UInt64(v) => i64::try_from(v).ok(),
        AnyValue::Float32(v) => whole_number(f64::from(v)),
        AnyValue::Float64(v) => whole_number(v),
        AnyValue::String(s) => parse_i64(s),
        AnyValue::StringOwned(s) => parse_i64(&s),
        _ => None,
    }
}

/// Parses a string as a finite `f64`, returning `None` for blank or invalid input.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a string as `i64`, accepting whole-number decimals such as `"12.0"`.
pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| parse_f64(trimmed).and_then(whole_number))
}

fn whole_number(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(v as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_to_text_null() {
        assert_eq!(any_to_text(AnyValue::Null), None);
        assert_eq!(any_to_string(AnyValue::Null), "");
    }

    #[test]
    fn test_any_to_text_floats() {
        assert_eq!(any_to_text(AnyValue::Float64(1.5)), Some("1.5".into()));
        assert_eq!(any_to_text(AnyValue::Float64(300000.0)), Some("300000".into()));
    }

    #[test]
    fn test_format_numeric_integers_keep_zeros() {
        assert_eq!(format_numeric(100.0), "100");
        assert_eq!(format_numeric(-500.0), "-500");
        assert_eq!(format_numeric(0.25), "0.25");
    }

    #[test]
    fn test_any_to_f64() {
        assert_eq!(any_to_f64(AnyValue::Int64(3)), Some(3.0));
        assert_eq!(any_to_f64(AnyValue::String(" -500 ")), Some(-500.0));
        assert_eq!(any_to_f64(AnyValue::String("abc")), None);
        assert_eq!(any_to_f64(AnyValue::String("NaN")), None);
        assert_eq!(any_to_f64(AnyValue::String("inf")), None);
        assert_eq!(any_to_f64(AnyValue::Float64(f64::NAN)), None);
    }

    #[test]
    fn test_any_to_i64() {
        assert_eq!(any_to_i64(AnyValue::String("12")), Some(12));
        assert_eq!(any_to_i64(AnyValue::String("12.0")), Some(12));
        assert_eq!(any_to_i64(AnyValue::String("12.5")), None);
        assert_eq!(any_to_i64(AnyValue::Float64(4.0)), Some(4));
        assert_eq!(any_to_i64(AnyValue::Null), None);
    }

    #[test]
    fn test_null_tokens() {
        for token in ["", " ", "NA", " N/A ", "NULL", "null", "None", "-"] {
            assert!(is_null_token(token), "{token:?}");
        }
        assert!(!is_null_token("none"));
        assert!(!is_null_token("0"));
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(parse_f64("   "), None);
        assert_eq!(parse_i64(""), None);
    }
}
