//! Field Normalizer: missing-value standardization and text casing rules.
//!
//! Entity-agnostic. Absent columns are skipped and returned to the caller so
//! the cleaner can record them.

use hdw_common::{column_names, has_column, is_null_token, set_text_column, text_column};
use hdw_model::TextRule;
use polars::prelude::{DataFrame, PolarsResult};
use tracing::warn;

/// Title-cases `value`: the first letter of every alphabetic run is upper-cased
/// and the rest lower-cased (`"on leave"` becomes `"On Leave"`).
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

pub fn upper_case(value: &str) -> String {
    value.to_uppercase()
}

pub fn apply_text_rule(value: &str, rule: TextRule) -> String {
    match rule {
        TextRule::Keep => value.to_string(),
        TextRule::Trim => value.trim().to_string(),
        TextRule::TitleCase => title_case(value.trim()),
        TextRule::UpperCase => upper_case(value.trim()),
    }
}

/// Normalizes one cell: null tokens become `None`, everything else goes
/// through `rule`.
pub fn normalize_value(value: Option<&str>, rule: TextRule) -> Option<String> {
    let value = value?;
    if is_null_token(value) {
        return None;
    }
    Some(apply_text_rule(value, rule))
}

/// Replaces null tokens with nulls in `columns`.
///
/// Returns the names of the requested columns that are not in the frame.
pub fn standardize_missing(df: &mut DataFrame, columns: &[&str]) -> PolarsResult<Vec<String>> {
    normalize_columns(df, columns.iter().map(|name| (*name, TextRule::Keep)))
}

/// Applies null-token replacement and a text rule to each `(column, rule)`.
///
/// Returns the names of the requested columns that are not in the frame.
pub fn normalize_columns<'a>(
    df: &mut DataFrame,
    columns: impl IntoIterator<Item = (&'a str, TextRule)>,
) -> PolarsResult<Vec<String>> {
    let mut skipped = Vec::new();
    for (name, rule) in columns {
        if !has_column(df, name) {
            skipped.push(name.to_string());
            continue;
        }
        let values = text_column(df, name)?
            .into_iter()
            .map(|value| normalize_value(value.as_deref(), rule))
            .collect();
        set_text_column(df, name, values)?;
    }
    Ok(skipped)
}

/// Trims column names. A trimmed name that would collide with another column
/// is left as it was.
pub fn trim_column_names(df: &mut DataFrame) -> PolarsResult<()> {
    let names = column_names(df);
    for name in &names {
        let trimmed = name.trim();
        if trimmed == name {
            continue;
        }
        if has_column(df, trimmed) {
            warn!(column = %name, "trimmed column name collides with an existing column");
            continue;
        }
        df.rename(name, trimmed.into())?;
    }
    Ok(())
}
