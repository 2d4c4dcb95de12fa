//! Column-level read/write helpers over Polars `DataFrame`s.
//!
//! Cleaning rules work on whole columns: read a column into a `Vec`, rewrite
//! the values, and put the column back under the same name.

use polars::prelude::{
    AnyValue, BooleanChunked, DataFrame, NamedFrom, NewChunkedArray, PolarsResult, Series,
};

use crate::cells::{any_to_f64, any_to_i64, any_to_text};

/// Separator used when building composite row keys.
const KEY_SEPARATOR: char = '\u{1f}';
/// Placeholder for null cells inside composite row keys.
const NULL_KEY: &str = "\u{0}";

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Names of the columns in `df`, in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Reads a column as optional text, keeping nulls as `None`.
pub fn text_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_text(column.get(idx).unwrap_or(AnyValue::Null)));
    }
    Ok(values)
}

pub fn f64_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_f64(column.get(idx).unwrap_or(AnyValue::Null)));
    }
    Ok(values)
}

pub fn i64_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_i64(column.get(idx).unwrap_or(AnyValue::Null)));
    }
    Ok(values)
}

/// Text value of a single cell, `None` when the column is absent or the cell is null.
pub fn cell_text(df: &DataFrame, name: &str, idx: usize) -> Option<String> {
    let column = df.column(name).ok()?;
    any_to_text(column.get(idx).ok()?)
}

pub fn set_text_column(df: &mut DataFrame, name: &str, values: Vec<Option<String>>) -> PolarsResult<()> {
    let series = Series::new(name.into(), values);
    df.with_column(series)?;
    Ok(())
}

pub fn set_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> PolarsResult<()> {
    let series = Series::new(name.into(), values);
    df.with_column(series)?;
    Ok(())
}

pub fn set_i64_column(df: &mut DataFrame, name: &str, values: Vec<Option<i64>>) -> PolarsResult<()> {
    let series = Series::new(name.into(), values);
    df.with_column(series)?;
    Ok(())
}

/// Keeps the rows whose mask entry is `true`.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    df.filter(&mask)
}

/// Builds a composite key for row `idx` over `columns`.
///
/// Null cells get a dedicated marker so that a null and an empty string never
/// collide. Columns absent from the frame contribute a null marker.
pub fn row_key(df: &DataFrame, idx: usize, columns: &[String]) -> String {
    let mut key = String::new();
    for (pos, name) in columns.iter().enumerate() {
        if pos > 0 {
            key.push(KEY_SEPARATOR);
        }
        match cell_text(df, name, idx) {
            Some(value) => key.push_str(&value),
            None => key.push_str(NULL_KEY),
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, IntoColumn};

    fn frame() -> DataFrame {
        let cols: Vec<Column> = vec![
            Series::new("id".into(), vec![Some(1i64), None, Some(3)]).into_column(),
            Series::new(
                "name".into(),
                vec![Some("a".to_string()), Some(String::new()), None],
            )
            .into_column(),
        ];
        DataFrame::new(cols).unwrap()
    }

    #[test]
    fn reads_text_and_numbers() {
        let df = frame();
        assert_eq!(
            text_column(&df, "id").unwrap(),
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
        assert_eq!(i64_column(&df, "id").unwrap(), vec![Some(1), None, Some(3)]);
        assert!(text_column(&df, "missing").is_err());
    }

    #[test]
    fn row_key_distinguishes_null_from_empty() {
        let df = frame();
        let cols = vec!["name".to_string()];
        assert_ne!(row_key(&df, 1, &cols), row_key(&df, 2, &cols));
    }

    #[test]
    fn filter_keeps_masked_rows() {
        let df = frame();
        let filtered = filter_rows(&df, &[true, false, true]).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(i64_column(&filtered, "id").unwrap(), vec![Some(1), Some(3)]);
    }

    #[test]
    fn set_column_replaces_in_place() {
        let mut df = frame();
        set_f64_column(&mut df, "id", vec![Some(0.5), Some(1.0), None]).unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(f64_column(&df, "id").unwrap(), vec![Some(0.5), Some(1.0), None]);
    }
}
