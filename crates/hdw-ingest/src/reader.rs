//! CSV loading into text-typed Polars frames.
//!
//! Every column is read as `String`; typing happens in the cleaners, where a
//! value that fails to parse has a defined default instead of failing the read.

use std::collections::HashSet;
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Trims a header cell, strips a byte-order mark and collapses inner whitespace.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Makes header names unique by suffixing repeats with `.1`, `.2`, ...
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            header
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

/// Builds a frame of nullable text columns.
pub fn text_frame(headers: &[String], rows: &[Vec<Option<String>>]) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let values: Vec<Option<String>> = rows
            .iter()
            .map(|row| row.get(idx).cloned().flatten())
            .collect();
        columns.push(Series::new(header.as_str().into(), values).into_column());
    }
    Ok(DataFrame::new(columns)?)
}

/// Reads a CSV file into a frame of text columns.
///
/// The first non-blank record is the header. Empty cells become nulls; other
/// cells are kept verbatim. Short rows are padded with nulls and surplus
/// cells are ignored. A file without a header row is [`IngestError::EmptyInput`];
/// a header with no data rows yields an empty frame.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(IngestError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut ragged = 0usize;
    for record in reader.records() {
        let record = record.map_err(|err| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let Some(header) = headers.as_ref() else {
            headers = Some(unique_headers(
                record.iter().map(normalize_header).collect(),
            ));
            continue;
        };
        if record.len() != header.len() {
            ragged += 1;
        }
        let row = (0..header.len())
            .map(|idx| {
                record
                    .get(idx)
                    .map(|value| value.trim_start_matches('\u{feff}'))
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            })
            .collect();
        rows.push(row);
    }

    let Some(headers) = headers else {
        return Err(IngestError::EmptyInput {
            path: path.to_path_buf(),
        });
    };
    if ragged > 0 {
        warn!(path = %path.display(), ragged, "rows with unexpected field count");
    }
    debug!(
        path = %path.display(),
        rows = rows.len(),
        columns = headers.len(),
        "read csv"
    );
    text_frame(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_header("\u{feff} patient_id "), "patient_id");
        assert_eq!(normalize_header("total   cost"), "total cost");
    }

    #[test]
    fn repeats_get_suffixes() {
        let headers = unique_headers(vec![
            "age".to_string(),
            "age".to_string(),
            String::new(),
            "age".to_string(),
        ]);
        assert_eq!(headers, vec!["age", "age.1", "column_3", "age.2"]);
    }
}
