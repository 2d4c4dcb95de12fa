//! Data-quality statistics over raw extracts.

use std::collections::HashSet;
use std::path::Path;

use hdw_common::{
    cell_text, column_names, format_numeric, is_null_token, parse_f64, row_key, text_column,
};
use polars::prelude::DataFrame;
use serde::Serialize;

use crate::error::Result;
use crate::reader::read_csv_frame;

const SAMPLE_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    Integer,
    Decimal,
    Text,
    /// Every cell is missing.
    Empty,
}

impl InferredType {
    pub fn label(&self) -> &'static str {
        match self {
            InferredType::Integer => "integer",
            InferredType::Decimal => "decimal",
            InferredType::Text => "text",
            InferredType::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred: InferredType,
    pub missing: usize,
    pub distinct: usize,
}

/// Describe-style summary of a numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; absent for a single observation.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl NumericSummary {
    fn from_values(column: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });
        Some(Self {
            column: column.to_string(),
            count,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            q50: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }

    /// Cells in display order: count, mean, std, min, 25%, 50%, 75%, max.
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.count.to_string(),
            format_stat(self.mean),
            self.std.map(format_stat).unwrap_or_else(|| "-".to_string()),
            format_stat(self.min),
            format_stat(self.q25),
            format_stat(self.q50),
            format_stat(self.q75),
            format_stat(self.max),
        ]
    }
}

fn format_stat(value: f64) -> String {
    format_numeric((value * 1000.0).round() / 1000.0)
}

/// Quantile of sorted values with linear interpolation between ranks.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[derive(Debug, Clone, Serialize)]
pub struct FileProfile {
    pub file_name: String,
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
    pub duplicate_rows: usize,
    pub numeric: Vec<NumericSummary>,
    pub sample: Vec<Vec<String>>,
}

impl FileProfile {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }
}

fn infer_type(values: &[Option<String>]) -> (InferredType, Vec<f64>) {
    let mut numbers = Vec::new();
    let mut seen_value = false;
    let mut all_whole = true;
    for value in values.iter().flatten() {
        if is_null_token(value) {
            continue;
        }
        seen_value = true;
        match parse_f64(value) {
            Some(number) => {
                all_whole &= number.fract() == 0.0;
                numbers.push(number);
            }
            None => return (InferredType::Text, Vec::new()),
        }
    }
    if !seen_value {
        (InferredType::Empty, Vec::new())
    } else if all_whole {
        (InferredType::Integer, numbers)
    } else {
        (InferredType::Decimal, numbers)
    }
}

/// Computes the profile of an already-loaded raw frame.
pub fn profile_frame(file_name: &str, df: &DataFrame) -> Result<FileProfile> {
    let names = column_names(df);
    let mut columns = Vec::with_capacity(names.len());
    let mut numeric = Vec::new();
    for name in &names {
        let values = text_column(df, name)?;
        let missing = values
            .iter()
            .filter(|value| value.as_deref().is_none_or(is_null_token))
            .count();
        let distinct = values
            .iter()
            .flatten()
            .filter(|value| !is_null_token(value))
            .collect::<HashSet<_>>()
            .len();
        let (inferred, numbers) = infer_type(&values);
        if let Some(summary) = NumericSummary::from_values(name, &numbers) {
            numeric.push(summary);
        }
        columns.push(ColumnProfile {
            name: name.clone(),
            inferred,
            missing,
            distinct,
        });
    }

    let mut seen = HashSet::new();
    let mut duplicate_rows = 0;
    for idx in 0..df.height() {
        if !seen.insert(row_key(df, idx, &names)) {
            duplicate_rows += 1;
        }
    }

    let sample = (0..df.height().min(SAMPLE_ROWS))
        .map(|idx| {
            names
                .iter()
                .map(|name| cell_text(df, name, idx).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(FileProfile {
        file_name: file_name.to_string(),
        rows: df.height(),
        columns,
        duplicate_rows,
        numeric,
        sample,
    })
}

/// Reads and profiles one raw CSV file.
pub fn profile_csv(path: &Path) -> Result<FileProfile> {
    let df = read_csv_frame(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    profile_frame(&file_name, &df)
}
