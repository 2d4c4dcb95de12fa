//! Best-effort typing of normalized cells with tagged default policies.
//!
//! A cell that fails to parse never fails its row: it becomes whatever the
//! column's [`DefaultPolicy`] resolves to.

use hdw_common::{
    f64_column, format_numeric, parse_f64, parse_i64, set_f64_column, set_i64_column,
    set_text_column, text_column,
};
use hdw_model::{CleanReport, ColumnKind, ColumnSpec, FillValue, ResolvedDefault};
use polars::prelude::{DataFrame, PolarsResult};
use tracing::warn;

use crate::dates::{format_iso, parse_date};

/// A typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            CellValue::Text(_) => None,
        }
    }
}

/// Outcome of coercing one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// The raw value parsed.
    Value(CellValue),
    /// The raw value was missing or invalid and the policy supplied one.
    Default(CellValue),
    Missing,
    /// The policy removes the row.
    Dropped,
}

impl Coerced {
    pub fn value(&self) -> Option<&CellValue> {
        match self {
            Coerced::Value(value) | Coerced::Default(value) => Some(value),
            Coerced::Missing | Coerced::Dropped => None,
        }
    }
}

fn round_half_away(value: f64) -> f64 {
    // f64::round rounds ties away from zero.
    value.round()
}

fn clip(spec: &ColumnSpec, value: f64) -> f64 {
    match spec.bounds {
        Some(bounds) => bounds.clip(value),
        None => value,
    }
}

fn to_int(spec: &ColumnSpec, value: f64) -> Option<i64> {
    let clipped = clip(spec, round_half_away(value));
    if clipped.is_finite() && clipped.abs() < 9.0e15 {
        Some(clipped as i64)
    } else {
        None
    }
}

/// Parses a normalized cell into the column's type, without applying defaults.
pub fn parse_cell(raw: &str, spec: &ColumnSpec) -> Option<CellValue> {
    match spec.kind {
        ColumnKind::Integer => {
            if spec.rounding {
                parse_f64(raw).and_then(|v| to_int(spec, v)).map(CellValue::Int)
            } else {
                parse_i64(raw)
                    .and_then(|v| to_int(spec, v as f64))
                    .map(CellValue::Int)
            }
        }
        ColumnKind::Decimal => parse_f64(raw).map(|v| CellValue::Float(clip(spec, v))),
        ColumnKind::Date => parse_date(raw).map(|date| CellValue::Text(format_iso(date))),
        ColumnKind::Category(set) => set
            .canonical(raw)
            .map(|value| CellValue::Text(value.to_string())),
        ColumnKind::Text => Some(CellValue::Text(raw.to_string())),
    }
}

fn fill_value(spec: &ColumnSpec, fill: FillValue) -> Option<CellValue> {
    match (spec.kind, fill) {
        (ColumnKind::Integer, FillValue::Int(v)) => to_int(spec, v as f64).map(CellValue::Int),
        (ColumnKind::Integer, FillValue::Float(v)) => to_int(spec, v).map(CellValue::Int),
        (ColumnKind::Decimal, FillValue::Int(v)) => Some(CellValue::Float(clip(spec, v as f64))),
        (ColumnKind::Decimal, FillValue::Float(v)) => Some(CellValue::Float(clip(spec, v))),
        (_, FillValue::Text(text)) => Some(CellValue::Text(text.to_string())),
        (_, FillValue::Int(v)) => Some(CellValue::Text(v.to_string())),
        (_, FillValue::Float(v)) => Some(CellValue::Text(format_numeric(v))),
    }
}

/// Coerces one normalized cell under an already resolved default.
pub fn coerce(raw: Option<&str>, spec: &ColumnSpec, resolved: ResolvedDefault) -> Coerced {
    if let Some(value) = raw.and_then(|raw| parse_cell(raw, spec)) {
        return Coerced::Value(value);
    }
    match resolved {
        ResolvedDefault::Fill(fill) => match fill_value(spec, fill) {
            Some(value) => Coerced::Default(value),
            None => Coerced::Missing,
        },
        ResolvedDefault::Drop => Coerced::Dropped,
        ResolvedDefault::Missing | ResolvedDefault::Unresolved => Coerced::Missing,
    }
}

/// Coerces a whole column in place and records defaults in `report`.
///
/// Returns the keep-mask for rows; `false` marks rows dropped by the policy.
pub fn coerce_column(
    df: &mut DataFrame,
    spec: &ColumnSpec,
    report: &mut CleanReport,
) -> PolarsResult<Vec<bool>> {
    let raw = text_column(df, spec.name)?;
    let observed: Vec<f64> = raw
        .iter()
        .flatten()
        .filter_map(|value| parse_cell(value, spec))
        .filter_map(|value| value.as_f64())
        .collect();
    let resolved = spec.policy.resolve(&observed);

    let mut keep = Vec::with_capacity(raw.len());
    let mut outputs = Vec::with_capacity(raw.len());
    let mut defaults = 0usize;
    let mut unresolved = 0usize;
    for value in &raw {
        let coerced = coerce(value.as_deref(), spec, resolved);
        match &coerced {
            Coerced::Default(_) => defaults += 1,
            Coerced::Missing if resolved == ResolvedDefault::Unresolved => unresolved += 1,
            _ => {}
        }
        keep.push(coerced != Coerced::Dropped);
        outputs.push(coerced.value().cloned());
    }
    report.record_defaults(spec.name, defaults);
    if unresolved > 0 {
        warn!(
            entity = %report.entity,
            column = spec.name,
            unresolved,
            "no valid observations to compute {} default",
            spec.policy.label()
        );
        report.warn(format!(
            "{}: {} value(s) left missing, no valid observations for {} default",
            spec.name,
            unresolved,
            spec.policy.label()
        ));
    }
    write_column(df, spec, outputs)?;
    Ok(keep)
}

fn write_column(
    df: &mut DataFrame,
    spec: &ColumnSpec,
    values: Vec<Option<CellValue>>,
) -> PolarsResult<()> {
    match spec.kind {
        ColumnKind::Integer => {
            let ints = values
                .into_iter()
                .map(|value| match value {
                    Some(CellValue::Int(v)) => Some(v),
                    _ => None,
                })
                .collect();
            set_i64_column(df, spec.name, ints)
        }
        ColumnKind::Decimal => {
            let floats = values
                .into_iter()
                .map(|value| value.and_then(|v| v.as_f64()))
                .collect();
            set_f64_column(df, spec.name, floats)
        }
        ColumnKind::Text | ColumnKind::Date | ColumnKind::Category(_) => {
            let texts = values
                .into_iter()
                .map(|value| match value {
                    Some(CellValue::Text(text)) => Some(text),
                    _ => None,
                })
                .collect();
            set_text_column(df, spec.name, texts)
        }
    }
}

/// Clips every present value of a numeric column to `spec`'s bounds.
pub fn clip_column(df: &mut DataFrame, spec: &ColumnSpec) -> PolarsResult<()> {
    let Some(bounds) = spec.bounds else {
        return Ok(());
    };
    let values = f64_column(df, spec.name)?
        .into_iter()
        .map(|value| value.map(|v| bounds.clip(v)))
        .collect();
    set_f64_column(df, spec.name, values)
}
