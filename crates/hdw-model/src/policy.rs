//! Default policies applied when a typed cell is missing or fails to parse.

use std::fmt;

/// Literal value substituted by [`DefaultPolicy::ConstantFill`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillValue {
    Int(i64),
    Float(f64),
    Text(&'static str),
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillValue::Int(value) => write!(f, "{value}"),
            FillValue::Float(value) => write!(f, "{value}"),
            FillValue::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

/// What to do with a cell whose value is missing or could not be coerced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultPolicy {
    /// Median of the column's valid observations.
    MedianFill,
    ZeroFill,
    ConstantFill(FillValue),
    /// Remove the whole row.
    DropRow,
    KeepMissing,
}

impl DefaultPolicy {
    /// Turns the policy into a concrete fill for one column.
    ///
    /// `observed` holds the values that coerced successfully. A median over no
    /// observations cannot be computed and resolves to [`ResolvedDefault::Unresolved`].
    pub fn resolve(&self, observed: &[f64]) -> ResolvedDefault {
        match self {
            DefaultPolicy::MedianFill => match median(observed) {
                Some(value) => ResolvedDefault::Fill(FillValue::Float(value)),
                None => ResolvedDefault::Unresolved,
            },
            DefaultPolicy::ZeroFill => ResolvedDefault::Fill(FillValue::Int(0)),
            DefaultPolicy::ConstantFill(value) => ResolvedDefault::Fill(*value),
            DefaultPolicy::DropRow => ResolvedDefault::Drop,
            DefaultPolicy::KeepMissing => ResolvedDefault::Missing,
        }
    }

    pub fn label(&self) -> String {
        match self {
            DefaultPolicy::MedianFill => "median".to_string(),
            DefaultPolicy::ZeroFill => "zero".to_string(),
            DefaultPolicy::ConstantFill(value) => format!("constant {value}"),
            DefaultPolicy::DropRow => "drop row".to_string(),
            DefaultPolicy::KeepMissing => "keep missing".to_string(),
        }
    }
}

/// A [`DefaultPolicy`] bound to the data of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedDefault {
    Fill(FillValue),
    Drop,
    Missing,
    /// The policy needed observations that were not there; cells stay missing.
    Unresolved,
}

/// Median of `values`, averaging the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
