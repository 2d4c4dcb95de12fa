//! Star-schema transform: dimension tables and the visits fact table.
//!
//! Works on cleaned entity tables, whether freshly cleaned in memory or read
//! back from the cleaned CSV files. Nothing here touches the filesystem.

pub mod dimension;
pub mod error;
pub mod fact;
pub mod frame;

use std::collections::BTreeMap;

use hdw_model::{Entity, FACT_TABLE, OutcomeStatus, TableReport, TransformOptions};
use polars::prelude::DataFrame;
use tracing::{info, warn};

pub use dimension::{DimensionSet, build_dimensions, project_dimension};
pub use error::{Result, TransformError};
pub use fact::{FactDimensions, FactOutcome, derive_date_id, resolve_fact};
pub use frame::TableFrame;

/// Tables produced by one transform run, with a report per attempted table.
///
/// `tables` only holds tables that were built; failures appear in `reports`.
#[derive(Debug, Default)]
pub struct TransformOutput {
    pub tables: Vec<TableFrame>,
    pub reports: Vec<TableReport>,
}

impl TransformOutput {
    pub fn failed_tables(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.status == OutcomeStatus::Failed)
            .count()
    }
}

/// Builds every dimension, then resolves the fact table against them.
///
/// A failed dimension does not stop the others. The fact table is only
/// attempted when cleaned visits exist and the dimensions it joins were built.
pub fn transform(
    cleaned: &BTreeMap<Entity, DataFrame>,
    options: TransformOptions,
) -> TransformOutput {
    let mut dims = build_dimensions(cleaned);
    let mut reports = std::mem::take(&mut dims.reports);

    let fact = match cleaned.get(&Entity::Visit) {
        None => Err(format!("no cleaned {} table", Entity::Visit)),
        Some(visits) => FactDimensions::from_set(&dims)
            .and_then(|joined| resolve_fact(visits, joined, options))
            .map_err(|err| err.to_string()),
    };
    let mut output = TransformOutput {
        tables: dims.tables.into_values().collect(),
        reports: Vec::new(),
    };
    match fact {
        Ok(outcome) => {
            let mut report = TableReport::written(FACT_TABLE, outcome.data.height());
            report.orphans = outcome.orphans;
            report.rows_dropped = outcome.rows_dropped;
            reports.push(report);
            output.tables.push(TableFrame::new(FACT_TABLE, outcome.data));
        }
        Err(message) => {
            warn!(table = FACT_TABLE, error = %message, "fact table not built");
            reports.push(TableReport::failed(FACT_TABLE, message));
        }
    }
    output.reports = reports;

    info!(
        tables = output.tables.len(),
        failed = output.failed_tables(),
        "transform finished"
    );
    output
}
