//! Dimension Builder: fixed column projections of cleaned entity tables.

use std::collections::BTreeMap;
use std::time::Instant;

use hdw_common::has_column;
use hdw_model::{DimensionSpec, Entity, TableReport, schema_for};
use polars::prelude::DataFrame;
use tracing::{debug, info_span, warn};

use crate::error::{Result, TransformError};
use crate::frame::TableFrame;

/// Projects a cleaned table onto the dimension's columns, in order.
///
/// No renaming and no derivation. Fails with [`TransformError::SchemaDrift`]
/// listing every absent source column.
pub fn project_dimension(spec: &DimensionSpec, df: &DataFrame) -> Result<DataFrame> {
    let missing: Vec<String> = spec
        .columns
        .iter()
        .filter(|column| !has_column(df, column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TransformError::SchemaDrift {
            table: spec.name.to_string(),
            missing,
        });
    }
    Ok(df.select(spec.columns.iter().copied())?)
}

/// Built dimensions plus a report per attempted table.
#[derive(Debug, Default)]
pub struct DimensionSet {
    pub tables: BTreeMap<Entity, TableFrame>,
    pub reports: Vec<TableReport>,
}

impl DimensionSet {
    pub fn get(&self, entity: Entity) -> Option<&DataFrame> {
        self.tables.get(&entity).map(|frame| &frame.data)
    }
}

/// Builds one dimension per non-fact entity.
///
/// A failing dimension is reported and skipped; the others are still built.
/// An entity without a cleaned table is reported as missing input.
pub fn build_dimensions(cleaned: &BTreeMap<Entity, DataFrame>) -> DimensionSet {
    let mut set = DimensionSet::default();
    for entity in Entity::ALL {
        let Some(spec) = schema_for(entity).dimension else {
            continue;
        };
        let span = info_span!("build_dimension", table = spec.name);
        let _guard = span.enter();
        let start = Instant::now();
        let Some(df) = cleaned.get(&entity) else {
            warn!(table = spec.name, entity = %entity, "no cleaned table, dimension skipped");
            set.reports.push(TableReport::failed(
                spec.name,
                format!("no cleaned {entity} table"),
            ));
            continue;
        };
        match project_dimension(&spec, df) {
            Ok(data) => {
                debug!(
                    table = spec.name,
                    rows = data.height(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "dimension built"
                );
                set.reports.push(TableReport::written(spec.name, data.height()));
                set.tables.insert(entity, TableFrame::new(spec.name, data));
            }
            Err(err) => {
                warn!(table = spec.name, entity = %entity, error = %err, "dimension skipped");
                set.reports.push(TableReport::failed(spec.name, err.to_string()));
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, IntoColumn, NamedFrom, Series};

    fn diagnoses() -> DataFrame {
        let cols: Vec<Column> = vec![
            Series::new("diagnosis_code".into(), vec!["I10", "E11"]).into_column(),
            Series::new("extra".into(), vec!["a", "b"]).into_column(),
            Series::new("diagnosis_id".into(), vec![1i64, 2]).into_column(),
            Series::new("diagnosis_name".into(), vec!["Hypertension", "Diabetes"]).into_column(),
        ];
        DataFrame::new(cols).unwrap()
    }

    #[test]
    fn projects_in_dimension_order() {
        let spec = schema_for(Entity::Diagnosis).dimension.unwrap();
        let dim = project_dimension(&spec, &diagnoses()).unwrap();
        let names: Vec<String> = dim
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, vec!["diagnosis_id", "diagnosis_name", "diagnosis_code"]);
        assert_eq!(dim.height(), 2);
    }

    #[test]
    fn missing_columns_are_schema_drift() {
        let spec = schema_for(Entity::Department).dimension.unwrap();
        let err = project_dimension(&spec, &diagnoses()).unwrap_err();
        match err {
            TransformError::SchemaDrift { table, missing } => {
                assert_eq!(table, "dim_departments");
                assert_eq!(missing.len(), 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
