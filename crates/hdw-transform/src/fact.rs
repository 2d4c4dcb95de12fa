//! Fact Resolver: date keys and foreign-key resolution for visits.
//!
//! Visits reference diagnoses by code, doctors by id and departments by name.
//! The resolver swaps those for surrogate keys taken from the dimensions and
//! projects the fact columns. Every lookup uses the first dimension row for a
//! join key.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use hdw_clean::{date_id, parse_date};
use hdw_common::{filter_rows, has_column, i64_column, set_i64_column, text_column};
use hdw_model::{
    Entity, FACT_COLUMNS, FACT_REQUIRED_COLUMNS, FACT_TABLE, OrphanPolicy, TransformOptions,
};
use polars::prelude::{DataFrame, DataType, Series};
use tracing::{debug, info_span, warn};

use crate::dimension::DimensionSet;
use crate::error::{Result, TransformError};

pub const DIAGNOSIS_KEY: &str = "diagnosis_id";
pub const DEPARTMENT_KEY: &str = "department_id";
pub const DATE_KEY: &str = "date_id";

/// Fact table with the orphan accounting of its resolution.
#[derive(Debug)]
pub struct FactOutcome {
    pub data: DataFrame,
    /// Rows left without each key, counted before the orphan policy applies.
    pub orphans: BTreeMap<String, usize>,
    pub rows_dropped: usize,
}

/// Dimension tables the resolver joins against.
#[derive(Debug, Clone, Copy)]
pub struct FactDimensions<'a> {
    pub diagnoses: &'a DataFrame,
    pub doctors: &'a DataFrame,
    pub departments: &'a DataFrame,
}

impl<'a> FactDimensions<'a> {
    /// Picks the needed dimensions out of a built set, reporting absent ones
    /// as schema drift.
    pub fn from_set(set: &'a DimensionSet) -> Result<Self> {
        let mut missing = Vec::new();
        let mut lookup = |entity: Entity| {
            let found = set.get(entity);
            if found.is_none() {
                let name = hdw_model::schema_for(entity)
                    .dimension
                    .map(|spec| spec.name)
                    .unwrap_or(entity.as_str());
                missing.push(name.to_string());
            }
            found
        };
        let diagnoses = lookup(Entity::Diagnosis);
        let doctors = lookup(Entity::Doctor);
        let departments = lookup(Entity::Department);
        match (diagnoses, doctors, departments) {
            (Some(diagnoses), Some(doctors), Some(departments)) => Ok(Self {
                diagnoses,
                doctors,
                departments,
            }),
            _ => Err(TransformError::SchemaDrift {
                table: FACT_TABLE.to_string(),
                missing,
            }),
        }
    }
}

/// Derives the `YYYYMMDD` key of a visit date; unparseable dates have none.
pub fn derive_date_id(value: Option<&str>) -> Option<i64> {
    value.and_then(parse_date).map(date_id)
}

fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|column| !has_column(df, column))
        .map(|column| column.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TransformError::SchemaDrift {
            table: table.to_string(),
            missing,
        })
    }
}

/// Maps `key` text to the first `value` seen for it.
fn text_lookup(df: &DataFrame, key: &str, value: &str) -> Result<HashMap<String, Option<i64>>> {
    let keys = text_column(df, key)?;
    let values = i64_column(df, value)?;
    let mut map = HashMap::new();
    for (key, value) in keys.into_iter().zip(values) {
        if let Some(key) = key {
            map.entry(key).or_insert(value);
        }
    }
    Ok(map)
}

fn doctor_departments(doctors: &DataFrame) -> Result<HashMap<i64, Option<String>>> {
    let ids = i64_column(doctors, "doctor_id")?;
    let names = text_column(doctors, "department_name")?;
    let mut map = HashMap::new();
    for (id, name) in ids.into_iter().zip(names) {
        if let Some(id) = id {
            map.entry(id).or_insert(name);
        }
    }
    Ok(map)
}

/// Resolves cleaned visits into the fact table.
///
/// 1. `date_id` from `visit_date`, missing when the date does not parse
/// 2. `diagnosis_id` by `diagnosis_code`
/// 3. the doctor's `department_name` by `doctor_id`, falling back to the
///    visit's own `department_name`, then `department_id` by that name
/// 4. projection onto the fact columns
///
/// Unresolved keys are handled by [`TransformOptions::orphan_policy`].
pub fn resolve_fact(
    visits: &DataFrame,
    dims: FactDimensions<'_>,
    options: TransformOptions,
) -> Result<FactOutcome> {
    let span = info_span!("resolve_fact", table = FACT_TABLE);
    let _guard = span.enter();
    let start = Instant::now();

    require_columns(visits, FACT_TABLE, FACT_REQUIRED_COLUMNS)?;
    require_columns(dims.diagnoses, "dim_diagnoses", &["diagnosis_code", DIAGNOSIS_KEY])?;
    require_columns(dims.doctors, "dim_doctors", &["doctor_id", "department_name"])?;
    require_columns(dims.departments, "dim_departments", &["department_name", DEPARTMENT_KEY])?;

    let diagnosis_ids = text_lookup(dims.diagnoses, "diagnosis_code", DIAGNOSIS_KEY)?;
    let doctor_depts = doctor_departments(dims.doctors)?;
    let department_ids = text_lookup(dims.departments, "department_name", DEPARTMENT_KEY)?;

    let visit_dates = text_column(visits, "visit_date")?;
    let codes = text_column(visits, "diagnosis_code")?;
    let doctors = i64_column(visits, "doctor_id")?;
    let own_departments = if has_column(visits, "department_name") {
        text_column(visits, "department_name")?
    } else {
        vec![None; visits.height()]
    };

    let date_ids: Vec<Option<i64>> = visit_dates
        .iter()
        .map(|value| derive_date_id(value.as_deref()))
        .collect();
    let diag_ids: Vec<Option<i64>> = codes
        .iter()
        .map(|code| code.as_ref().and_then(|code| diagnosis_ids.get(code).copied().flatten()))
        .collect();
    let dept_ids: Vec<Option<i64>> = doctors
        .iter()
        .zip(own_departments.iter())
        .map(|(doctor, own)| {
            let via_doctor = doctor
                .and_then(|id| doctor_depts.get(&id).cloned())
                .flatten();
            via_doctor
                .or_else(|| own.clone())
                .and_then(|name| department_ids.get(&name).copied().flatten())
        })
        .collect();

    let count_missing = |values: &[Option<i64>]| values.iter().filter(|v| v.is_none()).count();
    let mut orphans = BTreeMap::new();
    orphans.insert(DIAGNOSIS_KEY.to_string(), count_missing(&diag_ids));
    orphans.insert(DEPARTMENT_KEY.to_string(), count_missing(&dept_ids));
    orphans.insert(DATE_KEY.to_string(), count_missing(&date_ids));

    let orphan_row: Vec<bool> = (0..visits.height())
        .map(|idx| {
            diag_ids[idx].is_none()
                || dept_ids[idx].is_none()
                || (options.strict_dates && date_ids[idx].is_none())
        })
        .collect();
    let orphan_rows = orphan_row.iter().filter(|orphan| **orphan).count();
    if orphan_rows > 0 {
        warn!(
            table = FACT_TABLE,
            orphan_rows,
            policy = %options.orphan_policy,
            "visits with unresolved keys"
        );
    }

    let mut fact = visits.clone();
    set_i64_column(&mut fact, DATE_KEY, date_ids)?;
    set_i64_column(&mut fact, DIAGNOSIS_KEY, diag_ids)?;
    set_i64_column(&mut fact, DEPARTMENT_KEY, dept_ids)?;
    for column in FACT_COLUMNS {
        if !has_column(&fact, column) {
            warn!(table = FACT_TABLE, column, "visit column absent, filled with nulls");
            let nulls = Series::full_null((*column).into(), fact.height(), &DataType::String);
            fact.with_column(nulls)?;
        }
    }
    let mut fact = fact.select(FACT_COLUMNS.iter().copied())?;

    let mut rows_dropped = 0;
    match options.orphan_policy {
        OrphanPolicy::NullKey => {}
        OrphanPolicy::Drop => {
            if orphan_rows > 0 {
                let keep: Vec<bool> = orphan_row.iter().map(|orphan| !orphan).collect();
                fact = filter_rows(&fact, &keep)?;
                rows_dropped = orphan_rows;
            }
        }
        OrphanPolicy::Fail => {
            if orphan_rows > 0 {
                let mut counts = orphans.clone();
                if !options.strict_dates {
                    counts.remove(DATE_KEY);
                }
                counts.retain(|_, count| *count > 0);
                return Err(TransformError::OrphanKeys {
                    table: FACT_TABLE.to_string(),
                    counts,
                });
            }
        }
    }

    debug!(
        table = FACT_TABLE,
        rows = fact.height(),
        rows_dropped,
        duration_ms = start.elapsed().as_millis() as u64,
        "fact table resolved"
    );
    Ok(FactOutcome {
        data: fact,
        orphans,
        rows_dropped,
    })
}
