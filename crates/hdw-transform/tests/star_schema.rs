//! Star-schema construction from cleaned entity tables.

use std::collections::BTreeMap;

use hdw_clean::clean_entity;
use hdw_common::{column_names, i64_column};
use hdw_model::{Entity, FACT_COLUMNS, OrphanPolicy, OutcomeStatus, TransformOptions};
use hdw_transform::{
    FactDimensions, TransformError, build_dimensions, resolve_fact, transform,
};
use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};

fn frame(columns: &[(&str, Vec<Option<&str>>)]) -> DataFrame {
    let cols: Vec<Column> = columns
        .iter()
        .map(|(name, values)| Series::new((*name).into(), values.clone()).into_column())
        .collect();
    DataFrame::new(cols).unwrap()
}

fn diagnoses() -> DataFrame {
    frame(&[
        ("diagnosis_id", vec![Some("1"), Some("2")]),
        ("diagnosis_code", vec![Some("I10"), Some("E11")]),
        ("diagnosis_name", vec![Some("Hypertension"), Some("Diabetes")]),
    ])
}

fn doctors() -> DataFrame {
    frame(&[
        ("doctor_id", vec![Some("10"), Some("11")]),
        ("doctor_name", vec![Some("Dr. Sari"), Some("Dr. Budi")]),
        ("department_name", vec![Some("Cardiology"), None]),
        ("specialization", vec![Some("Cardiologist"), Some("Internist")]),
        ("status", vec![Some("Active"), Some("Active")]),
        ("years_experience", vec![Some("12"), Some("3")]),
    ])
}

fn departments() -> DataFrame {
    frame(&[
        ("department_id", vec![Some("100"), Some("200")]),
        ("department_name", vec![Some("Cardiology"), Some("Internal Medicine")]),
        ("head_doctor", vec![Some("Dr. Sari"), Some("Dr. Rina")]),
        ("floor_number", vec![Some("2"), Some("3")]),
    ])
}

fn visits(codes: [&str; 3], dates: [&str; 3]) -> DataFrame {
    frame(&[
        ("visit_id", vec![Some("1"), Some("2"), Some("3")]),
        ("patient_id", vec![Some("7"), Some("8"), Some("9")]),
        ("doctor_id", vec![Some("10"), Some("11"), Some("99")]),
        (
            "department_name",
            vec![Some("Cardiology"), Some("Internal Medicine"), Some("Cardiology")],
        ),
        ("diagnosis_code", codes.iter().map(|c| Some(*c)).collect()),
        ("visit_date", dates.iter().map(|d| Some(*d)).collect()),
        ("visit_type", vec![Some("IGD"), Some("Rawat Inap"), Some("Rawat Jalan")]),
        ("visit_duration_days", vec![Some("0"), Some("3"), Some("0")]),
        ("total_cost", vec![Some("100"), Some("900"), Some("50")]),
        ("insurance_coverage", vec![Some("0"), Some("800"), Some("50")]),
        ("patient_payment", vec![Some("100"), Some("100"), Some("0")]),
        ("satisfaction_rating", vec![Some("4"), Some("5"), Some("3")]),
    ])
}

fn set_for(visits: DataFrame) -> BTreeMap<Entity, DataFrame> {
    BTreeMap::from([
        (Entity::Diagnosis, diagnoses()),
        (Entity::Doctor, doctors()),
        (Entity::Department, departments()),
        (Entity::Visit, visits),
    ])
}

fn resolve(
    visits: &DataFrame,
    options: TransformOptions,
) -> hdw_transform::Result<hdw_transform::FactOutcome> {
    let cleaned = set_for(visits.clone());
    let dims = build_dimensions(&cleaned);
    let joined = FactDimensions::from_set(&dims)?;
    resolve_fact(visits, joined, options)
}

const GOOD_DATES: [&str; 3] = ["2024-01-15", "2024-02-01", "2024-03-10"];

#[test]
fn resolves_surrogate_keys_in_fact_order() {
    let visits = visits(["I10", "E11", "I10"], GOOD_DATES);
    let outcome = resolve(&visits, TransformOptions::new()).unwrap();
    assert_eq!(column_names(&outcome.data), FACT_COLUMNS.to_vec());
    assert_eq!(
        i64_column(&outcome.data, "diagnosis_id").unwrap(),
        vec![Some(1), Some(2), Some(1)]
    );
    assert_eq!(
        i64_column(&outcome.data, "date_id").unwrap(),
        vec![Some(20240115), Some(20240201), Some(20240310)]
    );
    assert_eq!(outcome.rows_dropped, 0);
}

#[test]
fn department_falls_back_to_the_visit_when_doctor_has_none() {
    let visits = visits(["I10", "E11", "I10"], GOOD_DATES);
    let outcome = resolve(&visits, TransformOptions::new()).unwrap();
    // doctor 10 is in Cardiology; doctor 11 has no department; doctor 99 is unknown
    assert_eq!(
        i64_column(&outcome.data, "department_id").unwrap(),
        vec![Some(100), Some(200), Some(100)]
    );
    assert_eq!(outcome.orphans.get("department_id"), Some(&0));
}

#[test]
fn orphan_diagnosis_keeps_the_row_with_a_null_key() {
    let visits = visits(["I10", "Z99", "I10"], GOOD_DATES);
    let outcome = resolve(&visits, TransformOptions::new()).unwrap();
    assert_eq!(outcome.data.height(), 3);
    assert_eq!(
        i64_column(&outcome.data, "diagnosis_id").unwrap(),
        vec![Some(1), None, Some(1)]
    );
    assert_eq!(outcome.orphans.get("diagnosis_id"), Some(&1));
}

#[test]
fn drop_policy_removes_orphan_rows() {
    let visits = visits(["I10", "Z99", "I10"], GOOD_DATES);
    let options = TransformOptions::new().with_orphan_policy(OrphanPolicy::Drop);
    let outcome = resolve(&visits, options).unwrap();
    assert_eq!(outcome.data.height(), 2);
    assert_eq!(outcome.rows_dropped, 1);
    assert_eq!(
        i64_column(&outcome.data, "visit_id").unwrap(),
        vec![Some(1), Some(3)]
    );
}

#[test]
fn fail_policy_reports_orphan_counts() {
    let visits = visits(["I10", "Z99", "Q00"], GOOD_DATES);
    let options = TransformOptions::new().with_orphan_policy(OrphanPolicy::Fail);
    match resolve(&visits, options) {
        Err(TransformError::OrphanKeys { table, counts }) => {
            assert_eq!(table, "fact_visits");
            assert_eq!(counts.get("diagnosis_id"), Some(&2));
            assert!(!counts.contains_key("date_id"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn unparseable_dates_only_count_as_orphans_when_strict() {
    let visits = visits(["I10", "E11", "I10"], ["2024-01-15", "not a date", "2024-03-10"]);
    let dropping = TransformOptions::new().with_orphan_policy(OrphanPolicy::Drop);

    let lenient = resolve(&visits, dropping).unwrap();
    assert_eq!(lenient.data.height(), 3);
    assert_eq!(lenient.orphans.get("date_id"), Some(&1));
    assert_eq!(
        i64_column(&lenient.data, "date_id").unwrap(),
        vec![Some(20240115), None, Some(20240310)]
    );

    let strict = resolve(&visits, dropping.with_strict_dates(true)).unwrap();
    assert_eq!(strict.data.height(), 2);
    assert_eq!(strict.rows_dropped, 1);
}

#[test]
fn missing_visit_column_is_schema_drift() {
    let mut visits = visits(["I10", "E11", "I10"], GOOD_DATES);
    let _ = visits.drop_in_place("diagnosis_code").unwrap();
    match resolve(&visits, TransformOptions::new()) {
        Err(TransformError::SchemaDrift { table, missing }) => {
            assert_eq!(table, "fact_visits");
            assert_eq!(missing, vec!["diagnosis_code".to_string()]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn optional_visit_columns_become_null() {
    let mut visits = visits(["I10", "E11", "I10"], GOOD_DATES);
    let _ = visits.drop_in_place("satisfaction_rating").unwrap();
    let outcome = resolve(&visits, TransformOptions::new()).unwrap();
    assert_eq!(column_names(&outcome.data), FACT_COLUMNS.to_vec());
    assert_eq!(outcome.data.column("satisfaction_rating").unwrap().null_count(), 3);
}

#[test]
fn transform_reports_missing_dimension_and_keeps_the_rest() {
    let mut cleaned = set_for(visits(["I10", "E11", "I10"], GOOD_DATES));
    cleaned.remove(&Entity::Department);
    let output = transform(&cleaned, TransformOptions::new());

    let names: Vec<&str> = output.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["dim_doctors", "dim_diagnoses"]);
    let fact = output
        .reports
        .iter()
        .find(|report| report.table == "fact_visits")
        .unwrap();
    assert_eq!(fact.status, OutcomeStatus::Failed);
    assert!(fact.message.as_deref().unwrap().contains("dim_departments"));
    assert!(output.failed_tables() >= 2);
}

#[test]
fn cleaned_tables_flow_into_the_star_schema() {
    let mut cleaned = BTreeMap::new();
    for (entity, raw) in [
        (Entity::Diagnosis, diagnoses()),
        (Entity::Doctor, doctors()),
        (Entity::Department, departments()),
        (
            Entity::Patient,
            frame(&[
                ("patient_id", vec![Some("7"), Some("8")]),
                ("patient_name", vec![Some(" Ana "), Some("Budi")]),
                ("gender", vec![Some("f"), Some("M")]),
                ("age", vec![Some("30"), None]),
                ("city", vec![Some("jakarta"), Some("BANDUNG")]),
                ("insurance_type", vec![Some("BPJS"), None]),
            ]),
        ),
        (
            Entity::Date,
            frame(&[
                ("date_id", vec![Some("0"), Some("0")]),
                ("date", vec![Some("2024-01-15"), Some("bad")]),
            ]),
        ),
        (Entity::Visit, visits(["i10", "E11", "I10"], GOOD_DATES)),
    ] {
        let (clean, _) = clean_entity(entity, raw).unwrap();
        cleaned.insert(entity, clean);
    }

    let output = transform(&cleaned, TransformOptions::new());
    assert_eq!(output.failed_tables(), 0);
    assert_eq!(output.tables.len(), 6);

    let dates = output.tables.iter().find(|t| t.name == "dim_dates").unwrap();
    assert_eq!(dates.record_count(), 1);
    let fact = output.tables.iter().find(|t| t.name == "fact_visits").unwrap();
    assert_eq!(
        i64_column(&fact.data, "diagnosis_id").unwrap(),
        vec![Some(1), Some(2), Some(1)]
    );
}
