use std::fs;
use std::path::PathBuf;

use hdw_common::text_column;
use hdw_ingest::{IngestError, InferredType, profile_csv, read_csv_frame, write_csv_atomic};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write file");
    path
}

#[test]
fn reads_text_columns_with_nulls() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "patients.csv",
        "\u{feff}patient_id, age ,gender\n1,30,male\n2,,F\n\n3,abc\n",
    );
    let df = read_csv_frame(&path).expect("read csv");
    assert_eq!(df.height(), 3);
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, vec!["patient_id", "age", "gender"]);
    assert_eq!(
        text_column(&df, "age").unwrap(),
        vec![Some("30".to_string()), None, Some("abc".to_string())]
    );
    assert_eq!(text_column(&df, "gender").unwrap()[2], None);
}

#[test]
fn header_only_file_yields_empty_frame() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "dates.csv", "date_id,date\n");
    let df = read_csv_frame(&path).expect("read csv");
    assert_eq!(df.height(), 0);
    assert_eq!(df.width(), 2);
}

#[test]
fn blank_file_is_empty_input() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "dates.csv", "\n\n");
    let result = read_csv_frame(&path);
    assert!(matches!(result, Err(IngestError::EmptyInput { .. })));
}

#[test]
fn absent_file_is_missing_input() {
    let dir = TempDir::new().unwrap();
    let result = read_csv_frame(&dir.path().join("visits.csv"));
    assert!(matches!(result, Err(IngestError::MissingInput { .. })));
}

#[test]
fn profiles_raw_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "visits.csv",
        "visit_id,total_cost,visit_type\n1,100,IGD\n2,NA,Rawat Jalan\n1,100,IGD\n3,250.5,\n",
    );
    let profile = profile_csv(&path).expect("profile");
    assert_eq!(profile.file_name, "visits.csv");
    assert_eq!(profile.rows, 4);
    assert_eq!(profile.duplicate_rows, 1);
    assert_eq!(profile.sample.len(), 3);

    let cost = &profile.columns[1];
    assert_eq!(cost.inferred, InferredType::Decimal);
    assert_eq!(cost.missing, 1);
    assert_eq!(profile.columns[2].inferred, InferredType::Text);
    assert_eq!(profile.columns[2].missing, 1);

    let summary = profile
        .numeric
        .iter()
        .find(|summary| summary.column == "total_cost")
        .expect("total_cost summary");
    assert_eq!(summary.count, 3);
    assert_eq!(summary.min, 100.0);
    assert_eq!(summary.max, 250.5);
}

#[test]
fn written_frame_reads_back() {
    let dir = TempDir::new().unwrap();
    let source = write_file(&dir, "doctors.csv", "doctor_id,doctor_name\n7,\"Dr. Sari, Sp.A\"\n");
    let df = read_csv_frame(&source).unwrap();
    let target = dir.path().join("clean").join("doctors_clean.csv");
    write_csv_atomic(&df, &target).unwrap();
    let contents = fs::read_to_string(&target).unwrap();
    assert_eq!(contents, "doctor_id,doctor_name\n7,\"Dr. Sari, Sp.A\"\n");
}
