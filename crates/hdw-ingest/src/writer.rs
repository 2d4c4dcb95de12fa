//! Atomic output: every file is written to a hidden temp file next to its
//! target and renamed into place once complete.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use hdw_common::any_to_string;
use polars::prelude::{AnyValue, DataFrame};
use tracing::debug;

use crate::error::{IngestError, Result};

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IngestError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn commit(temp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(temp_path, path).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        IngestError::AtomicWriteFailed {
            temp_path: temp_path.to_path_buf(),
            target_path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Serializes `df` as CSV text: header row, nulls as empty cells, floats
/// without trailing zeros.
pub fn frame_to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let headers: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    let csv_error = |err: csv::Error| IngestError::DataFrame {
        message: err.to_string(),
    };
    writer.write_record(&headers).map_err(csv_error)?;
    let columns = df.get_columns();
    for idx in 0..df.height() {
        let record: Vec<String> = columns
            .iter()
            .map(|column| any_to_string(column.get(idx).unwrap_or(AnyValue::Null)))
            .collect();
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer.into_inner().map_err(|err| IngestError::DataFrame {
        message: err.to_string(),
    })
}

fn write_temp(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path).map_err(|e| IngestError::Io {
        operation: "create",
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    file.write_all(bytes).map_err(|e| IngestError::Io {
        operation: "write",
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    file.sync_all().map_err(|e| IngestError::Io {
        operation: "sync",
        path: temp_path.to_path_buf(),
        source: e,
    })
}

/// Writes `bytes` to `path` through a temp file and rename. The temp file
/// is removed on every failure path.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    create_parent(path)?;
    let temp_path = temp_path_for(path);
    if let Err(err) = write_temp(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    commit(&temp_path, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

/// Writes a frame as CSV to `path`, replacing any previous file atomically.
pub fn write_csv_atomic(df: &DataFrame, path: &Path) -> Result<()> {
    let bytes = frame_to_csv_bytes(df)?;
    write_bytes_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, IntoColumn, NamedFrom, Series};
    use tempfile::TempDir;

    fn frame() -> DataFrame {
        let cols: Vec<Column> = vec![
            Series::new("visit_id".into(), vec![Some(1i64), Some(2)]).into_column(),
            Series::new("total_cost".into(), vec![Some(1500.0f64), None]).into_column(),
            Series::new(
                "visit_type".into(),
                vec![Some("Rawat Jalan".to_string()), Some("IGD, lantai 1".to_string())],
            )
            .into_column(),
        ];
        DataFrame::new(cols).unwrap()
    }

    #[test]
    fn renders_nulls_and_numbers() {
        let bytes = frame_to_csv_bytes(&frame()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "visit_id,total_cost,visit_type\n1,1500,Rawat Jalan\n2,,\"IGD, lantai 1\"\n"
        );
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed").join("fact_visits.csv");
        write_csv_atomic(&frame(), &path).unwrap();
        assert!(path.is_file());
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dates_clean.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep.txt"), "occupied").unwrap();

        assert!(write_bytes_atomic(&path, b"date_id\n").is_err());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn failed_temp_write_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fact_visits.csv");
        fs::create_dir(temp_path_for(&path)).unwrap();

        assert!(write_bytes_atomic(&path, b"visit_id\n").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        write_bytes_atomic(&path, b"old").unwrap();
        write_bytes_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
