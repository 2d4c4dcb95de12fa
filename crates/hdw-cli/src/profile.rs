//! Profiling stage: the data-quality report over raw extracts.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use comfy_table::presets::ASCII_FULL_CONDENSED;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use hdw_ingest::{FileProfile, IngestError, discover_inputs, profile_csv};
use hdw_model::{Stage, StageReport, StageStatus, TableReport};
use tracing::{info, info_span, warn};

use crate::deadline::RunDeadline;

const RULE_WIDTH: usize = 100;

/// Result of profiling one file.
#[derive(Debug)]
pub enum FileOutcome {
    Profiled(FileProfile),
    Failed { file_name: String, message: String },
}

impl FileOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            FileOutcome::Profiled(profile) => &profile.file_name,
            FileOutcome::Failed { file_name, .. } => file_name,
        }
    }
}

#[derive(Debug)]
pub struct ProfileRun {
    pub raw_dir: PathBuf,
    pub files: Vec<FileOutcome>,
    pub duration_ms: u64,
}

impl ProfileRun {
    pub fn stage_report(&self) -> StageReport {
        let tables: Vec<TableReport> = self
            .files
            .iter()
            .map(|outcome| match outcome {
                FileOutcome::Profiled(profile) => {
                    TableReport::written(&profile.file_name, profile.rows)
                }
                FileOutcome::Failed { file_name, message } => {
                    TableReport::failed(file_name, message)
                }
            })
            .collect();
        let profiled = self
            .files
            .iter()
            .filter(|outcome| matches!(outcome, FileOutcome::Profiled(_)))
            .count();
        StageReport {
            stage: Stage::Profile,
            status: StageStatus::from_counts(profiled, self.files.len() - profiled),
            entities: Vec::new(),
            tables,
            duration_ms: self.duration_ms,
        }
    }
}

/// Profiles every CSV in `raw_dir`, plus an inline failure for each expected
/// entity file that is absent.
pub fn profile_inputs(raw_dir: &Path, deadline: &RunDeadline) -> Result<ProfileRun> {
    let span = info_span!("profile", raw_dir = %raw_dir.display());
    let _guard = span.enter();
    let start = Instant::now();
    let inputs = discover_inputs(raw_dir)?;

    let mut paths: Vec<PathBuf> = inputs.found.iter().map(|(_, path)| path.clone()).collect();
    paths.extend(inputs.unrecognized.iter().cloned());
    paths.sort();

    let mut files = Vec::with_capacity(paths.len() + inputs.missing.len());
    for path in &paths {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        deadline.check(&format!("profile {file_name}"))?;
        match profile_csv(path) {
            Ok(profile) => {
                info!(file = %file_name, rows = profile.rows, "profiled");
                files.push(FileOutcome::Profiled(profile));
            }
            Err(err) => {
                warn!(file = %file_name, error = %err, "profiling failed");
                let message = match err {
                    IngestError::EmptyInput { .. } => format!("empty file: {file_name}"),
                    other => other.to_string(),
                };
                files.push(FileOutcome::Failed { file_name, message });
            }
        }
    }
    for entity in &inputs.missing {
        let path = raw_dir.join(entity.raw_file_name());
        warn!(entity = %entity, path = %path.display(), "raw file not found");
        files.push(FileOutcome::Failed {
            file_name: entity.raw_file_name(),
            message: format!("file not found: {}", path.display()),
        });
    }

    Ok(ProfileRun {
        raw_dir: raw_dir.to_path_buf(),
        files,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn plain_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(header);
    table
}

fn right_align(table: &mut Table, from: usize) {
    for index in from..table.column_count() {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn render_profile(out: &mut String, profile: &FileProfile) {
    out.push_str(&format!("=== Profiling {} ===\n", profile.file_name));
    out.push_str(&format!(
        "Rows: {}, Columns: {}\n\n",
        profile.rows,
        profile.columns.len()
    ));

    let mut columns = plain_table(vec!["Column", "Type", "Missing", "Distinct"]);
    for column in &profile.columns {
        columns.add_row(vec![
            column.name.clone(),
            column.inferred.label().to_string(),
            column.missing.to_string(),
            column.distinct.to_string(),
        ]);
    }
    right_align(&mut columns, 2);
    out.push_str(&format!("Columns and missing values:\n{columns}\n\n"));

    out.push_str(&format!("Duplicates: {}\n\n", profile.duplicate_rows));

    if !profile.numeric.is_empty() {
        let mut numeric = plain_table(vec![
            "Column", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
        ]);
        for summary in &profile.numeric {
            let mut row = vec![summary.column.clone()];
            row.extend(summary.cells());
            numeric.add_row(row);
        }
        right_align(&mut numeric, 1);
        out.push_str(&format!("Numeric summary:\n{numeric}\n\n"));
    }

    if profile.sample.is_empty() {
        out.push_str("Sample data: (no rows)\n");
    } else {
        let mut sample = plain_table(profile.column_names());
        for row in &profile.sample {
            sample.add_row(row.clone());
        }
        out.push_str(&format!("Sample data:\n{sample}\n"));
    }
}

/// Renders the text report.
pub fn render_report(run: &ProfileRun, generated_at: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Data quality report, generated {generated_at}\n"));
    out.push_str(&format!("Source: {}\n\n", run.raw_dir.display()));
    for outcome in &run.files {
        match outcome {
            FileOutcome::Profiled(profile) => render_profile(&mut out, profile),
            FileOutcome::Failed { file_name, message } => {
                out.push_str(&format!("=== Profiling {file_name} ===\n"));
                out.push_str(&format!("ERROR: {message}\n"));
            }
        }
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push_str("\n\n");
    }
    let failed = run
        .files
        .iter()
        .filter(|outcome| matches!(outcome, FileOutcome::Failed { .. }))
        .count();
    if failed == 0 {
        out.push_str("Profiling complete.\n");
    } else {
        out.push_str(&format!("Profiling complete with {failed} file error(s).\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn report_covers_profiled_empty_and_missing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("patients.csv"),
            "patient_id,age,city\n1,30,Jakarta\n1,30,Jakarta\n2,NA,Bandung\n",
        )
        .unwrap();
        fs::write(dir.path().join("doctors.csv"), "").unwrap();

        let run = profile_inputs(dir.path(), &RunDeadline::unlimited()).unwrap();
        let names: Vec<&str> = run.files.iter().map(FileOutcome::file_name).collect();
        assert_eq!(names[..2], ["doctors.csv", "patients.csv"]);
        assert_eq!(run.files.len(), 6);

        let report = render_report(&run, "2024-06-01 10:00:00");
        assert!(report.contains("=== Profiling patients.csv ==="));
        assert!(report.contains("Rows: 3, Columns: 3"));
        assert!(report.contains("Duplicates: 1"));
        assert!(report.contains("Numeric summary:"));
        assert!(report.contains("empty file: doctors.csv"));
        assert!(report.contains("file not found"));
        assert!(report.contains("Profiling complete with 5 file error(s)."));

        let stage = run.stage_report();
        assert_eq!(stage.stage, Stage::Profile);
        assert_eq!(stage.status, StageStatus::Partial);
    }

    #[test]
    fn missing_raw_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(profile_inputs(&missing, &RunDeadline::unlimited()).is_err());
    }
}
