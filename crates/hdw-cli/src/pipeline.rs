//! Stage execution: clean and transform computed in memory, then committed.
//!
//! A run takes the lock, computes every requested stage, checks the deadline
//! and only then writes the output tables and `run_report.json`. A timeout or
//! an aborting error therefore leaves the previous outputs untouched.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use hdw_clean::clean_entity;
use hdw_ingest::{
    IngestError, discover_inputs, read_csv_frame, text_frame, write_bytes_atomic, write_csv_atomic,
};
use hdw_model::{
    Entity, EntityOutcome, OutcomeStatus, RunReport, Stage, StageReport, TransformOptions,
    schema_for,
};
use hdw_transform::{TransformOutput, transform};
use polars::prelude::DataFrame;
use tracing::{info, info_span, warn};

use crate::config::PipelineConfig;
use crate::deadline::RunDeadline;
use crate::lock::RunLock;
use crate::profile::{ProfileRun, profile_inputs, render_report};
use crate::run_log::{LogEvent, LogMode, PipelineLog};

type FileLog = PipelineLog<BufWriter<File>>;

/// Stages a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSelection {
    Clean,
    Transform,
    /// Clean, then transform the freshly cleaned tables.
    All,
}

impl StageSelection {
    fn cleans(self) -> bool {
        matches!(self, StageSelection::Clean | StageSelection::All)
    }

    fn transforms(self) -> bool {
        matches!(self, StageSelection::Transform | StageSelection::All)
    }
}

#[derive(Debug)]
pub struct CleanStageOutput {
    pub outcomes: Vec<EntityOutcome>,
    pub tables: BTreeMap<Entity, DataFrame>,
    pub duration_ms: u64,
}

impl CleanStageOutput {
    pub fn stage_report(&self) -> StageReport {
        StageReport::for_entities(self.outcomes.clone(), self.duration_ms)
    }
}

#[derive(Debug)]
pub struct TransformStageOutput {
    pub output: TransformOutput,
    pub duration_ms: u64,
}

impl TransformStageOutput {
    pub fn stage_report(&self) -> StageReport {
        StageReport::for_tables(self.output.reports.clone(), self.duration_ms)
    }
}

/// Zero-row frame carrying the entity's input columns.
fn empty_entity_frame(entity: Entity) -> Result<DataFrame> {
    let schema = schema_for(entity);
    let headers: Vec<String> = schema
        .columns
        .iter()
        .map(|spec| spec.name.to_string())
        .collect();
    Ok(text_frame(&headers, &[])?)
}

fn outcome(entity: Entity, status: OutcomeStatus, message: impl Into<String>) -> EntityOutcome {
    EntityOutcome {
        entity,
        status,
        report: None,
        message: Some(message.into()),
    }
}

/// Cleans every entity found in `raw_dir`. Nothing is written.
///
/// Failures stay with their entity: a missing file is skipped, an empty file
/// yields zero rows, and a read or cleaning error fails only that entity.
pub fn clean_stage<W: Write>(
    raw_dir: &Path,
    deadline: &RunDeadline,
    log: &mut PipelineLog<W>,
) -> Result<CleanStageOutput> {
    let span = info_span!("clean_stage", raw_dir = %raw_dir.display());
    let _guard = span.enter();
    let start = Instant::now();
    let inputs = discover_inputs(raw_dir)?;
    for path in &inputs.unrecognized {
        info!(path = %path.display(), "ignoring unrecognized file");
    }

    let mut outcomes = Vec::with_capacity(Entity::ALL.len());
    let mut tables = BTreeMap::new();
    for entity in Entity::ALL {
        deadline.check(&format!("clean {entity}"))?;
        let subject = entity.file_stem();
        let Some(path) = inputs.path_for(entity) else {
            let message = format!("missing input {}", entity.raw_file_name());
            warn!(entity = %entity, "input file missing, entity skipped");
            log.record(subject, LogEvent::LoadFailed, None, &message)?;
            outcomes.push(outcome(entity, OutcomeStatus::Skipped, message));
            continue;
        };

        let raw = match read_csv_frame(path) {
            Ok(df) => {
                log.record(
                    subject,
                    LogEvent::Loaded,
                    Some(df.height()),
                    format!("loaded {} ({} rows)", path.display(), df.height()),
                )?;
                if df.height() == 0 {
                    warn!(entity = %entity, path = %path.display(), "input file has no data rows");
                    log.record(
                        subject,
                        LogEvent::Warning,
                        Some(0),
                        format!("{} has no data rows, cleaning zero rows", path.display()),
                    )?;
                }
                df
            }
            Err(IngestError::EmptyInput { .. }) => {
                warn!(entity = %entity, path = %path.display(), "input file is empty");
                log.record(
                    subject,
                    LogEvent::Warning,
                    Some(0),
                    format!("{} is empty, cleaning zero rows", path.display()),
                )?;
                empty_entity_frame(entity)?
            }
            Err(err) => {
                warn!(entity = %entity, error = %err, "failed to load input");
                log.record(subject, LogEvent::LoadFailed, None, err.to_string())?;
                outcomes.push(outcome(entity, OutcomeStatus::Failed, err.to_string()));
                continue;
            }
        };

        match clean_entity(entity, raw) {
            Ok((df, report)) => {
                log.clean_report(&report)?;
                info!(
                    entity = %entity,
                    input_rows = report.input_rows,
                    output_rows = report.output_rows,
                    "entity cleaned"
                );
                outcomes.push(EntityOutcome {
                    entity,
                    status: OutcomeStatus::Written,
                    report: Some(report),
                    message: None,
                });
                tables.insert(entity, df);
            }
            Err(err) => {
                warn!(entity = %entity, error = %err, "cleaning failed");
                log.record(subject, LogEvent::Failed, None, err.to_string())?;
                outcomes.push(outcome(entity, OutcomeStatus::Failed, err.to_string()));
            }
        }
    }

    Ok(CleanStageOutput {
        outcomes,
        tables,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Writes each cleaned table to `<clean_dir>/<stem>_clean.csv`.
///
/// A table that cannot be written marks its entity failed; the remaining
/// tables are still written.
pub fn commit_clean<W: Write>(
    clean_dir: &Path,
    stage: &mut CleanStageOutput,
    log: &mut PipelineLog<W>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(stage.tables.len());
    for (entity, df) in &stage.tables {
        let subject = entity.file_stem();
        let path = clean_dir.join(entity.clean_file_name());
        match write_csv_atomic(df, &path) {
            Ok(()) => {
                log.record(
                    subject,
                    LogEvent::Written,
                    Some(df.height()),
                    format!("saved {}", path.display()),
                )?;
                written.push(path);
            }
            Err(err) => {
                let message = format!("write {}: {err}", path.display());
                warn!(entity = %entity, error = %err, "failed to write cleaned table");
                log.record(subject, LogEvent::Failed, None, &message)?;
                if let Some(outcome) = stage
                    .outcomes
                    .iter_mut()
                    .find(|outcome| outcome.entity == *entity)
                {
                    outcome.status = OutcomeStatus::Failed;
                    outcome.message = Some(message);
                }
            }
        }
    }
    Ok(written)
}

/// Reads the cleaned tables back for a transform-only run.
///
/// An absent or unreadable table is logged and left out; the dimension or
/// fact table depending on it is then reported as failed.
pub fn load_cleaned<W: Write>(
    clean_dir: &Path,
    log: &mut PipelineLog<W>,
) -> Result<BTreeMap<Entity, DataFrame>> {
    let mut tables = BTreeMap::new();
    for entity in Entity::ALL {
        let path = clean_dir.join(entity.clean_file_name());
        match read_csv_frame(&path) {
            Ok(df) => {
                log.record(
                    entity.file_stem(),
                    LogEvent::Loaded,
                    Some(df.height()),
                    format!("loaded {}", path.display()),
                )?;
                tables.insert(entity, df);
            }
            Err(err) => {
                warn!(entity = %entity, error = %err, "cleaned table unavailable");
                log.record(entity.file_stem(), LogEvent::LoadFailed, None, err.to_string())?;
            }
        }
    }
    Ok(tables)
}

/// Builds the dimension and fact tables. Nothing is written.
pub fn transform_stage<W: Write>(
    cleaned: &BTreeMap<Entity, DataFrame>,
    options: TransformOptions,
    deadline: &RunDeadline,
    log: &mut PipelineLog<W>,
) -> Result<TransformStageOutput> {
    let span = info_span!("transform_stage", orphan_policy = %options.orphan_policy);
    let _guard = span.enter();
    let start = Instant::now();
    deadline.check("transform")?;
    let output = transform(cleaned, options);
    for report in &output.reports {
        log.table_report(report)?;
    }
    Ok(TransformStageOutput {
        output,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Writes every built table to `<processed_dir>/<table>.csv`.
///
/// A table that cannot be written is reported failed; the remaining tables
/// are still written.
pub fn commit_transform<W: Write>(
    processed_dir: &Path,
    stage: &mut TransformStageOutput,
    log: &mut PipelineLog<W>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(stage.output.tables.len());
    for table in &stage.output.tables {
        let path = processed_dir.join(table.file_name());
        match write_csv_atomic(&table.data, &path) {
            Ok(()) => {
                log.record(
                    &table.name,
                    LogEvent::Written,
                    Some(table.record_count()),
                    format!("saved {}", path.display()),
                )?;
                written.push(path);
            }
            Err(err) => {
                let message = format!("write {}: {err}", path.display());
                warn!(table = %table.name, error = %err, "failed to write table");
                log.record(&table.name, LogEvent::Failed, None, &message)?;
                if let Some(report) = stage
                    .output
                    .reports
                    .iter_mut()
                    .find(|report| report.table == table.name)
                {
                    report.status = OutcomeStatus::Failed;
                    report.message = Some(message);
                }
            }
        }
    }
    Ok(written)
}

pub fn write_run_report(path: &Path, report: &RunReport) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(report).context("serialize run report")?;
    write_bytes_atomic(path, &bytes).context("write run report")?;
    Ok(())
}

/// Everything a clean and/or transform run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub clean: Option<CleanStageOutput>,
    pub transform: Option<TransformStageOutput>,
    pub run_report_path: PathBuf,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

fn open_log(path: &Path, stage: Stage, mode: LogMode) -> Result<FileLog> {
    PipelineLog::open(path, stage, mode)
        .with_context(|| format!("open pipeline log {}", path.display()))
}

/// Runs the selected stages under the run lock.
pub fn execute(config: &PipelineConfig, selection: StageSelection) -> Result<RunOutcome> {
    let _lock = RunLock::acquire_with(&config.log_dir, config.lock_stale_after())?;
    let deadline = RunDeadline::new(config.timeout());
    let started_at = Local::now().to_rfc3339();

    let mut clean_log = None;
    let mut clean = None;
    if selection.cleans() {
        let mut log = open_log(&config.cleaning_log_path(), Stage::Clean, LogMode::Append)?;
        log.stage_started()?;
        clean = Some(clean_stage(&config.raw_dir, &deadline, &mut log)?);
        clean_log = Some(log);
    }

    let mut transform_log = None;
    let mut transformed = None;
    if selection.transforms() {
        let mut log = open_log(
            &config.transform_log_path(),
            Stage::Transform,
            LogMode::Truncate,
        )?;
        log.stage_started()?;
        let loaded;
        let cleaned = match &clean {
            Some(stage) => &stage.tables,
            None => {
                loaded = load_cleaned(&config.clean_dir, &mut log)?;
                &loaded
            }
        };
        transformed = Some(transform_stage(
            cleaned,
            config.transform_options(),
            &deadline,
            &mut log,
        )?);
        transform_log = Some(log);
    }

    deadline.check("commit")?;

    let mut stages = Vec::new();
    if let (Some(stage), Some(log)) = (clean.as_mut(), clean_log.as_mut()) {
        commit_clean(&config.clean_dir, stage, log)?;
        let report = stage.stage_report();
        log.stage_completed(report.status.label())?;
        stages.push(report);
    }
    if let (Some(stage), Some(log)) = (transformed.as_mut(), transform_log.as_mut()) {
        commit_transform(&config.processed_dir, stage, log)?;
        let report = stage.stage_report();
        log.stage_completed(report.status.label())?;
        stages.push(report);
    }

    let report = RunReport::new(started_at, Local::now().to_rfc3339(), stages);
    let run_report_path = config.run_report_path();
    write_run_report(&run_report_path, &report)?;
    info!(
        status = report.status.label(),
        elapsed_ms = deadline.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(RunOutcome {
        report,
        clean,
        transform: transformed,
        run_report_path,
    })
}

/// Profiles the raw inputs and writes the data-quality report.
pub fn execute_profile(config: &PipelineConfig) -> Result<(ProfileRun, PathBuf)> {
    let _lock = RunLock::acquire_with(&config.log_dir, config.lock_stale_after())?;
    let deadline = RunDeadline::new(config.timeout());
    let run = profile_inputs(&config.raw_dir, &deadline)?;
    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let text = render_report(&run, &generated_at);
    let path = config.quality_report_path();
    deadline.check("commit")?;
    write_bytes_atomic(&path, text.as_bytes()).context("write data quality report")?;
    Ok((run, path))
}
