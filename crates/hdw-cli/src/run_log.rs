//! Pipeline Log: the durable, line-oriented record of a stage.
//!
//! One record per line, fields separated by ` | `:
//!
//! ```text
//! 2024-06-01T10:15:02+07:00 | clean | patients | duplicates | 3 | removed 3 duplicates by patient_id
//! ```
//!
//! The cleaning log accumulates across runs; the transform log is truncated
//! when a transform starts.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local};
use hdw_model::{CleanReport, Stage, TableReport};

const SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    StageStarted,
    StageCompleted,
    Loaded,
    LoadFailed,
    Duplicates,
    Dropped,
    Defaults,
    SkippedRule,
    Warning,
    Written,
    Failed,
    Orphans,
}

impl LogEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEvent::StageStarted => "stage-started",
            LogEvent::StageCompleted => "stage-completed",
            LogEvent::Loaded => "loaded",
            LogEvent::LoadFailed => "load-failed",
            LogEvent::Duplicates => "duplicates",
            LogEvent::Dropped => "dropped",
            LogEvent::Defaults => "defaults",
            LogEvent::SkippedRule => "skipped-rule",
            LogEvent::Warning => "warning",
            LogEvent::Written => "written",
            LogEvent::Failed => "failed",
            LogEvent::Orphans => "orphans",
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub stage: Stage,
    /// Entity or table the record is about; `-` for stage markers.
    pub subject: String,
    pub event: LogEvent,
    pub count: Option<usize>,
    pub message: String,
}

impl LogRecord {
    pub fn to_line(&self) -> String {
        let count = self
            .count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "-".to_string());
        [
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
            self.stage.as_str().to_string(),
            self.subject.clone(),
            self.event.to_string(),
            count,
            self.message.replace('\n', " "),
        ]
        .join(SEPARATOR)
    }
}

/// Whether opening a log file keeps or discards earlier records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Append,
    Truncate,
}

/// Writer for one stage's records.
pub struct PipelineLog<W: Write> {
    writer: W,
    stage: Stage,
}

impl PipelineLog<BufWriter<File>> {
    pub fn open(path: &Path, stage: Stage, mode: LogMode) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            LogMode::Append => options.append(true),
            LogMode::Truncate => options.write(true).truncate(true),
        };
        let file = options.open(path)?;
        Ok(Self::new(BufWriter::new(file), stage))
    }
}

impl<W: Write> PipelineLog<W> {
    pub fn new(writer: W, stage: Stage) -> Self {
        Self { writer, stage }
    }

    pub fn record(
        &mut self,
        subject: &str,
        event: LogEvent,
        count: Option<usize>,
        message: impl Into<String>,
    ) -> io::Result<()> {
        let record = LogRecord {
            timestamp: Local::now(),
            stage: self.stage,
            subject: subject.to_string(),
            event,
            count,
            message: message.into(),
        };
        writeln!(self.writer, "{}", record.to_line())
    }

    pub fn stage_started(&mut self) -> io::Result<()> {
        let message = format!("{} stage started", self.stage.as_str());
        self.record("-", LogEvent::StageStarted, None, message)
    }

    pub fn stage_completed(&mut self, status: &str) -> io::Result<()> {
        let message = format!("{} stage completed: {status}", self.stage.as_str());
        self.record("-", LogEvent::StageCompleted, None, message)?;
        self.writer.flush()
    }

    /// Records the counts and diagnostics of a cleaned entity.
    pub fn clean_report(&mut self, report: &CleanReport) -> io::Result<()> {
        let subject = report.entity.file_stem();
        self.record(
            subject,
            LogEvent::Duplicates,
            Some(report.duplicates_removed),
            format!(
                "removed {} duplicates by {}",
                report.duplicates_removed,
                hdw_model::schema_for(report.entity).key
            ),
        )?;
        if report.rows_dropped > 0 {
            self.record(
                subject,
                LogEvent::Dropped,
                Some(report.rows_dropped),
                format!("dropped {} rows failing a required value", report.rows_dropped),
            )?;
        }
        for (column, count) in &report.defaults_filled {
            self.record(
                subject,
                LogEvent::Defaults,
                Some(*count),
                format!("filled {count} defaults in {column}"),
            )?;
        }
        for skipped in &report.skipped_rules {
            self.record(
                subject,
                LogEvent::SkippedRule,
                None,
                format!("column {} absent, skipped {}", skipped.column, skipped.rule),
            )?;
        }
        for warning in &report.warnings {
            self.record(subject, LogEvent::Warning, None, warning.clone())?;
        }
        Ok(())
    }

    /// Records the outcome of a built or failed table.
    pub fn table_report(&mut self, report: &TableReport) -> io::Result<()> {
        match &report.message {
            None => self.record(
                &report.table,
                LogEvent::Written,
                Some(report.rows),
                format!("built {} ({} rows)", report.table, report.rows),
            )?,
            Some(message) => {
                self.record(&report.table, LogEvent::Failed, None, message.clone())?;
            }
        }
        for (key, count) in report.orphans.iter().filter(|(_, count)| **count > 0) {
            self.record(
                &report.table,
                LogEvent::Orphans,
                Some(*count),
                format!("{count} rows without {key}"),
            )?;
        }
        if report.rows_dropped > 0 {
            self.record(
                &report.table,
                LogEvent::Dropped,
                Some(report.rows_dropped),
                format!("dropped {} rows with unresolved keys", report.rows_dropped),
            )?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
