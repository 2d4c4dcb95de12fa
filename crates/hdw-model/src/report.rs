//! Per-entity, per-table and per-stage reports of a pipeline run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Profile,
    Clean,
    Transform,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Profile => "profile",
            Stage::Clean => "clean",
            Stage::Transform => "transform",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    /// Some entities or tables were skipped or failed.
    Partial,
    Failed,
    Skipped,
}

impl StageStatus {
    /// Status of a stage from the number of units that succeeded and failed.
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (0, 0) => StageStatus::Skipped,
            (_, 0) => StageStatus::Success,
            (0, _) => StageStatus::Failed,
            _ => StageStatus::Partial,
        }
    }

    /// Folds the status of several stages into the status of the run.
    pub fn combine(statuses: &[StageStatus]) -> Self {
        let ran: Vec<StageStatus> = statuses
            .iter()
            .copied()
            .filter(|status| *status != StageStatus::Skipped)
            .collect();
        if ran.is_empty() {
            return StageStatus::Skipped;
        }
        if ran.iter().all(|status| *status == StageStatus::Success) {
            StageStatus::Success
        } else if ran.iter().all(|status| *status == StageStatus::Failed) {
            StageStatus::Failed
        } else {
            StageStatus::Partial
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            StageStatus::Success | StageStatus::Skipped => 0,
            StageStatus::Partial => 2,
            StageStatus::Failed => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Success => "success",
            StageStatus::Partial => "partial",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

/// Cleaning rule that could not run because its column was absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub column: String,
    pub rule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanReport {
    pub entity: Entity,
    pub input_rows: usize,
    pub output_rows: usize,
    pub duplicates_removed: usize,
    pub rows_dropped: usize,
    pub defaults_filled: BTreeMap<String, usize>,
    pub skipped_rules: Vec<SkippedRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CleanReport {
    pub fn new(entity: Entity, input_rows: usize) -> Self {
        Self {
            entity,
            input_rows,
            output_rows: input_rows,
            duplicates_removed: 0,
            rows_dropped: 0,
            defaults_filled: BTreeMap::new(),
            skipped_rules: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_defaults(&mut self, column: &str, count: usize) {
        if count > 0 {
            *self.defaults_filled.entry(column.to_string()).or_default() += count;
        }
    }

    pub fn skip_rule(&mut self, column: &str, rule: &str) {
        self.skipped_rules.push(SkippedRule {
            column: column.to_string(),
            rule: rule.to_string(),
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn total_defaults(&self) -> usize {
        self.defaults_filled.values().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Written,
    Skipped,
    Failed,
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Written => "written",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Failed => "failed",
        }
    }
}

/// Result of cleaning one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityOutcome {
    pub entity: Entity,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CleanReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of building one dimension or fact table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub status: OutcomeStatus,
    pub rows: usize,
    /// Unresolved foreign keys per key column.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub orphans: BTreeMap<String, usize>,
    #[serde(default)]
    pub rows_dropped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TableReport {
    pub fn written(table: impl Into<String>, rows: usize) -> Self {
        Self {
            table: table.into(),
            status: OutcomeStatus::Written,
            rows,
            orphans: BTreeMap::new(),
            rows_dropped: 0,
            message: None,
        }
    }

    pub fn failed(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            status: OutcomeStatus::Failed,
            rows: 0,
            orphans: BTreeMap::new(),
            rows_dropped: 0,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableReport>,
    pub duration_ms: u64,
}

impl StageReport {
    /// Builds a clean-stage report, deriving the status from the outcomes.
    pub fn for_entities(entities: Vec<EntityOutcome>, duration_ms: u64) -> Self {
        let succeeded = entities
            .iter()
            .filter(|outcome| outcome.status == OutcomeStatus::Written)
            .count();
        Self {
            stage: Stage::Clean,
            status: StageStatus::from_counts(succeeded, entities.len() - succeeded),
            entities,
            tables: Vec::new(),
            duration_ms,
        }
    }

    /// Builds a transform-stage report, deriving the status from the tables.
    pub fn for_tables(tables: Vec<TableReport>, duration_ms: u64) -> Self {
        let succeeded = tables
            .iter()
            .filter(|table| table.status == OutcomeStatus::Written)
            .count();
        Self {
            stage: Stage::Transform,
            status: StageStatus::from_counts(succeeded, tables.len() - succeeded),
            entities: Vec::new(),
            tables,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub status: StageStatus,
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn new(started_at: String, finished_at: String, stages: Vec<StageReport>) -> Self {
        let statuses: Vec<StageStatus> = stages.iter().map(|stage| stage.status).collect();
        Self {
            started_at,
            finished_at,
            status: StageStatus::combine(&statuses),
            stages,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_counts() {
        assert_eq!(StageStatus::from_counts(0, 0), StageStatus::Skipped);
        assert_eq!(StageStatus::from_counts(6, 0), StageStatus::Success);
        assert_eq!(StageStatus::from_counts(5, 1), StageStatus::Partial);
        assert_eq!(StageStatus::from_counts(0, 2), StageStatus::Failed);
    }

    #[test]
    fn combined_status_ignores_skipped_stages() {
        assert_eq!(
            StageStatus::combine(&[StageStatus::Success, StageStatus::Skipped]),
            StageStatus::Success
        );
        assert_eq!(
            StageStatus::combine(&[StageStatus::Success, StageStatus::Failed]),
            StageStatus::Partial
        );
        assert_eq!(StageStatus::combine(&[StageStatus::Failed]), StageStatus::Failed);
        assert_eq!(StageStatus::Partial.exit_code(), 2);
    }

    #[test]
    fn clean_report_tracks_defaults() {
        let mut report = CleanReport::new(Entity::Patient, 3);
        report.record_defaults("age", 1);
        report.record_defaults("age", 2);
        report.record_defaults("gender", 0);
        assert_eq!(report.defaults_filled.get("age"), Some(&3));
        assert!(!report.defaults_filled.contains_key("gender"));
        assert_eq!(report.total_defaults(), 3);
    }

    #[test]
    fn run_report_serializes() {
        let tables = vec![
            TableReport::written("dim_patients", 10),
            TableReport::failed("fact_visits", "schema drift"),
        ];
        let stage = StageReport::for_tables(tables, 12);
        assert_eq!(stage.status, StageStatus::Partial);
        let report = RunReport::new("start".to_string(), "end".to_string(), vec![stage]);
        let json = serde_json::to_string(&report).expect("serialize report");
        let round: RunReport = serde_json::from_str(&json).expect("deserialize report");
        assert_eq!(round.status, StageStatus::Partial);
        assert_eq!(round.stages[0].tables.len(), 2);
        assert_eq!(round.exit_code(), 2);
    }
}
