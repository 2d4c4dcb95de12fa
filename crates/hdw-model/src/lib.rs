pub mod entity;
pub mod error;
pub mod options;
pub mod policy;
pub mod report;
pub mod schema;

pub use entity::Entity;
pub use error::{ModelError, Result};
pub use options::{OrphanPolicy, TransformOptions};
pub use policy::{DefaultPolicy, FillValue, ResolvedDefault, median};
pub use report::{
    CleanReport, EntityOutcome, OutcomeStatus, RunReport, SkippedRule, Stage, StageReport,
    StageStatus, TableReport,
};
pub use schema::{
    Bounds, CategorySet, ColumnKind, ColumnSpec, DimensionSpec, EntitySchema, FACT_COLUMNS,
    FACT_REQUIRED_COLUMNS, FACT_TABLE, TextRule, schema_for,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_round_trip() {
        for entity in Entity::ALL {
            assert_eq!(entity.as_str().parse::<Entity>().unwrap(), entity);
            assert_eq!(entity.file_stem().parse::<Entity>().unwrap(), entity);
        }
        assert!("nurses".parse::<Entity>().is_err());
    }

    #[test]
    fn file_names_follow_the_stem() {
        assert_eq!(Entity::Diagnosis.raw_file_name(), "diagnoses.csv");
        assert_eq!(Entity::Visit.clean_file_name(), "visits_clean.csv");
    }
}
