use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// Required source columns or tables are absent.
    #[error("schema drift in {table}: missing {}", .missing.join(", "))]
    SchemaDrift { table: String, missing: Vec<String> },

    #[error("{table}: unresolved foreign keys {}", format_counts(.counts))]
    OrphanKeys {
        table: String,
        counts: BTreeMap<String, usize>,
    },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(key, count)| format!("{key}={count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<polars::prelude::PolarsError> for TransformError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransformError::SchemaDrift {
            table: "dim_patients".to_string(),
            missing: vec!["gender".to_string(), "age".to_string()],
        };
        assert_eq!(err.to_string(), "schema drift in dim_patients: missing gender, age");

        let counts = BTreeMap::from([("diagnosis_id".to_string(), 2)]);
        let err = TransformError::OrphanKeys {
            table: "fact_visits".to_string(),
            counts,
        };
        assert_eq!(err.to_string(), "fact_visits: unresolved foreign keys diagnosis_id=2");
    }
}
