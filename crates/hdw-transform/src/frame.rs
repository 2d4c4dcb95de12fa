use polars::prelude::DataFrame;

/// A named output table of the transform stage.
#[derive(Debug, Clone)]
pub struct TableFrame {
    /// Table name, also the output file stem (`dim_patients`, `fact_visits`).
    pub name: String,
    pub data: DataFrame,
}

impl TableFrame {
    pub fn new(name: impl Into<String>, data: DataFrame) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }

    pub fn record_count(&self) -> usize {
        self.data.height()
    }
}
