use hdw_model::Entity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("no cleaner registered for {0}")]
    NoCleaner(Entity),

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for CleanError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;
