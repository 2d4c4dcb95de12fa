use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("unknown orphan policy: {0} (expected null-key, drop or fail)")]
    UnknownOrphanPolicy(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
