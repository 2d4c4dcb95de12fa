use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort a whole run before anything is committed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("another run holds the lock at {path} ({holder})")]
    LockHeld { path: PathBuf, holder: String },

    #[error("failed to {operation} lock file {path}: {source}")]
    Lock {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run timed out after {limit_secs}s (at {checkpoint})")]
    TimedOut { checkpoint: String, limit_secs: u64 },
}
