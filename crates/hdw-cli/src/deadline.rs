use std::time::{Duration, Instant};

use tracing::error;

use crate::error::RunError;

/// Wall-clock budget of a run, checked between entities and stages.
#[derive(Debug, Clone, Copy)]
pub struct RunDeadline {
    started: Instant,
    limit: Option<Duration>,
}

impl RunDeadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fails with [`RunError::TimedOut`] once the budget is spent.
    pub fn check(&self, checkpoint: &str) -> Result<(), RunError> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => {
                error!(checkpoint, limit_secs = limit.as_secs(), "run timed out");
                Err(RunError::TimedOut {
                    checkpoint: checkpoint.to_string(),
                    limit_secs: limit.as_secs(),
                })
            }
            _ => Ok(()),
        }
    }
}
