//! Pipeline driver components behind the `hdw` binary.

pub mod config;
pub mod deadline;
pub mod error;
pub mod lock;
pub mod logging;
pub mod pipeline;
pub mod profile;
pub mod run_log;

pub use config::{ConfigOverrides, PipelineConfig};
pub use deadline::RunDeadline;
pub use error::RunError;
pub use lock::RunLock;
pub use pipeline::{RunOutcome, StageSelection, execute, execute_profile};
