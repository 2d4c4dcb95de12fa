//! Loading raw extracts, locating inputs, writing outputs and profiling.

pub mod discovery;
pub mod error;
pub mod profile;
pub mod reader;
pub mod writer;

pub use discovery::{InputSet, discover_inputs, list_csv_files};
pub use error::{IngestError, Result};
pub use profile::{
    ColumnProfile, FileProfile, InferredType, NumericSummary, profile_csv, profile_frame, quantile,
};
pub use reader::{normalize_header, read_csv_frame, text_frame};
pub use writer::{frame_to_csv_bytes, write_bytes_atomic, write_csv_atomic};
