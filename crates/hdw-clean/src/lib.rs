//! Cleaning and standardization of raw warehouse entities.
//!
//! The [`normalize`] module is the entity-agnostic Field Normalizer,
//! [`coerce`] types cells under default policies, and [`cleaners`] holds the
//! per-entity procedures behind [`EntityCleaner`].

pub mod cleaners;
pub mod coerce;
pub mod dates;
pub mod dedupe;
pub mod error;
pub mod normalize;

pub use cleaners::{
    CleanerRegistry, DateCleaner, EntityCleaner, SchemaCleaner, VisitCleaner, clean_entity,
    clean_with_schema, default_registry, reconcile_payment,
};
pub use coerce::{CellValue, Coerced, coerce, parse_cell};
pub use dates::{DateParts, date_id, parse_date};
pub use dedupe::dedupe_by_key;
pub use error::{CleanError, Result};
pub use normalize::{normalize_value, standardize_missing, title_case};
