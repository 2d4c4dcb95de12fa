//! Entity cleaners and their registry.
//!
//! Every cleaner runs the same schema-driven sequence:
//!
//! 1. trim column names
//! 2. normalize the schema's columns (null tokens, trimming, casing)
//! 3. coerce typed columns, filling defaults and dropping rows per policy
//! 4. apply the entity's own rules ([`EntityCleaner::apply_rules`])
//! 5. deduplicate on the natural key, first occurrence wins
//!
//! A column missing from the input skips the rules that need it and is
//! recorded in the [`CleanReport`]; it never fails the entity.
//!
//! ```ignore
//! use hdw_clean::default_registry;
//! use hdw_model::Entity;
//!
//! let cleaner = default_registry().get(Entity::Visit)?;
//! let (clean, report) = cleaner.clean(raw)?;
//! ```

mod date;
mod schema;
mod visit;

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Instant;

use hdw_common::{filter_rows, has_column};
use hdw_model::{CleanReport, Entity, EntitySchema, schema_for};
use polars::prelude::DataFrame;
use tracing::{debug, info_span, warn};

use crate::coerce::coerce_column;
use crate::dedupe::dedupe_by_key;
use crate::error::{CleanError, Result};
use crate::normalize::{normalize_columns, trim_column_names};

pub use date::DateCleaner;
pub use schema::SchemaCleaner;
pub use visit::{VisitCleaner, reconcile_payment};

/// Cleaning procedure for one entity.
pub trait EntityCleaner: Send + Sync {
    fn entity(&self) -> Entity;

    fn schema(&self) -> &'static EntitySchema {
        schema_for(self.entity())
    }

    /// Entity-specific rules, run after coercion and before deduplication.
    fn apply_rules(&self, _df: &mut DataFrame, _report: &mut CleanReport) -> Result<()> {
        Ok(())
    }

    /// Cleans a raw table, returning the cleaned table and its report.
    fn clean(&self, df: DataFrame) -> Result<(DataFrame, CleanReport)> {
        clean_with_schema(self, df)
    }
}

/// Runs the shared cleaning sequence for `cleaner`.
pub fn clean_with_schema<C: EntityCleaner + ?Sized>(
    cleaner: &C,
    mut df: DataFrame,
) -> Result<(DataFrame, CleanReport)> {
    let entity = cleaner.entity();
    let schema = cleaner.schema();
    let span = info_span!("clean_entity", entity = %entity);
    let _guard = span.enter();
    let start = Instant::now();
    let mut report = CleanReport::new(entity, df.height());

    trim_column_names(&mut df)?;

    let skipped = normalize_columns(
        &mut df,
        schema.columns.iter().map(|spec| (spec.name, spec.text)),
    )?;
    for column in &skipped {
        warn!(entity = %entity, column = %column, "column missing, rules skipped");
        report.skip_rule(column, "normalize");
        if let Some(spec) = schema.column(column) {
            report.skip_rule(column, &format!("coerce {}", spec.kind.label()));
        }
    }

    let mut keep = vec![true; df.height()];
    for spec in schema.columns {
        if !has_column(&df, spec.name) {
            continue;
        }
        let column_keep = coerce_column(&mut df, spec, &mut report)?;
        for (row, keep_row) in keep.iter_mut().zip(column_keep) {
            *row &= keep_row;
        }
    }
    let dropped = keep.iter().filter(|keep| !**keep).count();
    if dropped > 0 {
        df = filter_rows(&df, &keep)?;
        report.rows_dropped = dropped;
    }

    cleaner.apply_rules(&mut df, &mut report)?;

    if !has_column(&df, schema.key) {
        report.skip_rule(schema.key, "dedupe by key");
    }
    let (df, removed) = dedupe_by_key(&df, Some(schema.key))?;
    report.duplicates_removed = removed;
    report.output_rows = df.height();

    debug!(
        entity = %entity,
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        duplicates_removed = removed,
        rows_dropped = report.rows_dropped,
        duration_ms = start.elapsed().as_millis() as u64,
        "entity cleaned"
    );
    Ok((df, report))
}

/// Registry of entity cleaners indexed by entity.
pub struct CleanerRegistry {
    cleaners: HashMap<Entity, Box<dyn EntityCleaner>>,
}

impl CleanerRegistry {
    pub fn new() -> Self {
        Self {
            cleaners: HashMap::new(),
        }
    }

    /// Registers a cleaner for its entity, replacing any previous one.
    pub fn register(&mut self, cleaner: Box<dyn EntityCleaner>) {
        self.cleaners.insert(cleaner.entity(), cleaner);
    }

    pub fn get(&self, entity: Entity) -> Result<&dyn EntityCleaner> {
        self.cleaners
            .get(&entity)
            .map(|cleaner| cleaner.as_ref())
            .ok_or(CleanError::NoCleaner(entity))
    }

    pub fn len(&self) -> usize {
        self.cleaners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleaners.is_empty()
    }

    /// Registered entities in cleaning order.
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.cleaners.keys().copied().collect();
        entities.sort();
        entities
    }
}

impl Default for CleanerRegistry {
    fn default() -> Self {
        build_default_registry()
    }
}

static DEFAULT_REGISTRY: OnceLock<CleanerRegistry> = OnceLock::new();

/// Registry with a cleaner for every entity, built on first access.
pub fn default_registry() -> &'static CleanerRegistry {
    DEFAULT_REGISTRY.get_or_init(build_default_registry)
}

fn build_default_registry() -> CleanerRegistry {
    let mut registry = CleanerRegistry::new();
    registry.register(Box::new(SchemaCleaner::new(Entity::Patient)));
    registry.register(Box::new(SchemaCleaner::new(Entity::Doctor)));
    registry.register(Box::new(SchemaCleaner::new(Entity::Department)));
    registry.register(Box::new(SchemaCleaner::new(Entity::Diagnosis)));
    registry.register(Box::new(DateCleaner));
    registry.register(Box::new(VisitCleaner));
    registry
}

/// Cleans `df` with the default cleaner for `entity`.
pub fn clean_entity(entity: Entity, df: DataFrame) -> Result<(DataFrame, CleanReport)> {
    default_registry().get(entity)?.clean(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_every_entity() {
        let registry = default_registry();
        assert_eq!(registry.len(), Entity::ALL.len());
        for entity in Entity::ALL {
            assert_eq!(registry.get(entity).unwrap().entity(), entity);
        }
        assert_eq!(registry.entities(), Entity::ALL.to_vec());
    }

    #[test]
    fn empty_registry_reports_missing_cleaner() {
        let registry = CleanerRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(Entity::Visit),
            Err(CleanError::NoCleaner(Entity::Visit))
        ));
    }
}
