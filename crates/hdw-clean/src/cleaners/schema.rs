use hdw_model::Entity;

use super::EntityCleaner;

/// Cleaner whose rules are fully described by the entity schema.
///
/// Patients, doctors, departments and diagnoses need nothing beyond
/// normalization, coercion with defaults and key deduplication.
pub struct SchemaCleaner {
    entity: Entity,
}

impl SchemaCleaner {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

impl EntityCleaner for SchemaCleaner {
    fn entity(&self) -> Entity {
        self.entity
    }
}
