use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Source entities of the warehouse, in cleaning order.
///
/// Every entity except [`Entity::Visit`] becomes a dimension table; visits
/// become the fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Patient,
    Doctor,
    Department,
    Diagnosis,
    Date,
    Visit,
}

impl Entity {
    pub const ALL: [Entity; 6] = [
        Entity::Patient,
        Entity::Doctor,
        Entity::Department,
        Entity::Diagnosis,
        Entity::Date,
        Entity::Visit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Patient => "patient",
            Entity::Doctor => "doctor",
            Entity::Department => "department",
            Entity::Diagnosis => "diagnosis",
            Entity::Date => "date",
            Entity::Visit => "visit",
        }
    }

    /// File stem of the raw extract (`patients` for `patients.csv`).
    pub fn file_stem(&self) -> &'static str {
        match self {
            Entity::Patient => "patients",
            Entity::Doctor => "doctors",
            Entity::Department => "departments",
            Entity::Diagnosis => "diagnoses",
            Entity::Date => "dates",
            Entity::Visit => "visits",
        }
    }

    pub fn raw_file_name(&self) -> String {
        format!("{}.csv", self.file_stem())
    }

    pub fn clean_file_name(&self) -> String {
        format!("{}_clean.csv", self.file_stem())
    }

    pub fn is_fact(&self) -> bool {
        matches!(self, Entity::Visit)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = ModelError;

    /// Accepts the singular name or the file stem, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Entity::ALL
            .into_iter()
            .find(|entity| entity.as_str() == normalized || entity.file_stem() == normalized)
            .ok_or_else(|| ModelError::UnknownEntity(s.to_string()))
    }
}
