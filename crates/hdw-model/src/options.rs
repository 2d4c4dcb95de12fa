//! Options controlling fact resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// What the fact resolver does with visits whose foreign keys do not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanPolicy {
    /// Keep the row with a missing key.
    #[default]
    NullKey,
    /// Remove the row.
    Drop,
    /// Refuse to produce the fact table.
    Fail,
}

impl OrphanPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanPolicy::NullKey => "null-key",
            OrphanPolicy::Drop => "drop",
            OrphanPolicy::Fail => "fail",
        }
    }
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrphanPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "null-key" | "null" => Ok(OrphanPolicy::NullKey),
            "drop" => Ok(OrphanPolicy::Drop),
            "fail" => Ok(OrphanPolicy::Fail),
            _ => Err(ModelError::UnknownOrphanPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TransformOptions {
    pub orphan_policy: OrphanPolicy,
    /// Treat a visit without a resolvable `date_id` as an orphan.
    pub strict_dates: bool,
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    pub fn with_strict_dates(mut self, strict: bool) -> Self {
        self.strict_dates = strict;
        self
    }
}
