//! Run configuration: directory layout and transform options.
//!
//! Values come from the built-in defaults, then an optional TOML file, then
//! command-line overrides. A file only needs the keys it changes:
//!
//! ```toml
//! raw_dir = "extracts/2024-06"
//! orphan_policy = "drop"
//! timeout_secs = 600
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hdw_model::{OrphanPolicy, TransformOptions};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lock::DEFAULT_STALE_AFTER;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "hdw.toml";

pub const CLEANING_LOG_FILE: &str = "data_cleaning_log.txt";
pub const TRANSFORM_LOG_FILE: &str = "data_transform_log.txt";
pub const QUALITY_REPORT_FILE: &str = "data_quality_report.txt";
pub const RUN_REPORT_FILE: &str = "run_report.json";

/// Slack past the run timeout before a leftover lock counts as stale.
const LOCK_GRACE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub clean_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Where the data-quality report is written.
    pub report_dir: PathBuf,
    pub orphan_policy: OrphanPolicy,
    pub strict_dates: bool,
    /// Wall-clock limit for a whole run; none when absent.
    pub timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            clean_dir: PathBuf::from("data/clean"),
            processed_dir: PathBuf::from("data/processed"),
            log_dir: PathBuf::from("logs"),
            report_dir: PathBuf::from("docs"),
            orphan_policy: OrphanPolicy::default(),
            strict_dates: false,
            timeout_secs: None,
        }
    }
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub raw_dir: Option<PathBuf>,
    pub clean_dir: Option<PathBuf>,
    pub processed_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub orphan_policy: Option<OrphanPolicy>,
    pub strict_dates: bool,
    pub timeout_secs: Option<u64>,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse pipeline configuration")
    }

    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read configuration file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("invalid configuration file {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Resolves the configuration for a run.
    ///
    /// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// used when present and the defaults otherwise.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.raw_dir {
            self.raw_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.clean_dir {
            self.clean_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.processed_dir {
            self.processed_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.log_dir {
            self.log_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.report_dir {
            self.report_dir.clone_from(dir);
        }
        if let Some(policy) = overrides.orphan_policy {
            self.orphan_policy = policy;
        }
        if overrides.strict_dates {
            self.strict_dates = true;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = Some(secs);
        }
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions::new()
            .with_orphan_policy(self.orphan_policy)
            .with_strict_dates(self.strict_dates)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Age after which a leftover run lock is taken over: the run timeout
    /// plus a minute of grace, or a day when runs are unbounded.
    pub fn lock_stale_after(&self) -> Duration {
        self.timeout()
            .map_or(DEFAULT_STALE_AFTER, |timeout| timeout + LOCK_GRACE)
    }

    pub fn cleaning_log_path(&self) -> PathBuf {
        self.log_dir.join(CLEANING_LOG_FILE)
    }

    pub fn transform_log_path(&self) -> PathBuf {
        self.log_dir.join(TRANSFORM_LOG_FILE)
    }

    pub fn quality_report_path(&self) -> PathBuf {
        self.report_dir.join(QUALITY_REPORT_FILE)
    }

    pub fn run_report_path(&self) -> PathBuf {
        self.processed_dir.join(RUN_REPORT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_data_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.raw_dir, PathBuf::from("data/raw"));
        assert_eq!(config.cleaning_log_path(), PathBuf::from("logs/data_cleaning_log.txt"));
        assert_eq!(
            config.quality_report_path(),
            PathBuf::from("docs/data_quality_report.txt")
        );
        assert_eq!(config.orphan_policy, OrphanPolicy::NullKey);
        assert!(config.timeout().is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = PipelineConfig::from_toml_str(
            "raw_dir = \"extracts\"\norphan_policy = \"drop\"\ntimeout_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.raw_dir, PathBuf::from("extracts"));
        assert_eq!(config.clean_dir, PathBuf::from("data/clean"));
        assert_eq!(config.orphan_policy, OrphanPolicy::Drop);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn lock_staleness_follows_the_timeout() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.lock_stale_after(), DEFAULT_STALE_AFTER);
        config.timeout_secs = Some(600);
        assert_eq!(config.lock_stale_after(), Duration::from_secs(660));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PipelineConfig::from_toml_str("raw_directory = \"x\"").is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = PipelineConfig::from_toml_str("orphan_policy = \"fail\"").unwrap();
        config.apply(&ConfigOverrides {
            processed_dir: Some(PathBuf::from("out")),
            orphan_policy: Some(OrphanPolicy::NullKey),
            strict_dates: true,
            ..ConfigOverrides::default()
        });
        assert_eq!(config.processed_dir, PathBuf::from("out"));
        assert_eq!(config.run_report_path(), PathBuf::from("out/run_report.json"));
        let options = config.transform_options();
        assert_eq!(options.orphan_policy, OrphanPolicy::NullKey);
        assert!(options.strict_dates);
    }

    #[test]
    fn serializes_back_to_toml() {
        let config = PipelineConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }
}
