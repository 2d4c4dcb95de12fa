//! CLI argument definitions for the warehouse pipeline.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use hdw_cli::ConfigOverrides;
use hdw_model::OrphanPolicy;

#[derive(Parser)]
#[command(
    name = "hdw",
    version,
    about = "Healthcare data warehouse pipeline - profile, clean and transform raw extracts",
    long_about = "Build a star-schema healthcare data warehouse from raw CSV extracts.\n\n\
                  Cleans patients, doctors, departments, diagnoses, dates and visits,\n\
                  then projects dimension tables and resolves the visits fact table."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Profile the raw extracts and write the data-quality report.
    Profile(RunArgs),

    /// Clean the raw extracts into `<stem>_clean.csv` tables.
    Clean(RunArgs),

    /// Build dimension and fact tables from the cleaned tables.
    Transform(RunArgs),

    /// Clean, then transform, committing both at the end.
    Run(RunArgs),

    /// List the entities with their key and dimension columns.
    Entities,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Configuration file (default: ./hdw.toml when present).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the raw entity CSV files.
    #[arg(long = "raw-dir", value_name = "DIR")]
    pub raw_dir: Option<PathBuf>,

    /// Directory for the cleaned tables.
    #[arg(long = "clean-dir", value_name = "DIR")]
    pub clean_dir: Option<PathBuf>,

    /// Directory for dimension and fact tables and run_report.json.
    #[arg(long = "processed-dir", value_name = "DIR")]
    pub processed_dir: Option<PathBuf>,

    /// Directory for the cleaning and transform logs.
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Directory for the data-quality report.
    #[arg(long = "report-dir", value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// What to do with visits whose diagnosis or department does not resolve.
    #[arg(long = "orphan-policy", value_enum)]
    pub orphan_policy: Option<OrphanPolicyArg>,

    /// Treat visits with an unparseable date as orphans.
    #[arg(long = "strict-dates")]
    pub strict_dates: bool,

    /// Abort the run when it exceeds this many seconds.
    #[arg(long = "timeout-secs", value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            raw_dir: self.raw_dir.clone(),
            clean_dir: self.clean_dir.clone(),
            processed_dir: self.processed_dir.clone(),
            log_dir: self.log_dir.clone(),
            report_dir: self.report_dir.clone(),
            orphan_policy: self.orphan_policy.map(OrphanPolicy::from),
            strict_dates: self.strict_dates,
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OrphanPolicyArg {
    /// Keep the visit with an empty key.
    NullKey,
    /// Remove the visit.
    Drop,
    /// Refuse to write the fact table.
    Fail,
}

impl From<OrphanPolicyArg> for OrphanPolicy {
    fn from(arg: OrphanPolicyArg) -> Self {
        match arg {
            OrphanPolicyArg::NullKey => OrphanPolicy::NullKey,
            OrphanPolicyArg::Drop => OrphanPolicy::Drop,
            OrphanPolicyArg::Fail => OrphanPolicy::Fail,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
