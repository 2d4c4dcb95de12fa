//! Healthcare data warehouse pipeline CLI.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use hdw_cli::logging::{LogConfig, LogFormat, init_logging};
use hdw_cli::{PipelineConfig, StageSelection, execute, execute_profile};
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, RunArgs};
use crate::summary::{print_entities, print_error, print_profile_summary, print_run_summary};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Profile(args) => run_profile(args),
        Command::Clean(args) => run_stages(args, StageSelection::Clean),
        Command::Transform(args) => run_stages(args, StageSelection::Transform),
        Command::Run(args) => run_stages(args, StageSelection::All),
        Command::Entities => {
            print_entities();
            Ok(0)
        }
    };
    let exit_code = match result {
        Ok(code) => code,
        Err(error) => {
            print_error(&error);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run_profile(args: &RunArgs) -> Result<i32> {
    let config = PipelineConfig::resolve(args.config.as_deref(), &args.overrides())?;
    let (run, report_path) = execute_profile(&config)?;
    print_profile_summary(&run, &report_path);
    Ok(run.stage_report().status.exit_code())
}

fn run_stages(args: &RunArgs, selection: StageSelection) -> Result<i32> {
    let config = PipelineConfig::resolve(args.config.as_deref(), &args.overrides())?;
    let outcome = execute(&config, selection)?;
    print_run_summary(&outcome);
    Ok(outcome.exit_code())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
