// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::duration::parse_duration;
use crate::types::ReadinessCondition;

/// Command-line arguments for `devwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devwatch",
    version,
    about = "Supervise dev processes, classify their output and gate a pipeline on readiness.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Devwatch.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "Devwatch.toml")]
    pub config: PathBuf,

    /// Override `[config].status_dir`.
    #[arg(long, global = true, value_name = "DIR")]
    pub status_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVWATCH_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipeline, but don't execute any commands.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every configured stage in order.
    Run,

    /// Supervise a single command and record its output.
    Watch {
        /// Stage name; the snapshot is written to `<status_dir>/<name>-log.json`.
        #[arg(long, value_name = "NAME")]
        name: String,

        /// Treat the command as one shell line.
        #[arg(long)]
        shell: bool,

        /// Do not echo child output.
        #[arg(long)]
        quiet: bool,

        /// Command and arguments, after `--`.
        #[arg(trailing_var_arg = true, required = true, num_args = 1.., value_name = "CMD")]
        command: Vec<String>,
    },

    /// Block until a stage's snapshot satisfies a readiness condition.
    Wait {
        name: String,

        #[arg(long, value_name = "CONDITION", default_value = "compiled")]
        until: ReadinessCondition,

        /// Regex that also counts as ready when any log message matches.
        #[arg(long, value_name = "REGEX")]
        pattern: Option<String>,

        #[arg(long, value_name = "DURATION", default_value = "60s", value_parser = parse_duration)]
        timeout: Duration,
    },

    /// Print snapshot summaries.
    Status {
        /// Only this stage; all stages when omitted.
        name: Option<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
