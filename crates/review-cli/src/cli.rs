//! CLI argument definitions for `row-review`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "row-review",
    version,
    about = "Review extracted table rows, classify columns and match names",
    long_about = "Walk an extracted table one row at a time.\n\n\
                  Each column gets a semantic type, the name column is matched \
                  against an identity registry, and each row is saved or skipped. \
                  Choices carry forward as defaults for the next row."
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

    /// Allow extracted values and names to appear in logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Review a table row by row.
    Review(ReviewArgs),

    /// Print an extracted table.
    Table(TableArgs),

    /// List the identities names are matched against.
    Registry(RegistryArgs),

    /// Rank the registry against one name.
    Match(MatchArgs),
}

#[derive(Args)]
pub struct RegistryArgs {
    /// JSON file of `{"id", "name"}` objects (default: built-in sample).
    #[arg(long = "registry", value_name = "FILE")]
    pub registry: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReviewArgs {
    /// Extracted table (.json or .csv). Without it, start with `load FILE`.
    #[arg(long = "table", value_name = "FILE")]
    pub table: Option<PathBuf>,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// TOML file with the type catalog and session settings.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Processing date sent with each row (default: config, then today).
    #[arg(long = "date", value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Read operator commands from a file instead of stdin.
    #[arg(long = "script", value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Make every N-th save attempt fail.
    #[arg(long = "fail-every", value_name = "N", default_value_t = 0)]
    pub fail_every: usize,

    /// Simulated save latency in milliseconds.
    #[arg(long = "latency-ms", value_name = "MS", default_value_t = 0)]
    pub latency_ms: u64,

    /// Write the saved rows as JSON.
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Candidates shown by the `candidates` command.
    #[arg(long = "limit", value_name = "N", default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args)]
pub struct TableArgs {
    /// Extracted table (.json or .csv).
    #[arg(value_name = "FILE")]
    pub table: PathBuf,
}

#[derive(Args)]
pub struct MatchArgs {
    /// Extracted name to rank against the registry.
    #[arg(value_name = "NAME")]
    pub name: String,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Number of candidates to show.
    #[arg(long = "limit", value_name = "N", default_value_t = 5)]
    pub limit: usize,
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
