//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cmed-resolve",
    version,
    about = "Resolve invoice line items against the CMED price table",
    long_about = "Builds a canonical product registry from a CMED price-table export,\n\
                  then resolves NF-e invoice line items against it through a\n\
                  three-tier cascade: exact barcode, unique description, fuzzy score."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
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
    /// Build the registry and resolve a transaction file against it.
    Resolve(ResolveArgs),

    /// Print the correction-rule table in application order.
    Rules(RulesArgs),
}

#[derive(Parser)]
pub struct ResolveArgs {
    /// CMED price-table CSV (registry input).
    #[arg(value_name = "REGISTRY_CSV")]
    pub registry: PathBuf,

    /// Invoice line-item CSV (transaction input).
    #[arg(value_name = "TRANSACTIONS_CSV")]
    pub transactions: PathBuf,

    /// Output directory (default: <TRANSACTIONS_CSV dir>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Minimum composite score for a tier-3 match to be accepted.
    #[arg(long = "threshold")]
    pub threshold: Option<f64>,

    /// Tier-3 weight of product-name similarity.
    #[arg(long = "weight-name")]
    pub weight_name: Option<f64>,

    /// Tier-3 weight of ingredient token overlap.
    #[arg(long = "weight-ingredient")]
    pub weight_ingredient: Option<f64>,

    /// Tier-3 weight of laboratory similarity.
    #[arg(long = "weight-laboratory")]
    pub weight_laboratory: Option<f64>,

    /// Days of gap still treated as contiguous when merging validity
    /// intervals.
    #[arg(long = "gap-tolerance", value_name = "DAYS")]
    pub gap_tolerance: Option<i64>,

    /// JSON rule-table override (replaces the built-in correction rules).
    #[arg(long = "rule-table", value_name = "PATH")]
    pub rule_table: Option<PathBuf>,

    /// Wall-clock budget in seconds for the whole batch. On expiry,
    /// partial results are persisted with an incomplete-run marker.
    #[arg(long = "time-budget", value_name = "SECONDS")]
    pub time_budget: Option<u64>,

    /// Stable source identifier folded into transaction row ids
    /// (default: the transaction file name).
    #[arg(long = "source-id", value_name = "ID")]
    pub source_id: Option<String>,
}

#[derive(Parser)]
pub struct RulesArgs {
    /// JSON rule-table override to print instead of the built-in table.
    #[arg(long = "rule-table", value_name = "PATH")]
    pub rule_table: Option<PathBuf>,
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
