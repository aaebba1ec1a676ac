//! CLI argument definitions for the gap-imputation tool.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "gapfill",
    version,
    about = "Gapfill - Impute missing values in tabular records",
    long_about = "Fill gaps in tabular records by stratified imputation.\n\n\
                  Records are partitioned by grouping dimensions and each gap is\n\
                  filled from donors in its own stratum, using the method the\n\
                  variable metadata assigns (mean, median, mode, pick, pick1, nan)."
)]
pub struct Cli {
    /// Path to the semicolon-separated records file.
    #[arg(value_name = "RECORDS_CSV")]
    pub records: PathBuf,

    /// Path to the variable metadata file.
    #[arg(long = "variables", value_name = "CSV")]
    pub variables: PathBuf,

    /// Path to the settings file.
    #[arg(long = "settings", value_name = "YAML")]
    pub settings: PathBuf,

    /// Write imputed records to this file (default: stdout).
    #[arg(long = "output", value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Grouping dimensions, most important first (overrides the settings).
    #[arg(long = "group-by", value_name = "DIMS", value_delimiter = ',')]
    pub group_by: Option<Vec<String>>,

    /// Record identifier column (overrides the settings).
    #[arg(long = "id", value_name = "COLUMN")]
    pub id: Option<String>,

    /// Seed for the pick method (overrides the settings).
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Donors a stratum must hold before donor-based methods fill anything.
    #[arg(long = "min-threshold", value_name = "N")]
    pub min_threshold: Option<usize>,

    /// Never reuse values imputed in an earlier round as donors.
    #[arg(long = "track-imputed")]
    pub track_imputed: bool,

    /// Stop after the finest stratification instead of retrying with fewer
    /// dimensions.
    #[arg(long = "no-drop-dimensions")]
    pub no_drop_dimensions: bool,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
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
