//! CLI argument definitions for the `metab` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "metab",
    version,
    about = "Harmonize and quality-control malnutrition metabolomics data",
    long_about = "Reconcile the metabolite, metadata and master sheets of a malnutrition \
                  metabolomics study into one per-patient dataset, then clean, filter and \
                  normalize the metabolite values.\n\n\
                  Every command reads a key = value configuration file."
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
    /// Harmonize, clean, filter and normalize, then write every artifact.
    Run(ConfigArgs),

    /// Match and assemble the source sheets into the canonical dataset.
    Harmonize(ConfigArgs),

    /// Clean, filter and normalize a previously written canonical dataset.
    Clean(CleanArgs),

    /// Print the effective configuration.
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Pipeline configuration file (key = value lines).
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config: PathBuf,

    /// Override the configured output directory.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Canonical dataset CSV (default: <output_dir>/harmonized_data.csv).
    #[arg(long = "input", short = 'i', value_name = "CSV")]
    pub input: Option<PathBuf>,
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
