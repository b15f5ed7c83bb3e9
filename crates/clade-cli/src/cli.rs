//! CLI argument definitions for the clade exporter.

use std::path::PathBuf;

use clade_export::ExportKind;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "clade-export",
    version,
    about = "Export clade analysis results to CSV, TSV, JSON, FASTA, trees and archives",
    long_about = "Export clade analysis results.\n\n\
                  Reads analysis outcomes (JSON array or NDJSON) and the dataset bundles\n\
                  they were produced with, and writes the selected output formats."
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

    /// Settings file (default: the user config directory).
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export analysis outcomes.
    Export(ExportArgs),

    /// Show the column layout used by CSV, TSV and Excel exports.
    Columns(ColumnsArgs),

    /// Write a settings file filled with the defaults.
    InitConfig(InitConfigArgs),
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Analysis outcomes, as a JSON array or one JSON object per line.
    #[arg(value_name = "OUTCOMES")]
    pub outcomes: PathBuf,

    /// JSON array of the dataset bundles used for the analysis.
    #[arg(long = "datasets", value_name = "FILE")]
    pub datasets: PathBuf,

    /// Output directory for generated files.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Formats to write (default: all).
    #[arg(long = "format", value_enum, value_delimiter = ',')]
    pub format: Vec<ExportFormatArg>,

    /// Restrict per-dataset formats to these datasets.
    #[arg(long = "dataset", value_name = "NAME")]
    pub dataset: Vec<String>,

    /// Column categories, column names or keywords for tabular formats.
    #[arg(long = "columns", value_name = "NAME", value_delimiter = ',')]
    pub columns: Vec<String>,
}

#[derive(Parser)]
pub struct ColumnsArgs {
    /// Preview this selection instead of the configured one.
    #[arg(long = "columns", value_name = "NAME", value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Start from the column layout shipped with these datasets.
    #[arg(long = "datasets", value_name = "FILE")]
    pub datasets: Option<PathBuf>,
}

#[derive(Parser)]
pub struct InitConfigArgs {
    /// Where to write (default: the user config directory).
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Replace an existing file.
    #[arg(long = "force")]
    pub force: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormatArg {
    Csv,
    Tsv,
    Json,
    Ndjson,
    Fasta,
    Peptides,
    Tree,
    TreeNwk,
    Gff,
    Tbl,
    Excel,
    Unclassified,
    Zip,
}

impl ExportFormatArg {
    pub fn kind(self) -> ExportKind {
        match self {
            Self::Csv => ExportKind::Csv,
            Self::Tsv => ExportKind::Tsv,
            Self::Json => ExportKind::Json,
            Self::Ndjson => ExportKind::Ndjson,
            Self::Fasta => ExportKind::Fasta,
            Self::Peptides => ExportKind::Peptides,
            Self::Tree => ExportKind::Tree,
            Self::TreeNwk => ExportKind::TreeNwk,
            Self::Gff => ExportKind::Gff,
            Self::Tbl => ExportKind::Tbl,
            Self::Excel => ExportKind::Excel,
            Self::Unclassified => ExportKind::Unclassified,
            Self::Zip => ExportKind::Zip,
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn formats_accept_comma_lists() {
        let cli = Cli::parse_from([
            "clade-export",
            "export",
            "out.ndjson",
            "--datasets",
            "datasets.json",
            "--format",
            "csv,tree-nwk",
            "--format",
            "zip",
        ]);
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        let kinds: Vec<_> = args.format.iter().map(|format| format.kind()).collect();
        assert_eq!(kinds, [ExportKind::Csv, ExportKind::TreeNwk, ExportKind::Zip]);
        assert_eq!(args.output_dir, PathBuf::from("output"));
    }
}
