//! CLI argument parsing using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// t2t-lineage - column-level physical lineage resolver for Oracle T2T SQL
#[derive(Parser, Debug)]
#[command(name = "t2t-lineage")]
#[command(about = "Resolve column-level physical lineage for a T2T SQL transformation", long_about = None)]
#[command(version)]
pub struct Args {
    /// SQL file to analyze (reads from stdin if omitted)
    #[arg(value_name = "SQL_FILE")]
    pub sql_file: Option<PathBuf>,

    /// Mapping-rows file (.csv or .json) declaring the target columns to trace
    #[arg(short, long, value_name = "FILE")]
    pub mapping_rows: PathBuf,

    /// Physical data-model JSON file, used for DM match/mismatch verdicts
    #[arg(short, long, value_name = "FILE")]
    pub data_model: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Maximum scope-tree recursion depth before a reference is given up on
    #[arg(long, default_value_t = 50)]
    pub max_depth: usize,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Suppress the warnings summary on stderr
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_args() {
        let args = Args::parse_from(["t2t-lineage", "-m", "rows.csv", "script.sql"]);
        assert_eq!(args.sql_file.unwrap().to_str().unwrap(), "script.sql");
        assert_eq!(args.mapping_rows.to_str().unwrap(), "rows.csv");
        assert_eq!(args.format, OutputFormat::Table);
        assert_eq!(args.max_depth, 50);
        assert!(args.data_model.is_none());
    }

    #[test]
    fn test_parse_full_args() {
        let args = Args::parse_from([
            "t2t-lineage",
            "-f",
            "json",
            "-m",
            "rows.json",
            "-d",
            "dm.json",
            "-o",
            "out.json",
            "--max-depth",
            "10",
            "--compact",
            "--quiet",
            "script.sql",
        ]);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.data_model.unwrap().to_str().unwrap(), "dm.json");
        assert_eq!(args.output.unwrap().to_str().unwrap(), "out.json");
        assert_eq!(args.max_depth, 10);
        assert!(args.compact);
        assert!(args.quiet);
    }
}
