//! t2t-lineage CLI - column-level physical lineage resolver for Oracle T2T SQL

mod cli;
mod input;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use cli::{Args, OutputFormat};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(has_unresolved_warnings) => {
            if has_unresolved_warnings {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("t2t-lineage: error: {e:#}");
            ExitCode::from(66)
        }
    }
}

fn run() -> Result<bool> {
    let args = Args::parse();

    let sql = input::read_sql(&args.sql_file)?;
    let mapping_rows = input::read_mapping_rows(&args.mapping_rows)?;
    let data_model = input::read_data_model(&args.data_model)?;

    let (edges, diagnostics) = t2t_lineage_core::resolve_mapping(
        &sql,
        &mapping_rows,
        data_model.as_ref(),
        Some(args.max_depth),
    )
    .context("failed to resolve lineage")?;

    let output_str = match args.format {
        OutputFormat::Json => output::format_json(&edges, &diagnostics, args.compact),
        OutputFormat::Table => output::format_table(&edges, &diagnostics, args.quiet),
    };

    write_output(&args.output, &output_str)?;

    Ok(!diagnostics.warnings.is_empty())
}

fn write_output(path: &Option<std::path::PathBuf>, content: &str) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, content)
            .with_context(|| format!("failed to write to {}", path.display()))?;
    } else {
        io::stdout()
            .write_all(content.as_bytes())
            .context("failed to write to stdout")?;
        if !content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
