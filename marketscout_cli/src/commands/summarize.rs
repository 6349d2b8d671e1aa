//! The `summarize` subcommand: descriptive statistics over a saved dataset.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use marketscout_lib::storage::{read_csv, read_jsonl};
use marketscout_lib::summarize;

use crate::output::{print_summary, OutputFormat};

/// Arguments for the `summarize` subcommand.
#[derive(Args)]
pub struct SummarizeArgs {
    /// Products file written by `collect` (.csv or .jsonl)
    #[arg(long, default_value = "data/processed/products.csv")]
    pub input: PathBuf,

    /// Number of suppliers to list
    #[arg(long, default_value = "10")]
    pub top: usize,
}

pub fn run(args: &SummarizeArgs, format: &OutputFormat) -> Result<()> {
    let products = match args.input.extension().and_then(|e| e.to_str()) {
        Some("jsonl") => read_jsonl(&args.input)?,
        _ => read_csv(&args.input)?,
    };
    eprintln!("Loaded {} products from {}", products.len(), args.input.display());
    print_summary(&summarize(&products, args.top), format)
}
