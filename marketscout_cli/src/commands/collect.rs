//! The `collect` subcommand: run the full collection pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use marketscout_lib::{
    CategoryRegistry, Client, FetchConfig, Pipeline, ScoutConfig, TokioPacer,
};

use crate::output::{print_run_report, OutputFormat};

/// Arguments for the `collect` subcommand.
#[derive(Args)]
pub struct CollectArgs {
    /// Category registry: marketplace -> category label -> seed URL
    #[arg(long, default_value = "config/categories.yaml")]
    pub categories: PathBuf,

    /// Run configuration
    #[arg(long, default_value = "config/config.yaml")]
    pub config: PathBuf,

    /// Maximum records per category (overrides limit_per_category)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Archive every fetched page under raw_dir
    #[arg(long)]
    pub save_raw: bool,

    /// Directory for the JSONL and CSV outputs (overrides output_dir)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Applies command-line overrides on top of the file config.
fn apply_overrides(mut config: ScoutConfig, args: &CollectArgs) -> ScoutConfig {
    if let Some(limit) = args.limit {
        config.limit_per_category = limit;
    }
    if args.save_raw {
        config.save_raw_html = true;
    }
    if let Some(ref dir) = args.output_dir {
        config.output_dir = dir.clone();
    }
    config
}

pub async fn run(args: &CollectArgs, format: &OutputFormat) -> Result<()> {
    let config = apply_overrides(ScoutConfig::load(&args.config)?, args);
    let registry = CategoryRegistry::load(&args.categories)?;

    eprintln!(
        "Collecting {} categories across {} marketplaces (limit {} per category)",
        registry.category_count(),
        registry.marketplaces.len(),
        config.limit_per_category
    );

    let client = Client::new(FetchConfig::from_env(config.max_retries));
    let pb = ProgressBar::new(registry.category_count() as u64);
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}",
    )?);
    pb.set_message("collecting...");

    let report = Pipeline::new(&config, &client, &TokioPacer)
        .run(&registry, |outcome| {
            pb.inc(1);
            pb.set_message(format!(
                "{}/{}: {} accepted",
                outcome.marketplace, outcome.category, outcome.accepted_count
            ));
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    for rejection in &report.rejections {
        eprintln!(
            "Rejected {}/{} {:?}: {}",
            rejection.marketplace, rejection.category, rejection.title, rejection.reason
        );
    }

    print_run_report(&report, format)?;
    eprintln!(
        "Collection complete: {} records written",
        report.total_written
    );
    Ok(())
}
