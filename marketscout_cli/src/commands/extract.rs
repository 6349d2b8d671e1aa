//! The `extract` subcommand: run the extraction engine on a saved page.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use marketscout_lib::{normalize_all, resolve_profiles, Extractor, ScoutConfig};

use crate::output::{print_products, OutputFormat};

/// Arguments for the `extract` subcommand.
#[derive(Args)]
pub struct ExtractArgs {
    /// Saved HTML page, e.g. one archived with --save-raw
    pub html_file: PathBuf,

    /// Marketplace descriptor to extract with
    #[arg(long)]
    pub marketplace: String,

    /// URL the page was fetched from; relative links resolve against it
    #[arg(long)]
    pub page_url: String,

    /// Category label written to each record
    #[arg(long, default_value = "uncategorized")]
    pub category: String,

    /// Config file providing extra marketplace descriptors
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &ExtractArgs, format: &OutputFormat) -> Result<()> {
    let config = match args.config {
        Some(ref path) => ScoutConfig::load(path)?,
        None => ScoutConfig::default(),
    };
    let mut profiles = resolve_profiles(&config.marketplaces);
    let profile = profiles.remove(&args.marketplace).ok_or_else(|| {
        anyhow!(
            "unknown marketplace '{}' (known: {})",
            args.marketplace,
            profiles.keys().cloned().collect::<Vec<_>>().join(", ")
        )
    })?;
    let extractor = Extractor::new(profile)?;

    let html = std::fs::read_to_string(&args.html_file)
        .with_context(|| format!("failed to read {}", args.html_file.display()))?;
    let page = extractor.extract(&html, &args.page_url, &args.category);
    eprintln!(
        "{:?} pass produced {} candidates",
        page.pass,
        page.candidates.len()
    );

    let (products, rejections) = normalize_all(page.candidates);
    for rejection in &rejections {
        eprintln!("Rejected {:?}: {}", rejection.title, rejection.reason);
    }
    print_products(&products, format)
}
