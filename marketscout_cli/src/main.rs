mod commands;
mod output;
mod xml_output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "marketscout")]
#[command(about = "Collect product listings from B2B marketplace category pages")]
struct Cli {
    /// Output format: table, json, csv, markdown or xml
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect every category in the registry and write the dataset
    Collect(commands::collect::CollectArgs),
    /// Extract products from a saved HTML page
    Extract(commands::extract::ExtractArgs),
    /// Summarize a collected dataset
    Summarize(commands::summarize::SummarizeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marketscout=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output)?;

    match &cli.command {
        Commands::Collect(args) => commands::collect::run(args, &format).await?,
        Commands::Extract(args) => commands::extract::run(args, &format)?,
        Commands::Summarize(args) => commands::summarize::run(args, &format)?,
    }

    Ok(())
}
