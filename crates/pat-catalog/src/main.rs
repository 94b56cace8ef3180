// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! pat-catalog - entry point

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pat_catalog::serializer::write_catalog;
use pat_catalog::{Aggregator, ArchitectureSet, load_config};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "pat-catalog")]
#[command(author, version, about = "Build a catalog of DSM firmware packages per architecture and model")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML config overriding endpoints and transport settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the tracked models as JSON, sorted by architecture and name
    Models(ModelsArgs),

    /// Aggregate all sources and write the package catalog
    Pats(PatsArgs),
}

#[derive(Debug, Args)]
struct ModelsArgs {
    /// Platform file listing the recognized architectures
    #[arg(short, long)]
    platforms: Option<PathBuf>,

    /// Comma or space separated architecture codes to keep
    #[arg(short, long)]
    filter: Option<String>,
}

#[derive(Debug, Args)]
struct PatsArgs {
    /// Platform file listing the recognized architectures
    #[arg(short, long)]
    platforms: PathBuf,

    /// Output file; `.json` writes JSON, anything else YAML
    #[arg(short, long)]
    output: PathBuf,

    /// Comma or space separated architecture codes to keep
    #[arg(short, long)]
    filter: Option<String>,

    /// Models resolved in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    /// Verify TLS certificates of the vendor endpoints
    #[arg(long)]
    verify_tls: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "pat_catalog=debug" } else { "pat_catalog=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Models(args) => {
            let architectures = architecture_set(args.platforms.as_ref(), args.filter.as_deref())?;
            let aggregator = Aggregator::new(config)?;
            let directory = aggregator.directory(&architectures).await?;

            println!("{}", serde_json::to_string_pretty(&directory.models)?);
        }
        Commands::Pats(args) => {
            if let Some(concurrency) = args.concurrency {
                config.concurrency = concurrency;
            }
            if args.verify_tls {
                config.transport.verify_tls = true;
            }

            let architectures = architecture_set(Some(&args.platforms), args.filter.as_deref())?;
            let aggregator = Aggregator::new(config)?;
            info!(
                "Tracking {} architectures, concurrency {}",
                architectures.tracked_count().unwrap_or_default(),
                aggregator.config().concurrency
            );

            let run = aggregator.run(&architectures).await?;
            write_catalog(&run.catalog, &args.output)
                .with_context(|| format!("Failed to write {}", args.output.display()))?;

            info!(
                "Wrote {} packages for {} models to {}",
                run.catalog.record_count(),
                run.model_count,
                args.output.display()
            );
        }
    }

    Ok(())
}

fn architecture_set(platforms: Option<&PathBuf>, filter: Option<&str>) -> Result<ArchitectureSet> {
    let base = match platforms {
        Some(path) => ArchitectureSet::load(path)
            .with_context(|| format!("Failed to load platforms from {}", path.display()))?,
        None => ArchitectureSet::any(),
    };

    Ok(match filter {
        Some(list) => base.intersect(&ArchitectureSet::from_list(list)),
        None => base,
    })
}
