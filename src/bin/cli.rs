// src/bin/cli.rs

//! pharmacrawl CLI
//!
//! Local execution entry point. Browser-driven discovery strategies need a
//! page driver supplied by an embedding binary; over plain HTTP this CLI
//! covers numbered-pagination and pagination-API discovery, full extraction,
//! and the daily tracker.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pharmacrawl::{
    browser::HttpFetcher,
    config::load_config,
    error::Result,
    models::Pharmacy,
    pipeline::{run_daily_tracker, Orchestrator},
    sites,
    store::LocalStore,
};

/// pharmacrawl - Paraguay pharmacy catalog crawler
#[derive(Parser, Debug)]
#[command(name = "pharmacrawl", version, about = "Pharmacy catalog crawler")]
struct Cli {
    /// Path to a TOML config file; built-in defaults when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory for the JSON-file store
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover product URLs for one pharmacy
    Discover {
        /// Pharmacy name (farma_oliva, punto_farma, farma_center, farmacia_catedral)
        #[arg(short, long)]
        pharmacy: String,

        /// Use the pagination-API variant where one exists (punto_farma)
        #[arg(long)]
        via_api: bool,
    },

    /// Extract products from previously discovered URLs
    Extract {
        #[arg(short, long)]
        pharmacy: String,

        /// Cap the number of pages processed
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the worker-pool size
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Run discovery then extraction
    Pipeline {
        #[arg(short, long)]
        pharmacy: String,

        #[arg(long)]
        via_api: bool,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run the daily price-tracking campaign
    Track,

    /// Validate configuration
    Validate,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn parse_pharmacy(name: &str) -> Result<Pharmacy> {
    name.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    let store = LocalStore::new(&cli.data_dir);

    match cli.command {
        Command::Discover { pharmacy, via_api } => {
            let pharmacy = parse_pharmacy(&pharmacy)?;
            if via_api {
                swap_in_api_variant(&mut config, pharmacy);
            }
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
            let outcome = orchestrator.run_discovery(pharmacy, None).await?;
            log::info!(
                "Discovery done: {} new URLs ({} seen), termination {:?}",
                outcome.urls_inserted,
                outcome.urls_seen,
                outcome.termination
            );
        }

        Command::Extract {
            pharmacy,
            limit,
            concurrency,
        } => {
            let pharmacy = parse_pharmacy(&pharmacy)?;
            if let Some(n) = concurrency {
                config.crawler.max_concurrent = n.max(1);
            }
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
            let outcome = orchestrator.run_extraction(pharmacy, limit).await?;
            log::info!(
                "Extraction done: {} scraped, {} failed",
                outcome.products_scraped,
                outcome.products_failed
            );
        }

        Command::Pipeline {
            pharmacy,
            via_api,
            limit,
        } => {
            let pharmacy = parse_pharmacy(&pharmacy)?;
            if via_api {
                swap_in_api_variant(&mut config, pharmacy);
            }
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let mut orchestrator = Orchestrator::new(&config, &store, &fetcher);
            let outcome = orchestrator.run_pipeline(pharmacy, None, limit).await?;
            log::info!(
                "Pipeline done: {} scraped, {} failed",
                outcome.products_scraped,
                outcome.products_failed
            );
        }

        Command::Track => {
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let outcome = run_daily_tracker(&config, &store, &fetcher).await?;
            log::info!(
                "Tracker done: {} refreshed, {} failed",
                outcome.products_scraped,
                outcome.products_failed
            );
        }

        Command::Validate => {
            config.validate()?;
            log::info!("Config OK: {} sites configured", config.sites.len());
        }
    }

    Ok(())
}

/// Replace a site's browser-driven discovery with its API variant, when one
/// exists for the pharmacy.
fn swap_in_api_variant(config: &mut pharmacrawl::models::Config, pharmacy: Pharmacy) {
    if pharmacy == Pharmacy::PuntoFarma {
        if let Some(slot) = config.sites.iter_mut().find(|s| s.pharmacy == pharmacy) {
            *slot = sites::punto_farma_api();
            log::info!("Using the pagination-API discovery variant for {pharmacy}");
        }
    } else {
        log::warn!("No API discovery variant for {pharmacy}, keeping the configured strategy");
    }
}
