#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ub-realty district pricing pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`ub_realty_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the page progress bar never fight for the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use ub_realty_cli_utils::{IndicatifProgress, MultiProgress};
use ub_realty_knowledge::{CacheDir, DistrictKnowledgeStore, KnowledgeConfig, RefreshOutcome};
use ub_realty_retrieval::{PropertyRetriever, RetrievalConfig};

#[derive(Parser)]
#[command(name = "ub_realty_cli", about = "Ulaanbaatar apartment price tool")]
struct Cli {
    /// Retrieval configuration TOML (defaults to the built-in configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Knowledge store TOML: search settings, embedding backend and district
    /// spellings (defaults to the built-in configuration)
    #[arg(long, global = true)]
    knowledge_config: Option<PathBuf>,
    /// Directory holding the cached district index
    #[arg(long, global = true, default_value = "cache")]
    cache_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a collection over every configured district and print the
    /// resulting district documents
    Collect,
    /// Answer a district question, routing comparison requests to the
    /// ranking of all districts
    Lookup {
        /// District name or free-form question
        query: String,
    },
    /// Print the stored document that best matches a district
    Query {
        /// District name or free-form text
        query: String,
    },
    /// Rank all stored districts by average price per m²
    Compare,
    /// Rebuild the cached index from a live collection
    Refresh {
        /// Refresh even if the cache is still fresh
        #[arg(long)]
        force: bool,
    },
    /// Show the age and freshness of the cache
    Status,
    /// Print the factor-based price estimate for a district
    Estimate {
        /// District name (e.g., "Хан-Уул")
        district: String,
    },
    /// Fetch one listing detail page and print it as JSON
    Listing {
        /// Listing URL on the marketplace
        url: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RetrievalConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => RetrievalConfig::load(path)?,
        None => RetrievalConfig::embedded(),
    })
}

/// Builds an HTTP retriever whose progress is drawn on `multi` and which
/// stops between pages on Ctrl-C.
fn build_retriever(
    config: RetrievalConfig,
    multi: &MultiProgress,
) -> Result<PropertyRetriever, Box<dyn std::error::Error>> {
    let retriever = PropertyRetriever::with_http(config)?
        .with_progress(IndicatifProgress::pages_bar(multi, "Collecting listings"));

    let cancellation = retriever.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current page");
            cancellation.cancel();
        }
    });

    Ok(retriever)
}

fn load_knowledge_config(
    path: Option<&PathBuf>,
) -> Result<KnowledgeConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => KnowledgeConfig::load(path)?,
        None => KnowledgeConfig::embedded(),
    })
}

fn build_store(
    cli: &Cli,
    config: RetrievalConfig,
    multi: &MultiProgress,
) -> Result<DistrictKnowledgeStore, Box<dyn std::error::Error>> {
    let knowledge = load_knowledge_config(cli.knowledge_config.as_ref())?;
    let retriever = build_retriever(config, multi)?;
    let store = DistrictKnowledgeStore::from_config(CacheDir::new(cli.cache_dir.clone()), &knowledge)?
        .with_source(Arc::new(retriever));
    log::debug!("Embedding with {}", store.embedder_name());
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = ub_realty_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match &cli.command {
        Commands::Collect => {
            let retriever = build_retriever(config, &multi)?;
            let start = Instant::now();
            let report = retriever.collect().await;

            for document in &report.documents {
                println!("{}", document.render_text());
            }
            log::info!(
                "Collection finished ({}) in {:.1}s: {}",
                report.origin,
                start.elapsed().as_secs_f64(),
                report.stats.totals()
            );
        }
        Commands::Lookup { query } => {
            let mut store = build_store(&cli, config, &multi)?;
            println!("{}", store.lookup(query).await);
        }
        Commands::Query { query } => {
            let mut store = build_store(&cli, config, &multi)?;
            store.initialize().await;
            println!("{}", store.query_one(query).await);
        }
        Commands::Compare => {
            let mut store = build_store(&cli, config, &multi)?;
            store.initialize().await;
            println!("{}", store.query_all_sorted());
        }
        Commands::Refresh { force } => {
            let mut store = build_store(&cli, config, &multi)?;
            match store.refresh(*force).await {
                RefreshOutcome::Fresh => println!("Cache is fresh; nothing to do."),
                RefreshOutcome::Refreshed(count) => {
                    println!("Index rebuilt with {count} district documents.");
                }
                RefreshOutcome::KeptPrevious => {
                    println!("No live data collected; kept the previous index.");
                }
                RefreshOutcome::NoSource => println!("No document source configured."),
            }
        }
        Commands::Status => {
            let knowledge = load_knowledge_config(cli.knowledge_config.as_ref())?;
            let store =
                DistrictKnowledgeStore::from_config(CacheDir::new(cli.cache_dir.clone()), &knowledge)?;
            let status = store.cache_status();
            println!("{:<14} {}", "Fresh:", status.is_fresh);
            match (status.last_update, status.age_days) {
                (Some(last_update), Some(age_days)) => {
                    println!("{:<14} {last_update}", "Last update:");
                    println!("{:<14} {age_days}", "Age (days):");
                }
                _ => println!("{:<14} never", "Last update:"),
            }
        }
        Commands::Estimate { district } => {
            println!(
                "{}",
                ub_realty_retrieval::estimate::estimate_price_for_district(&config, district)
            );
        }
        Commands::Listing { url } => {
            let retriever = PropertyRetriever::with_http(config)?;
            let lookup = retriever.retrieve_single(url).await;
            println!("{}", serde_json::to_string_pretty(&lookup)?);
        }
    }

    Ok(())
}
