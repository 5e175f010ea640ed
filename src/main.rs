// src/main.rs
use clap::Parser;
use ct_roots::cli::{Cli, Command, DEFAULT_CONFIG_PATH};
use ct_roots::config::Config;
use ct_roots::ct_log::{
    CtLogClient, EndpointUniverse, LogListFetcher, RebuildCoordinator, RootsAcquirer,
};
use ct_roots::output::RootsListing;
use ct_roots::store::RootsStore;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    cli.validate()?;

    // An explicit --config must exist; the default path is optional
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::from_file_or_default(Path::new(DEFAULT_CONFIG_PATH))?,
    };

    if let Some(ref dir) = cli.store_dir {
        config.store.dir = dir.clone();
    }

    // Initialize logging
    let log_level = cli.log_level().unwrap_or(config.logging.level.as_str());
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fetch {
            ref sources,
            max_in_flight,
        } => {
            if !sources.is_empty() {
                config.log_lists.sources = sources.clone();
            }
            if let Some(n) = max_in_flight {
                config.fetch.max_in_flight = n;
            }
            config.validate()?;

            fetch(&config, cli.should_show_progress()).await
        }
        Command::List => list(&config).await,
    }
}

async fn fetch(config: &Config, show_progress: bool) -> anyhow::Result<()> {
    tracing::info!("Starting accepted roots rebuild into {:?}", config.store.dir);

    let fetcher = LogListFetcher::new(config.fetch.request_timeout())?;
    let log_lists = fetcher.load_all(&config.log_lists.sources).await?;
    let universe = EndpointUniverse::from_log_lists(&log_lists);

    if universe.is_empty() {
        anyhow::bail!("No pollable logs found in {} log lists", log_lists.len());
    }

    let store = RootsStore::create(&config.store.dir).await?;
    let client = CtLogClient::new(config.fetch.request_timeout())?;
    let acquirer = RootsAcquirer::new(
        Arc::new(client),
        config.fetch.retry_policy(),
        config.fetch.max_in_flight,
    );

    let coordinator = RebuildCoordinator::new(acquirer, store, show_progress);
    let summary = coordinator.run(&universe).await;

    println!("\n{}", summary);

    if !summary.is_complete() {
        tracing::warn!("Rebuild finished with errors; previous pointers kept for failed logs");
    }

    Ok(())
}

async fn list(config: &Config) -> anyhow::Result<()> {
    let store = RootsStore::new(&config.store.dir);
    let roots = store.load().await?;

    RootsListing::stdout().write(&roots)?;

    let dangling = roots.dangling_pointers();
    if !dangling.is_empty() {
        tracing::warn!("{} logs have no accepted roots in the store", dangling.len());
    }

    Ok(())
}
