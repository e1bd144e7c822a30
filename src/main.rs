//! # wordfeed
//!
//! Polls news RSS feeds, stores every new article, then scrapes each
//! article's body and keeps a per-article word-frequency table that can be
//! aggregated per category or tracked over time.
//!
//! ## Usage
//!
//! ```sh
//! wordfeed -c feeds.yaml run
//! wordfeed top-words --category CNN --limit 20
//! ```
//!
//! ## Architecture
//!
//! Two independent periodic tasks share one article store:
//! 1. **Polling**: fetch each feed and insert items newer than anything stored
//! 2. **Processing**: scrape unprocessed articles and attach their word tables
//!
//! The read-only subcommands print aggregations over the store as JSON.

use clap::Parser;
use futures::future;
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod charset;
mod cli;
mod config;
mod dates;
mod error;
mod feed;
mod fetch;
mod ingest;
mod models;
mod poller;
mod schedule;
mod scrape;
mod store;
mod utils;
mod words;
mod worker;

use cli::{Cli, Command};
use config::Config;
use fetch::HttpFetcher;
use models::ArticleCount;
use poller::FeedPoller;
use schedule::spawn_periodic;
use store::{ArticleStore, DocumentStore, RetryStore};
use utils::ensure_writable_parent;
use worker::ProcessingWorker;

type Store = RetryStore<DocumentStore>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let command = args.command();
    info!(version = env!("CARGO_PKG_VERSION"), ?command, "wordfeed starting up");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(store_path) = args.store {
        config.store_path = store_path;
    }

    let store = Arc::new(open_store(&config).await?);
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout(), &config.user_agent)?);

    match command {
        Command::Run => run(&config, store, fetcher).await?,
        Command::Poll => {
            let poller = FeedPoller::new(store, fetcher, config.sources.clone(), config.poll_interval());
            let report = poller.run_once().await;
            info!(?report, "Poll finished");
        }
        Command::Sweep => {
            let report = worker(&config, store, fetcher).run_once().await;
            info!(?report, "Sweep finished");
        }
        Command::TopWords {
            category,
            filter,
            limit,
        } => print_json(&store.top_words(&category, &filter, limit).await?)?,
        Command::Timeline { word } => print_json(&store.word_timeline(&word).await?)?,
        Command::Count => print_json(&ArticleCount {
            count: store.article_count().await?,
        })?,
    }

    Ok(())
}

/// Open the configured store, wrapped in the retrying decorator.
#[instrument(level = "info", skip_all, fields(store_path = %config.store_path))]
async fn open_store(config: &Config) -> Result<Store, Box<dyn Error>> {
    let documents = match config.store_file() {
        Some(path) => {
            if let Err(e) = ensure_writable_parent(&path).await {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Store directory is not writable (fix perms or choose a different path)"
                );
                return Err(e);
            }
            DocumentStore::open(&path).await?
        }
        None => {
            info!("Using volatile in-memory store");
            DocumentStore::in_memory()
        }
    };
    Ok(RetryStore::new(documents, 3, Duration::from_millis(200)))
}

fn worker(config: &Config, store: Arc<Store>, fetcher: Arc<HttpFetcher>) -> ProcessingWorker<Store, HttpFetcher> {
    ProcessingWorker::new(store, fetcher, config.filter.word_filter(), config.sweep_interval())
        .with_max_attempts(config.max_attempts)
}

/// Run both loops until Ctrl-C, then stop them between cycles.
async fn run(config: &Config, store: Arc<Store>, fetcher: Arc<HttpFetcher>) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();

    let poller = FeedPoller::new(
        Arc::clone(&store),
        Arc::clone(&fetcher),
        config.sources.clone(),
        config.poll_interval(),
    );
    let poller = spawn_periodic(poller);
    let worker = spawn_periodic(worker(config, store, fetcher));

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received; waiting for running cycles to finish");
    future::join(poller.shutdown(), worker.shutdown()).await;

    info!(
        elapsed_secs = start_time.elapsed().as_secs(),
        "wordfeed stopped"
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
