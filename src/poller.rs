//! Feed poller: ingest every configured source, once per interval.
//!
//! Sources are ingested one after another. A failing source is logged and
//! counted, and the cycle moves on to the next one.

use crate::error::{Classify, Failure};
use crate::fetch::Fetcher;
use crate::ingest::{IngestSummary, IngestionEngine};
use crate::models::Source;
use crate::schedule::PeriodicTask;
use crate::store::ArticleStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Outcome of one polling cycle across all sources.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub sources: usize,
    pub succeeded: usize,
    pub transient_failures: usize,
    pub permanent_failures: usize,
    pub items: IngestSummary,
}

/// Drives the [`IngestionEngine`] over every source.
#[derive(Debug)]
pub struct FeedPoller<S, F> {
    engine: IngestionEngine<S, F>,
    sources: Vec<Source>,
    interval: Duration,
}

impl<S, F> FeedPoller<S, F>
where
    S: ArticleStore,
    F: Fetcher,
{
    pub fn new(store: Arc<S>, fetcher: Arc<F>, sources: Vec<Source>, interval: Duration) -> Self {
        Self {
            engine: IngestionEngine::new(store, fetcher),
            sources,
            interval,
        }
    }

    /// Run a single polling cycle.
    #[instrument(level = "info", skip_all)]
    pub async fn run_once(&self) -> PollReport {
        let t0 = Instant::now();
        let mut report = PollReport {
            sources: self.sources.len(),
            ..PollReport::default()
        };

        for source in &self.sources {
            info!(source = %source.name, "Looking for new articles");
            match self.engine.ingest(source).await {
                Ok(summary) => {
                    report.succeeded += 1;
                    report.items.absorb(summary);
                }
                Err(e) => {
                    match e.failure() {
                        Failure::Transient => report.transient_failures += 1,
                        Failure::Permanent => report.permanent_failures += 1,
                    }
                    warn!(source = %source.name, url = %source.url, error = %e, failure = ?e.failure(), "Source skipped this cycle");
                }
            }
        }

        info!(
            sources = report.sources,
            succeeded = report.succeeded,
            failed = report.transient_failures + report.permanent_failures,
            inserted = report.items.inserted,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Poll cycle complete"
        );
        report
    }
}

impl<S, F> PeriodicTask for FeedPoller<S, F>
where
    S: ArticleStore + 'static,
    F: Fetcher + 'static,
{
    fn interval(&self) -> Duration {
        self.interval
    }

    fn name(&self) -> &'static str {
        "feed_poller"
    }

    async fn execute(&mut self) {
        self.run_once().await;
    }
}
