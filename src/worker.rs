//! Processing worker: turn every unprocessed article into a word table.
//!
//! Each sweep loads the unprocessed articles and handles them one at a
//! time: scrape, tokenize, then write the word table and the processed
//! flag in a single store update. An article whose scrape fails stays
//! unprocessed and is picked up again by the next sweep. With
//! `max_attempts` configured, an article is quarantined once it has failed
//! that many times, or immediately on a permanent failure.

use crate::error::{Classify, Failure, ScrapeError};
use crate::fetch::Fetcher;
use crate::models::{Article, Word};
use crate::schedule::PeriodicTask;
use crate::scrape::ArticleScraper;
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use crate::words::WordFilter;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// What happened to one article during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// Word table written and the article marked processed.
    Processed { words: usize },
    /// Another sweep finished the article first.
    AlreadyProcessed,
    /// Left unprocessed; retried next sweep unless quarantined.
    Failed { failure: Failure, quarantined: bool },
}

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub pending: usize,
    pub processed: usize,
    /// Processed articles whose word table came out empty.
    pub empty: usize,
    pub already_processed: usize,
    pub transient_failures: usize,
    pub permanent_failures: usize,
    pub quarantined: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: ArticleOutcome) {
        match outcome {
            ArticleOutcome::Processed { words } => {
                self.processed += 1;
                if words == 0 {
                    self.empty += 1;
                }
            }
            ArticleOutcome::AlreadyProcessed => self.already_processed += 1,
            ArticleOutcome::Failed {
                failure,
                quarantined,
            } => {
                match failure {
                    Failure::Transient => self.transient_failures += 1,
                    Failure::Permanent => self.permanent_failures += 1,
                }
                if quarantined {
                    self.quarantined += 1;
                }
            }
        }
    }
}

/// Drives scraping and tokenization over unprocessed articles.
#[derive(Debug)]
pub struct ProcessingWorker<S, F> {
    store: Arc<S>,
    scraper: ArticleScraper<F>,
    filter: WordFilter,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl<S, F> ProcessingWorker<S, F>
where
    S: ArticleStore,
    F: Fetcher,
{
    pub fn new(store: Arc<S>, fetcher: Arc<F>, filter: WordFilter, interval: Duration) -> Self {
        Self {
            store,
            scraper: ArticleScraper::new(fetcher),
            filter,
            interval,
            max_attempts: None,
        }
    }

    /// Quarantine articles after `max_attempts` failed scrapes.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.filter(|n| *n > 0);
        self
    }

    /// Run a single sweep over every unprocessed article.
    #[instrument(level = "info", skip_all)]
    pub async fn run_once(&self) -> SweepReport {
        let t0 = Instant::now();
        let pending = match self.store.unprocessed().await {
            Ok(articles) => articles,
            Err(e) => {
                error!(error = %e, "Could not load unprocessed articles");
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            pending: pending.len(),
            ..SweepReport::default()
        };
        for article in &pending {
            let outcome = self.process(article).await;
            report.record(outcome);
        }

        if report.pending > 0 {
            info!(
                pending = report.pending,
                processed = report.processed,
                empty = report.empty,
                failed = report.transient_failures + report.permanent_failures,
                quarantined = report.quarantined,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Sweep complete"
            );
        } else {
            debug!("Nothing to process");
        }
        report
    }

    /// Scrape, tokenize and store one article.
    ///
    /// The word table and the processed flag are written in one store call.
    /// A scrape failure records an attempt instead, quarantining the article
    /// when `max_attempts` says so. A store failure is logged and leaves the
    /// article for the next sweep.
    ///
    /// # Arguments
    ///
    /// * `article` - An article read from [`ArticleStore::unprocessed`]
    ///
    /// # Returns
    ///
    /// The [`ArticleOutcome`] for this article. Never an error: every failure
    /// is logged and folded into the outcome.
    #[instrument(level = "info", skip_all, fields(id = %article.id, category = %article.category))]
    pub async fn process(&self, article: &Article) -> ArticleOutcome {
        let text = match self.scraper.scrape(&article.link, &article.locator).await {
            Ok(text) => text,
            Err(e) => return self.fail(article, e).await,
        };

        let words = Word::from_table(self.filter.count_words(&text));
        let count = words.len();
        match self.store.complete(article.id, words).await {
            Ok(true) => {
                info!(
                    title = %truncate_for_log(&article.title, 80),
                    words = count,
                    "Processed article"
                );
                ArticleOutcome::Processed { words: count }
            }
            Ok(false) => ArticleOutcome::AlreadyProcessed,
            Err(e) => {
                error!(error = %e, "Could not store word table; article stays unprocessed");
                ArticleOutcome::Failed {
                    failure: e.failure(),
                    quarantined: false,
                }
            }
        }
    }

    async fn fail(&self, article: &Article, e: ScrapeError) -> ArticleOutcome {
        let failure = e.failure();
        let quarantine = self.max_attempts.is_some_and(|max| {
            failure == Failure::Permanent || article.attempts.saturating_add(1) >= max
        });

        match self.store.record_failure(article.id, quarantine).await {
            Ok(attempts) if quarantine => {
                error!(link = %article.link, attempts, error = %e, "Quarantined article");
            }
            Ok(attempts) => {
                warn!(link = %article.link, attempts, error = %e, "Scrape failed; will retry next sweep");
            }
            Err(store_err) => {
                error!(link = %article.link, error = %e, store_error = %store_err, "Scrape failed and attempt could not be recorded");
                return ArticleOutcome::Failed {
                    failure,
                    quarantined: false,
                };
            }
        }
        ArticleOutcome::Failed {
            failure,
            quarantined: quarantine,
        }
    }
}

impl<S, F> PeriodicTask for ProcessingWorker<S, F>
where
    S: ArticleStore + 'static,
    F: Fetcher + 'static,
{
    fn interval(&self) -> Duration {
        self.interval
    }

    fn name(&self) -> &'static str {
        "processing_worker"
    }

    async fn execute(&mut self) {
        self.run_once().await;
    }
}
