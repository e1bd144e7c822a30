//! Store decorator that retries failed writes with exponential backoff.
//!
//! A failed write must never silently lose a computed word table. [`RetryStore`]
//! wraps any [`ArticleStore`] and retries `insert`, `complete` and
//! `record_failure` on transient errors. Reads pass straight through.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use super::ArticleStore;
use crate::error::{Classify, Failure, StoreError};
use crate::models::{Article, ArticleId, NewArticle, TimelineEntry, Word, WordCount};
use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

/// Wrapper adding retry logic to an [`ArticleStore`].
pub struct RetryStore<S> {
    /// The wrapped store.
    inner: S,
    /// Retries after the first failed attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap.
    max_delay: Duration,
}

impl<S> RetryStore<S>
where
    S: ArticleStore,
{
    /// Wrap `inner` so its writes are retried on transient failures.
    ///
    /// # Arguments
    ///
    /// * `inner` - The store to wrap
    /// * `max_retries` - Retries after the first failed attempt (3 in production)
    /// * `base_delay` - Delay before the first retry, doubled each time (200ms in production)
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = RetryStore::new(DocumentStore::open(path).await?, 3, Duration::from_millis(200));
    /// ```
    pub fn new(inner: S, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(5),
        }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn retry<T, Fut, Op>(&self, op_name: &'static str, mut op: Op) -> Result<T, StoreError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    let total_ms = total_t0.elapsed().as_millis() as u64;

                    if e.failure() == Failure::Permanent || attempt > self.max_retries {
                        error!(
                            op = op_name,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_ms,
                            error = %e,
                            "Store write gave up"
                        );
                        return Err(e);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1).min(16))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        op = op_name,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_ms,
                        ?delay,
                        error = %e,
                        "Store write failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl<S> fmt::Debug for RetryStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStore")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<S> ArticleStore for RetryStore<S>
where
    S: ArticleStore,
{
    async fn insert(&self, article: NewArticle) -> Result<ArticleId, StoreError> {
        self.retry("insert", || self.inner.insert(article.clone()))
            .await
    }

    async fn latest_in_category(&self, category: &str) -> Result<Option<Article>, StoreError> {
        self.inner.latest_in_category(category).await
    }

    async fn find_by_title(
        &self,
        category: &str,
        title: &str,
    ) -> Result<Option<Article>, StoreError> {
        self.inner.find_by_title(category, title).await
    }

    async fn unprocessed(&self) -> Result<Vec<Article>, StoreError> {
        self.inner.unprocessed().await
    }

    async fn complete(&self, id: ArticleId, words: Vec<Word>) -> Result<bool, StoreError> {
        self.retry("complete", || self.inner.complete(id, words.clone()))
            .await
    }

    async fn record_failure(&self, id: ArticleId, quarantine: bool) -> Result<u32, StoreError> {
        self.retry("record_failure", || self.inner.record_failure(id, quarantine))
            .await
    }

    async fn top_words(
        &self,
        category: &str,
        filter: &[String],
        limit: usize,
    ) -> Result<Vec<WordCount>, StoreError> {
        self.inner.top_words(category, filter, limit).await
    }

    async fn word_timeline(&self, word: &str) -> Result<Vec<TimelineEntry>, StoreError> {
        self.inner.word_timeline(word).await
    }

    async fn article_count(&self) -> Result<u64, StoreError> {
        self.inner.article_count().await
    }
}
