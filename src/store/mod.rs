//! Persistence of articles and read-only aggregations over them.
//!
//! The pipeline only talks to the store through [`ArticleStore`]. Each call
//! is a short, self-contained operation; callers never hold a store lock
//! across a network round-trip.
//!
//! # Implementations
//!
//! | Type | Notes |
//! |------|-------|
//! | [`DocumentStore`] | In-process documents, optionally snapshotted to a JSON file |
//! | [`RetryStore`] | Decorator retrying failed writes with exponential backoff |

pub mod aggregate;
pub mod document;
pub mod retry;

pub use document::DocumentStore;
pub use retry::RetryStore;

use crate::error::StoreError;
use crate::models::{Article, ArticleId, NewArticle, TimelineEntry, Word, WordCount};
use std::future::Future;

/// Operations the ingestion and processing loops need from the document store.
pub trait ArticleStore: Send + Sync {
    /// Insert a new, unprocessed article and return its id.
    fn insert(
        &self,
        article: NewArticle,
    ) -> impl Future<Output = Result<ArticleId, StoreError>> + Send;

    /// The article of `category` with the most recent normalized date.
    fn latest_in_category(
        &self,
        category: &str,
    ) -> impl Future<Output = Result<Option<Article>, StoreError>> + Send;

    /// The article of `category` titled exactly `title`, if any.
    fn find_by_title(
        &self,
        category: &str,
        title: &str,
    ) -> impl Future<Output = Result<Option<Article>, StoreError>> + Send;

    /// All articles still waiting to be processed, excluding quarantined ones.
    fn unprocessed(&self) -> impl Future<Output = Result<Vec<Article>, StoreError>> + Send;

    /// Write the word table and set `processed` in one update.
    ///
    /// Returns `false` and changes nothing when the article was already
    /// processed.
    fn complete(
        &self,
        id: ArticleId,
        words: Vec<Word>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Count a failed scrape attempt, optionally quarantining the article.
    /// Returns the new attempt count.
    fn record_failure(
        &self,
        id: ArticleId,
        quarantine: bool,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send;

    /// Most frequent words of a category, optionally restricted to `filter`.
    fn top_words(
        &self,
        category: &str,
        filter: &[String],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<WordCount>, StoreError>> + Send;

    /// Occurrences of `word` bucketed by `(date, category)`.
    fn word_timeline(
        &self,
        word: &str,
    ) -> impl Future<Output = Result<Vec<TimelineEntry>, StoreError>> + Send;

    /// Number of ingested articles.
    fn article_count(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
