//! Ingestion of one feed source into the article store.
//!
//! Fetch the feed, decode it to UTF-8, parse its items, normalize their
//! publish dates, then insert the items the store has not seen yet.
//!
//! # Deduplication
//!
//! An item is a candidate only if its normalized date is strictly after the
//! newest stored article of the same category. A candidate is inserted only
//! if no stored article of that category has the same title: some feeds
//! rewrite an item's `pubDate` for hours after first publishing it.

use crate::charset::{self, Markup};
use crate::error::IngestError;
use crate::feed::{self, FeedItem};
use crate::fetch::Fetcher;
use crate::models::{NewArticle, Source};
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What one ingestion pass did with a feed's items.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Items found in the feed.
    pub seen: usize,
    /// Items inserted as new articles.
    pub inserted: usize,
    /// Items not newer than the newest stored article.
    pub stale: usize,
    /// Newer items whose title was already stored for the category.
    pub duplicate: usize,
    /// Items missing a field or carrying an unparseable date.
    pub skipped: usize,
}

impl IngestSummary {
    pub fn absorb(&mut self, other: IngestSummary) {
        self.seen += other.seen;
        self.inserted += other.inserted;
        self.stale += other.stale;
        self.duplicate += other.duplicate;
        self.skipped += other.skipped;
    }
}

/// Pulls feed items from sources into the store.
#[derive(Debug)]
pub struct IngestionEngine<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
}

impl<S, F> IngestionEngine<S, F>
where
    S: ArticleStore,
    F: Fetcher,
{
    pub fn new(store: Arc<S>, fetcher: Arc<F>) -> Self {
        Self { store, fetcher }
    }

    /// Ingest `source` once.
    ///
    /// A fetch or parse failure leaves the store untouched and is returned
    /// to the caller, which decides whether to retry on the next poll.
    /// Items missing a field or carrying an unparseable date are skipped one
    /// by one and never fail the whole feed.
    ///
    /// # Arguments
    ///
    /// * `source` - The feed to poll; its name becomes the category and its
    ///   locator is stamped on every inserted article
    ///
    /// # Returns
    ///
    /// An [`IngestSummary`] counting seen, inserted, stale, duplicate and
    /// skipped items.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let engine = IngestionEngine::new(store, fetcher);
    /// let summary = engine.ingest(&Source::new("BBC", url, ".story-body__inner")).await?;
    /// info!(inserted = summary.inserted, "BBC polled");
    /// ```
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    pub async fn ingest(&self, source: &Source) -> Result<IngestSummary, IngestError> {
        let page = self.fetcher.fetch(&source.url).await?;
        debug!(url = %page.url, bytes = page.bytes.len(), "Fetched feed");
        let xml = charset::decode(&page.bytes, page.charset(), Markup::Xml);
        let raw_items = feed::parse_items(&xml)?;

        let mut summary = IngestSummary {
            seen: raw_items.len(),
            ..IngestSummary::default()
        };

        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            match FeedItem::try_from(raw) {
                Ok(item) => items.push(item),
                Err(reason) => {
                    warn!(?reason, "Skipping feed item");
                    summary.skipped += 1;
                }
            }
        }

        let newest = self
            .store
            .latest_in_category(&source.name)
            .await?
            .map(|a| a.date);

        for item in items {
            if newest.is_some_and(|newest| item.date <= newest) {
                summary.stale += 1;
                continue;
            }

            if self
                .store
                .find_by_title(&source.name, &item.title)
                .await?
                .is_some()
            {
                debug!(title = %truncate_for_log(&item.title, 80), "Title already stored; skipping");
                summary.duplicate += 1;
                continue;
            }

            let article = NewArticle {
                title: item.title,
                link: item.link,
                pub_date: item.pub_date,
                date: item.date,
                category: source.name.clone(),
                locator: source.locator.clone(),
            };
            let date = article.date;
            let title = truncate_for_log(&article.title, 80);
            let id = self.store.insert(article).await?;
            info!(%id, %date, %title, "Added article");
            summary.inserted += 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Classify, Failure};
    use crate::fetch::testing::StaticFetcher;
    use crate::store::DocumentStore;

    const FEED_URL: &str = "https://news.test/rss";

    fn source() -> Source {
        Source::new("TEST", FEED_URL, ".story")
    }

    fn feed(items: &[(&str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, date)| {
                format!(
                    "<item><title>{title}</title><link> https://news.test/{slug} </link><pubDate>{date}</pubDate></item>",
                    slug = title.replace(' ', "-").to_lowercase()
                )
            })
            .collect();
        format!("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Test</title>{body}</channel></rss>")
    }

    fn engine(fetcher: &Arc<StaticFetcher>) -> (Arc<DocumentStore>, IngestionEngine<DocumentStore, StaticFetcher>) {
        let store = Arc::new(DocumentStore::in_memory());
        let engine = IngestionEngine::new(Arc::clone(&store), Arc::clone(fetcher));
        (store, engine)
    }

    #[tokio::test]
    async fn test_first_poll_inserts_everything() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.page(
            FEED_URL,
            &feed(&[
                ("Storm hits coast", "Tue, 10 Nov 2020 10:00:00 +0000"),
                ("Markets rally", "Tue, 10 Nov 2020 11:00:00 GMT"),
            ]),
        );
        let (store, engine) = engine(&fetcher);

        let summary = engine.ingest(&source()).await.unwrap();
        assert_eq!(summary.seen, 2);
        assert_eq!(summary.inserted, 2);

        let stored = store.find_by_title("TEST", "Storm hits coast").await.unwrap().unwrap();
        assert_eq!(stored.link, "https://news.test/storm-hits-coast");
        assert_eq!(stored.category, "TEST");
        assert_eq!(stored.locator, ".story");
        assert!(!stored.processed);
    }

    #[tokio::test]
    async fn test_polling_is_idempotent() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.page(
            FEED_URL,
            &feed(&[("Storm hits coast", "Tue, 10 Nov 2020 10:00:00 +0000")]),
        );
        let (store, engine) = engine(&fetcher);

        engine.ingest(&source()).await.unwrap();
        let second = engine.ingest(&source()).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.stale, 1);
        assert_eq!(store.article_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rewritten_pub_date_is_not_a_new_article() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.page(
            FEED_URL,
            &feed(&[("Storm hits coast", "Tue, 10 Nov 2020 10:00:00 +0000")]),
        );
        let (store, engine) = engine(&fetcher);
        engine.ingest(&source()).await.unwrap();

        fetcher.page(
            FEED_URL,
            &feed(&[
                ("Storm hits coast", "Tue, 10 Nov 2020 16:00:00 +0000"),
                ("Flood warning issued", "Tue, 10 Nov 2020 15:00:00 +0000"),
            ]),
        );
        let summary = engine.ingest(&source()).await.unwrap();
        assert_eq!(summary.duplicate, 1);
        assert_eq!(summary.inserted, 1);
        assert_eq!(store.article_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_titles_within_one_feed() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.page(
            FEED_URL,
            &feed(&[
                ("Same headline", "Tue, 10 Nov 2020 10:00:00 +0000"),
                ("Same headline", "Tue, 10 Nov 2020 12:00:00 +0000"),
            ]),
        );
        let (store, engine) = engine(&fetcher);
        let summary = engine.ingest(&source()).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.duplicate, 1);
        assert_eq!(store.article_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_title_in_other_category_is_kept() {
        let fetcher = Arc::new(StaticFetcher::new());
        let other_url = "https://other.test/rss";
        let items = feed(&[("Shared wire story", "Tue, 10 Nov 2020 10:00:00 +0000")]);
        fetcher.page(FEED_URL, &items).page(other_url, &items);
        let (store, engine) = engine(&fetcher);

        engine.ingest(&source()).await.unwrap();
        engine
            .ingest(&Source::new("OTHER", other_url, "p"))
            .await
            .unwrap();
        assert_eq!(store.article_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_bad_items_are_skipped_individually() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.page(
            FEED_URL,
            &feed(&[
                ("Good one", "Tue, 10 Nov 2020 10:00:00 +0000"),
                ("Bad date", "sometime last week"),
            ]),
        );
        let (_, engine) = engine(&fetcher);
        let summary = engine.ingest(&source()).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_unreachable_feed_has_no_side_effects() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (store, engine) = engine(&fetcher);
        let err = engine.ingest(&source()).await.unwrap_err();
        assert_eq!(err.failure(), Failure::Transient);
        assert_eq!(store.article_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_feed_is_reported() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.page(FEED_URL, "<html><body>Service unavailable</body></html>");
        let (store, engine) = engine(&fetcher);
        let err = engine.ingest(&source()).await.unwrap_err();
        assert!(matches!(err, IngestError::Feed(_)));
        assert_eq!(store.article_count().await.unwrap(), 0);
    }
}
