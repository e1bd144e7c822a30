//! In-process document store with an optional JSON snapshot on disk.
//!
//! Documents live behind a `tokio::sync::RwLock`. When a snapshot path is
//! configured, every mutation rewrites the snapshot (temp file + rename)
//! before the lock is released. A failed write rolls the in-memory change
//! back, so memory and disk never disagree and a retried write is safe.

use super::ArticleStore;
use super::aggregate;
use crate::error::StoreError;
use crate::models::{Article, ArticleId, NewArticle, TimelineEntry, Word, WordCount};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
struct Collection {
    next_id: u64,
    articles: Vec<Article>,
}

impl Collection {
    fn get_mut(&mut self, id: ArticleId) -> Result<&mut Article, StoreError> {
        self.articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::UnknownArticle(id))
    }
}

/// The article collection.
#[derive(Debug, Default)]
pub struct DocumentStore {
    inner: RwLock<Collection>,
    path: Option<PathBuf>,
}

impl DocumentStore {
    /// A volatile store that forgets everything on exit.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store snapshotted at `path`, starting empty if the file does
    /// not exist yet.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let collection = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Collection>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collection::default(),
            Err(e) => return Err(e.into()),
        };
        info!(articles = collection.articles.len(), "Opened article store");
        Ok(Self {
            inner: RwLock::new(collection),
            path: Some(path),
        })
    }

    async fn persist(&self, collection: &Collection) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec(collection)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "Wrote store snapshot");
        Ok(())
    }
}

impl ArticleStore for DocumentStore {
    async fn insert(&self, article: NewArticle) -> Result<ArticleId, StoreError> {
        let mut coll = self.inner.write().await;
        let id = ArticleId(coll.next_id);
        coll.next_id += 1;
        coll.articles.push(Article::from_new(id, article));

        if let Err(e) = self.persist(&coll).await {
            coll.articles.pop();
            coll.next_id -= 1;
            return Err(e);
        }
        Ok(id)
    }

    async fn latest_in_category(&self, category: &str) -> Result<Option<Article>, StoreError> {
        let coll = self.inner.read().await;
        Ok(coll
            .articles
            .iter()
            .filter(|a| a.category == category)
            .max_by_key(|a| a.date)
            .cloned())
    }

    async fn find_by_title(
        &self,
        category: &str,
        title: &str,
    ) -> Result<Option<Article>, StoreError> {
        let coll = self.inner.read().await;
        Ok(coll
            .articles
            .iter()
            .find(|a| a.category == category && a.title == title)
            .cloned())
    }

    async fn unprocessed(&self) -> Result<Vec<Article>, StoreError> {
        let coll = self.inner.read().await;
        Ok(coll
            .articles
            .iter()
            .filter(|a| !a.processed && !a.quarantined)
            .cloned()
            .collect())
    }

    async fn complete(&self, id: ArticleId, words: Vec<Word>) -> Result<bool, StoreError> {
        let mut coll = self.inner.write().await;
        let article = coll.get_mut(id)?;
        if article.processed {
            return Ok(false);
        }
        article.words = words;
        article.processed = true;

        if let Err(e) = self.persist(&coll).await {
            let article = coll.get_mut(id)?;
            article.words = Vec::new();
            article.processed = false;
            return Err(e);
        }
        Ok(true)
    }

    async fn record_failure(&self, id: ArticleId, quarantine: bool) -> Result<u32, StoreError> {
        let mut coll = self.inner.write().await;
        let article = coll.get_mut(id)?;
        let previous = (article.attempts, article.quarantined);
        article.attempts += 1;
        article.quarantined |= quarantine;
        let attempts = article.attempts;

        if let Err(e) = self.persist(&coll).await {
            let article = coll.get_mut(id)?;
            (article.attempts, article.quarantined) = previous;
            return Err(e);
        }
        Ok(attempts)
    }

    async fn top_words(
        &self,
        category: &str,
        filter: &[String],
        limit: usize,
    ) -> Result<Vec<WordCount>, StoreError> {
        let coll = self.inner.read().await;
        Ok(aggregate::top_words(&coll.articles, category, filter, limit))
    }

    async fn word_timeline(&self, word: &str) -> Result<Vec<TimelineEntry>, StoreError> {
        let coll = self.inner.read().await;
        Ok(aggregate::word_timeline(&coll.articles, word))
    }

    async fn article_count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.articles.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn new_article(category: &str, title: &str, hour: u32) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            link: format!("https://news.test/{title}"),
            pub_date: String::new(),
            date: Utc.with_ymd_and_hms(2020, 11, 10, hour, 0, 0).unwrap(),
            category: category.to_string(),
            locator: "p".to_string(),
        }
    }

    fn words(pairs: &[(&str, u64)]) -> Vec<Word> {
        pairs
            .iter()
            .map(|(name, count)| Word {
                name: name.to_string(),
                count: *count,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = DocumentStore::in_memory();
        let a = store.insert(new_article("CNN", "a", 1)).await.unwrap();
        let b = store.insert(new_article("CNN", "b", 2)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.article_count().await.unwrap(), 2);
        assert_eq!(store.unprocessed().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_latest_in_category_sorts_by_date() {
        let store = DocumentStore::in_memory();
        store.insert(new_article("CNN", "late", 9)).await.unwrap();
        store.insert(new_article("CNN", "early", 1)).await.unwrap();
        store.insert(new_article("BBC", "later", 12)).await.unwrap();

        let latest = store.latest_in_category("CNN").await.unwrap().unwrap();
        assert_eq!(latest.title, "late");
        assert!(store.latest_in_category("FOX").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_title_is_scoped_to_category() {
        let store = DocumentStore::in_memory();
        store.insert(new_article("CNN", "Same", 1)).await.unwrap();
        assert!(store.find_by_title("CNN", "Same").await.unwrap().is_some());
        assert!(store.find_by_title("BBC", "Same").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_happens_once() {
        let store = DocumentStore::in_memory();
        let id = store.insert(new_article("CNN", "a", 1)).await.unwrap();

        assert!(store.complete(id, words(&[("storm", 2)])).await.unwrap());
        assert!(!store.complete(id, words(&[("other", 9)])).await.unwrap());

        assert!(store.unprocessed().await.unwrap().is_empty());
        let top = store.top_words("CNN", &[], 50).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "storm");
        assert_eq!(top[0].count, 2);
    }

    #[tokio::test]
    async fn test_unknown_article() {
        let store = DocumentStore::in_memory();
        assert!(matches!(
            store.complete(ArticleId(42), Vec::new()).await,
            Err(StoreError::UnknownArticle(ArticleId(42)))
        ));
    }

    #[tokio::test]
    async fn test_quarantined_articles_are_not_swept() {
        let store = DocumentStore::in_memory();
        let id = store.insert(new_article("CNN", "a", 1)).await.unwrap();
        assert_eq!(store.record_failure(id, false).await.unwrap(), 1);
        assert_eq!(store.unprocessed().await.unwrap().len(), 1);
        assert_eq!(store.record_failure(id, true).await.unwrap(), 2);
        assert!(store.unprocessed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = DocumentStore::open(&path).await.unwrap();
            let id = store.insert(new_article("NPR", "kept", 3)).await.unwrap();
            store.complete(id, words(&[("river", 1)])).await.unwrap();
        }

        let reopened = DocumentStore::open(&path).await.unwrap();
        assert_eq!(reopened.article_count().await.unwrap(), 1);
        let article = reopened.find_by_title("NPR", "kept").await.unwrap().unwrap();
        assert!(article.processed);
        assert_eq!(article.words, words(&[("river", 1)]));

        let next = reopened.insert(new_article("NPR", "next", 4)).await.unwrap();
        assert_ne!(next, article.id);
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore {
            inner: RwLock::new(Collection::default()),
            path: Some(dir.path().join("missing").join("store.json")),
        };
        assert!(store.insert(new_article("CNN", "a", 1)).await.is_err());
        assert_eq!(store.article_count().await.unwrap(), 0);
    }
}
