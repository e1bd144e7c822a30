//! Data models for feed sources, stored articles and aggregate results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: A configured feed origin (name, feed URL, content locator)
//! - [`Article`]: One discovered feed item as persisted in the store
//! - [`NewArticle`]: The working copy the ingestion engine hands to the store
//! - [`Word`]: One `(word, count)` pair of an article's word table
//! - Aggregates: [`WordCount`], [`TimelineEntry`], [`ArticleCount`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A configured feed origin.
///
/// The `name` doubles as the category stamped on every article the source
/// produces. Sources are built once at start-up and never change while the
/// process runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Source {
    /// Name and category identifier, e.g. `"BBC"`.
    pub name: String,
    /// RSS feed URL.
    pub url: String,
    /// CSS selector identifying the article body on the source's pages.
    pub locator: String,
}

impl Source {
    pub fn new(name: &str, url: &str, locator: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            locator: locator.to_string(),
        }
    }
}

/// Store-assigned article identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ArticleId(pub u64);

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One lowercase word and how often it occurred in a single article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Word {
    pub name: String,
    pub count: u64,
}

impl Word {
    /// Flatten a word table into the embedded representation, ordered by word.
    pub fn from_table(table: BTreeMap<String, u64>) -> Vec<Word> {
        table
            .into_iter()
            .map(|(name, count)| Word { name, count })
            .collect()
    }
}

/// A feed item ready to be inserted, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub link: String,
    /// `pubDate` exactly as the feed published it.
    pub pub_date: String,
    /// Timestamp derived from `pub_date` at ingestion time.
    pub date: DateTime<Utc>,
    pub category: String,
    /// Locator copied from the source when the item was ingested.
    pub locator: String,
}

/// A persisted article document.
///
/// `processed` flips to `true` exactly once, in the same update that writes
/// `words`. Unprocessed articles always carry an empty word table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub date: DateTime<Utc>,
    pub category: String,
    pub locator: String,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub processed: bool,
    /// Failed scrape attempts so far.
    #[serde(default)]
    pub attempts: u32,
    /// Set once the retry policy gives up on the article.
    #[serde(default)]
    pub quarantined: bool,
}

impl Article {
    pub(crate) fn from_new(id: ArticleId, new: NewArticle) -> Self {
        Self {
            id,
            title: new.title,
            link: new.link,
            pub_date: new.pub_date,
            date: new.date,
            category: new.category,
            locator: new.locator,
            words: Vec::new(),
            processed: false,
            attempts: 0,
            quarantined: false,
        }
    }
}

/// A word and its summed count across a set of articles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WordCount {
    pub name: String,
    pub count: u64,
}

/// Grouping key of a timeline bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct Grouping {
    /// `YYYY-MM-DD` of the article's normalized publish timestamp (UTC).
    pub date: String,
    pub category: String,
}

/// Occurrences of one word within a `(date, category)` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimelineEntry {
    pub grouping: Grouping,
    pub count: u64,
}

/// Total number of ingested articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleCount {
    pub count: u64,
}
