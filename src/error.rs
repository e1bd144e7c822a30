//! Error types for every stage of the pipeline.
//!
//! Each error knows whether it is worth retrying on the next cycle
//! ([`Failure::Transient`]) or whether the affected source or article will
//! keep failing until someone changes its configuration
//! ([`Failure::Permanent`]). The poller and the worker aggregate these
//! classifications into their cycle reports.

use crate::models::ArticleId;
use thiserror::Error;

/// How a failed source or article should be treated by its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Retry on the next interval.
    Transient,
    /// Retrying without a configuration change cannot succeed.
    Permanent,
}

/// Maps an error onto a [`Failure`] class.
pub trait Classify {
    fn failure(&self) -> Failure;
}

/// Errors raised while fetching a document over HTTP.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

impl Classify for FetchError {
    fn failure(&self) -> Failure {
        match self {
            FetchError::Client(_) => Failure::Permanent,
            // 404 and 410 will not heal by themselves, everything else might.
            FetchError::Status { status, .. } if matches!(*status, 404 | 410) => {
                Failure::Permanent
            }
            _ => Failure::Transient,
        }
    }
}

/// The feed document could not be decoded as channel/item XML.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed feed xml: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// No date rule accepted the raw `pubDate` text.
#[derive(Debug, Error)]
pub enum DateError {
    #[error("unrecognised publish date {0:?}")]
    Unrecognised(String),
}

/// Errors raised by the persisted document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot is not valid json: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no article with id {0}")]
    UnknownArticle(ArticleId),
}

impl Classify for StoreError {
    fn failure(&self) -> Failure {
        match self {
            StoreError::Io(_) => Failure::Transient,
            StoreError::Serde(_) | StoreError::UnknownArticle(_) => Failure::Permanent,
        }
    }
}

/// Errors raised while ingesting a single source.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for IngestError {
    fn failure(&self) -> Failure {
        match self {
            IngestError::Fetch(e) => e.failure(),
            IngestError::Feed(_) => Failure::Permanent,
            IngestError::Store(e) => e.failure(),
        }
    }
}

/// Errors raised while scraping one article.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("content locator {locator:?} is not a valid selector: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl Classify for ScrapeError {
    fn failure(&self) -> Failure {
        match self {
            ScrapeError::InvalidLocator { .. } => Failure::Permanent,
            ScrapeError::Fetch(e) => e.failure(),
        }
    }
}

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
