//! Article body scraper.
//!
//! Fetches an article page, selects every subtree matching the article's
//! content locator, and flattens those subtrees to a single text blob:
//! each match is serialized back to HTML, stripped of tags, entity-decoded
//! and appended after a space.
//!
//! A locator that matches nothing produces an empty blob. That is a valid
//! outcome, not an error.

use crate::charset::{self, Markup};
use crate::error::ScrapeError;
use crate::fetch::Fetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, instrument};

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Fetches articles and extracts the text under their content locator.
#[derive(Debug)]
pub struct ArticleScraper<F> {
    fetcher: Arc<F>,
}

impl<F> Clone for ArticleScraper<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<F: Fetcher> ArticleScraper<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self { fetcher }
    }

    /// Fetch `link` and return the text selected by `locator`.
    ///
    /// The locator is checked before any network traffic, so a broken
    /// locator never costs a fetch.
    #[instrument(level = "info", skip_all, fields(%link, %locator))]
    pub async fn scrape(&self, link: &str, locator: &str) -> Result<String, ScrapeError> {
        compile_locator(locator)?;
        let page = self.fetcher.fetch(link).await?;
        let html = charset::decode(&page.bytes, page.charset(), Markup::Html);
        let text = extract_text(&html, locator)?;
        debug!(url = %page.url, bytes = text.len(), "Extracted article text");
        Ok(text)
    }
}

/// Compile a content locator into a CSS selector.
pub fn compile_locator(locator: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(locator).map_err(|e| ScrapeError::InvalidLocator {
        locator: locator.to_string(),
        reason: e.to_string(),
    })
}

/// Extract the text of every subtree of `html` matching `locator`.
///
/// Tags are stripped while the markup is still escaped, so an encoded
/// `&lt;` in the article body survives as a literal `<`.
///
/// # Arguments
///
/// * `html` - The decoded article page
/// * `locator` - CSS selector naming the article body
///
/// # Returns
///
/// The text of all matches, each preceded by a space. Empty when nothing
/// matches.
pub fn extract_text(html: &str, locator: &str) -> Result<String, ScrapeError> {
    let selector = compile_locator(locator)?;
    let document = Html::parse_document(html);

    let mut text = String::new();
    for element in document.select(&selector) {
        let rendered = element.html();
        let stripped = TAG.replace_all(&rendered, "");
        text.push(' ');
        text.push_str(&html_escape::decode_html_entities(&stripped));
    }
    Ok(text)
}
