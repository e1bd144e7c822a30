//! RSS channel/item parsing.
//!
//! Only the three fields the pipeline needs are read from each `<item>`:
//! `title`, `link` and `pubDate`. Everything else in the document is
//! ignored.

use crate::dates::normalize_pub_date;
use crate::error::FeedError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<ItemElement>,
}

/// Fields are matched by local name, so `<media:title>` or `<atom:link>`
/// land next to `<title>` and `<link>`. Each field collects every match.
#[derive(Debug, Deserialize)]
struct ItemElement {
    #[serde(default)]
    title: Vec<TextElement>,
    #[serde(default)]
    link: Vec<TextElement>,
    #[serde(rename = "pubDate", default)]
    pub_date: Vec<TextElement>,
}

#[derive(Debug, Default, Deserialize)]
struct TextElement {
    #[serde(rename = "$text", default)]
    text: String,
}

fn first_text(elements: Vec<TextElement>) -> Option<String> {
    elements
        .into_iter()
        .map(|e| e.text)
        .find(|text| !text.trim().is_empty())
}

impl From<ItemElement> for RawItem {
    fn from(item: ItemElement) -> Self {
        RawItem {
            title: first_text(item.title),
            link: first_text(item.link),
            pub_date: first_text(item.pub_date),
        }
    }
}

/// An `<item>` exactly as the feed published it.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
}

/// A feed item with its link trimmed and its publish date normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub date: DateTime<Utc>,
}

/// Why an item was left out of ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSkip {
    MissingField(&'static str),
    BadDate(String),
}

impl TryFrom<RawItem> for FeedItem {
    type Error = ItemSkip;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let title = non_empty(raw.title).ok_or(ItemSkip::MissingField("title"))?;
        let link = non_empty(raw.link).ok_or(ItemSkip::MissingField("link"))?;
        let pub_date = non_empty(raw.pub_date).ok_or(ItemSkip::MissingField("pubDate"))?;
        let (date, _) =
            normalize_pub_date(&pub_date).map_err(|e| ItemSkip::BadDate(e.to_string()))?;
        Ok(FeedItem {
            title,
            link,
            pub_date,
            date,
        })
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse the `<item>` list of an RSS document.
pub fn parse_items(xml: &str) -> Result<Vec<RawItem>, FeedError> {
    let cleaned = scrub_html_entities(xml);
    let rss: Rss = from_str(&cleaned)?;
    Ok(rss.channel.items.into_iter().map(RawItem::from).collect())
}

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>|&([A-Za-z][A-Za-z0-9]*);").unwrap()
});

/// Rewrite HTML-only named entities (`&nbsp;`, `&mdash;`, ...) as numeric
/// character references, which XML understands. Unknown names are escaped
/// so the parser sees them as literal text. CDATA sections are left alone.
fn scrub_html_entities(xml: &str) -> String {
    ENTITY
        .replace_all(xml, |caps: &Captures| {
            let Some(name) = caps.get(1) else {
                return caps[0].to_string();
            };
            let name = name.as_str();
            if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
                return caps[0].to_string();
            }
            let decoded = html_escape::decode_html_entities(&caps[0]);
            if decoded == caps[0] {
                format!("&amp;{name};")
            } else {
                decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
            }
        })
        .into_owned()
}
