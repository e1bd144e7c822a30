//! Read-only aggregation pipelines over article documents.
//!
//! These mirror the group/sort/limit pipelines the query side runs against
//! the store: unwind each article's word table, group, sum, sort.

use crate::models::{Article, Grouping, TimelineEntry, WordCount};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Default number of words returned by [`top_words`].
pub const TOP_WORDS_LIMIT: usize = 50;

/// Sum word counts across the articles of `category`.
///
/// When `filter` is non-empty only those words (trimmed, lowercased) are
/// kept. Results are ordered by count descending, then by word.
pub fn top_words<'a, I>(articles: I, category: &str, filter: &[String], limit: usize) -> Vec<WordCount>
where
    I: IntoIterator<Item = &'a Article>,
{
    let wanted: HashSet<String> = filter
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    let mut totals: HashMap<&str, u64> = HashMap::new();
    for word in articles
        .into_iter()
        .filter(|a| a.category == category)
        .flat_map(|a| a.words.iter())
    {
        if wanted.is_empty() || wanted.contains(&word.name) {
            *totals.entry(word.name.as_str()).or_default() += word.count;
        }
    }

    totals
        .into_iter()
        .sorted_by(|(a_name, a_count), (b_name, b_count)| {
            b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
        })
        .take(limit)
        .map(|(name, count)| WordCount {
            name: name.to_string(),
            count,
        })
        .collect()
}

/// Count of `word` per `(YYYY-MM-DD, category)`, sorted by grouping.
pub fn word_timeline<'a, I>(articles: I, word: &str) -> Vec<TimelineEntry>
where
    I: IntoIterator<Item = &'a Article>,
{
    let word = word.trim().to_lowercase();
    let mut buckets: BTreeMap<Grouping, u64> = BTreeMap::new();
    for article in articles {
        let mut matched = article.words.iter().filter(|w| w.name == word).peekable();
        if matched.peek().is_none() {
            continue;
        }
        let hits: u64 = matched.map(|w| w.count).sum();
        let grouping = Grouping {
            date: article.date.format("%Y-%m-%d").to_string(),
            category: article.category.clone(),
        };
        *buckets.entry(grouping).or_default() += hits;
    }
    buckets
        .into_iter()
        .map(|(grouping, count)| TimelineEntry { grouping, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleId, Word};
    use chrono::{TimeZone, Utc};

    fn article(id: u64, category: &str, day: u32, words: &[(&str, u64)]) -> Article {
        Article {
            id: ArticleId(id),
            title: format!("title {id}"),
            link: format!("https://news.test/{id}"),
            pub_date: String::new(),
            date: Utc.with_ymd_and_hms(2020, 11, day, 12, 0, 0).unwrap(),
            category: category.to_string(),
            locator: "p".to_string(),
            words: words
                .iter()
                .map(|(name, count)| Word {
                    name: name.to_string(),
                    count: *count,
                })
                .collect(),
            processed: !words.is_empty(),
            attempts: 0,
            quarantined: false,
        }
    }

    fn corpus() -> Vec<Article> {
        vec![
            article(1, "CNN", 10, &[("election", 3), ("vote", 1)]),
            article(2, "CNN", 11, &[("election", 2), ("storm", 4)]),
            article(3, "BBC", 10, &[("election", 5)]),
            article(4, "CNN", 11, &[]),
        ]
    }

    #[test]
    fn test_top_words_sums_and_sorts() {
        let docs = corpus();
        let top = top_words(&docs, "CNN", &[], TOP_WORDS_LIMIT);
        assert_eq!(
            top,
            vec![
                WordCount { name: "election".into(), count: 5 },
                WordCount { name: "storm".into(), count: 4 },
                WordCount { name: "vote".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_top_words_filter_and_limit() {
        let docs = corpus();
        let filtered = top_words(&docs, "CNN", &[" Vote ".to_string(), "storm".to_string()], 10);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].name, "storm");

        let limited = top_words(&docs, "CNN", &[], 1);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].name, "election");
    }

    #[test]
    fn test_top_words_unknown_category() {
        assert!(top_words(&corpus(), "FOX", &[], 50).is_empty());
    }

    #[test]
    fn test_word_timeline_buckets_by_day_and_category() {
        let docs = corpus();
        let timeline = word_timeline(&docs, "Election");
        let flat: Vec<(String, String, u64)> = timeline
            .into_iter()
            .map(|e| (e.grouping.date, e.grouping.category, e.count))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("2020-11-10".into(), "BBC".into(), 5),
                ("2020-11-10".into(), "CNN".into(), 3),
                ("2020-11-11".into(), "CNN".into(), 2),
            ]
        );
    }

    #[test]
    fn test_word_timeline_unknown_word() {
        assert!(word_timeline(&corpus(), "zeppelin").is_empty());
    }
}
