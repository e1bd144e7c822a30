//! Tokenization and filtering of scraped article text into word tables.
//!
//! The filter is deliberately conservative: no stemming, no phrases, just
//! split, reject, lowercase and count.
//!
//! 1. The text is split on every run of characters that are neither letters
//!    nor digits, so `Mat123` survives splitting as a single field.
//! 2. Fields are counted with their original casing.
//! 3. Each distinct field is dropped if it contains a disallowed character
//!    (symbols, or any numeric character), otherwise lowercased and trimmed of `. , "`
//!    and spaces, then dropped if it equals a stopword.
//! 4. Surviving fields that normalize to the same word have their counts
//!    merged.

use std::collections::{BTreeMap, HashMap, HashSet};

/// A word table: lowercase word to occurrence count.
pub type WordTable = BTreeMap<String, u64>;

/// Characters that disqualify a field outright.
pub const DEFAULT_DISALLOWED: &str = "-<>/_{}=;#&()*%$@0123456789";

const TRIMMED: &[char] = &['.', ',', '"', ' '];

/// Common function words excluded from word tables.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "the", "of", "a", "at", "as", "with", "been", "in", "that", "and", "from", "more", "we",
    "not", "by", "he", "who", "were", "so", "just", "also", "his", "will", "up", "had", "out",
    "if", "an", "to", "on", "which", "they", "is", "it", "but", "its", "could", "us", "him",
    "next", "time", "like", "...", "both", "still", "why", "even", "no", "do", "first", "two",
    "for", "or", "our", "did", "very", "yet", "most", "new", "how", "you", "i", "sure", "move",
    "close", "until", "my", "get", "go", "those", "though", "be", "me", "met", "recent", "rest",
    "end", "put", "seen", "else", "should", "center", "over", "would", "much", "lot", "room",
    "three", "four", "five", "six", "seven", "eight", "nine", "ten", "see", "set", "mr", "few",
    "old", "key", "sent", "tell", "ever", "under", "through", "led", "own", "such", "people",
    "due", "role", "never", "look", "full", "try", "was", "said", "this", "are", "their", "when",
    "can", "now", "after", "than", "some", "her", "image", "about", "she", "all", "one", "have",
    "has", "your", "what", "other", "there", "caption", "copyright",
];

/// Turns text into a [`WordTable`].
///
/// Holds the stopword list and disallowed-character set; both come from the
/// configuration file or fall back to [`DEFAULT_STOPWORDS`] and
/// [`DEFAULT_DISALLOWED`].
#[derive(Debug, Clone)]
pub struct WordFilter {
    stopwords: HashSet<String>,
    disallowed: Vec<char>,
}

impl WordFilter {
    pub fn new<I, S>(stopwords: I, disallowed: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
            disallowed: disallowed.chars().collect(),
        }
    }

    /// Count the words of `text` that survive the filter.
    pub fn count_words(&self, text: &str) -> WordTable {
        let mut raw: HashMap<&str, u64> = HashMap::new();
        for field in split_fields(text) {
            *raw.entry(field).or_default() += 1;
        }

        let mut table = WordTable::new();
        for (field, count) in raw {
            if let Some(word) = self.accept(field) {
                *table.entry(word).or_default() += count;
            }
        }
        table
    }

    /// The normalized word for `field`, or `None` if the filter rejects it.
    ///
    /// Fields holding any numeric character (`2`, `²`, `٣`, `½`) are always
    /// rejected, whatever the configured disallowed set.
    pub fn accept(&self, field: &str) -> Option<String> {
        if field
            .chars()
            .any(|c| c.is_numeric() || self.disallowed.contains(&c))
        {
            return None;
        }
        let word = normalize(field);
        if word.is_empty() || self.stopwords.contains(&word) {
            return None;
        }
        Some(word)
    }
}

impl Default for WordFilter {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS.iter().copied(), DEFAULT_DISALLOWED)
    }
}

/// Split on runs of characters that are neither letters nor digits.
pub fn split_fields(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|field| !field.is_empty())
}

fn normalize(field: &str) -> String {
    field.to_lowercase().trim_matches(TRIMMED).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "The Cat sat on Mat123 and the cat2 ran.";

    #[test]
    fn test_split_keeps_digit_runs_inside_words() {
        let fields: Vec<&str> = split_fields(SCENARIO).collect();
        assert_eq!(
            fields,
            vec!["The", "Cat", "sat", "on", "Mat123", "and", "the", "cat2", "ran"]
        );
    }

    #[test]
    fn test_scenario_word_table() {
        let table = WordFilter::default().count_words(SCENARIO);
        let expected: WordTable = [("cat", 1), ("sat", 1), ("ran", 1)]
            .into_iter()
            .map(|(w, c)| (w.to_string(), c))
            .collect();
        assert_eq!(table, expected);
    }

    #[test]
    fn test_counts_merge_across_case_variants() {
        let table = WordFilter::default().count_words("Storm storm STORM, storm.");
        assert_eq!(table.get("storm"), Some(&4));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_tokenizing_is_deterministic() {
        let filter = WordFilter::default();
        let text = "Markets rallied; markets fell. Rally again!";
        assert_eq!(filter.count_words(text), filter.count_words(text));
    }

    #[test]
    fn test_digits_never_survive() {
        let table = WordFilter::default().count_words("In 2020 the covid19 wave hit 3 cities");
        assert!(table.keys().all(|w| !w.chars().any(|c| c.is_ascii_digit())));
        assert!(table.contains_key("wave"));
        assert!(!table.contains_key("covid19"));

        let table = WordFilter::default().count_words("area km² and cat٣ x½ ⅷ");
        assert!(table.keys().all(|w| !w.chars().any(char::is_numeric)));
        assert_eq!(table.get("area"), Some(&1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_digits_rejected_with_empty_disallowed_set() {
        let filter = WordFilter::new(DEFAULT_STOPWORDS.iter().copied(), "");
        let table = filter.count_words("storm 2020 c3po");
        assert_eq!(table.get("storm"), Some(&1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_disallowed_symbols_are_rejected() {
        let filter = WordFilter::default();
        assert_eq!(filter.accept("a_b"), None);
        assert_eq!(filter.accept("x=y"), None);
        assert_eq!(filter.accept("price$"), None);
        assert_eq!(filter.accept("Senate"), Some("senate".to_string()));
    }

    #[test]
    fn test_stopwords_match_whole_words_only() {
        let table = WordFilter::default().count_words("The theater and the band");
        assert!(table.contains_key("theater"));
        assert!(table.contains_key("band"));
        assert!(!table.contains_key("the"));
        assert!(!table.contains_key("and"));
    }

    #[test]
    fn test_punctuation_splits_contractions() {
        let table = WordFilter::default().count_words("Officials didn't respond");
        assert!(table.contains_key("didn"));
        assert!(table.contains_key("t"));
        assert!(table.contains_key("officials"));
    }

    #[test]
    fn test_non_ascii_letters_are_words() {
        let table = WordFilter::default().count_words("Café crème in Zürich");
        assert_eq!(table.get("café"), Some(&1));
        assert_eq!(table.get("zürich"), Some(&1));
    }

    #[test]
    fn test_custom_filter() {
        let filter = WordFilter::new(["Senate", " vote. "], "x");
        let table = filter.count_words("Senate vote on tax relief");
        assert!(!table.contains_key("senate"));
        assert!(!table.contains_key("vote"));
        assert!(!table.contains_key("tax"));
        assert_eq!(table.get("on"), Some(&1));
        assert_eq!(table.get("relief"), Some(&1));
    }

    #[test]
    fn test_empty_text_yields_empty_table() {
        assert!(WordFilter::default().count_words("").is_empty());
        assert!(WordFilter::default().count_words("  ... --- ").is_empty());
    }
}
