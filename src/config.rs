//! YAML configuration.
//!
//! Every key is optional. A missing file argument means built-in defaults:
//! the five stock feeds, a five-minute poll and a one-minute sweep.
//!
//! ```yaml
//! sources:
//!   - name: CNN
//!     url: http://rss.cnn.com/rss/cnn_topstories.rss
//!     locator: .zn-body__paragraph
//! poll_interval_secs: 300
//! sweep_interval_secs: 60
//! store_path: /var/lib/wordfeed/articles.json
//! max_attempts: 10
//! filter:
//!   disallowed: "-<>/_{}=;#&()*%$@0123456789"
//! ```

use crate::error::ConfigError;
use crate::models::Source;
use crate::scrape::compile_locator;
use crate::words::{DEFAULT_DISALLOWED, DEFAULT_STOPWORDS, WordFilter};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Store path selecting the volatile in-memory store.
pub const MEMORY_STORE: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sources: Vec<Source>,
    pub poll_interval_secs: u64,
    pub sweep_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub store_path: String,
    pub max_attempts: Option<u32>,
    pub filter: FilterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            poll_interval_secs: 300,
            sweep_interval_secs: 60,
            fetch_timeout_secs: 30,
            user_agent: format!("wordfeed/{}", env!("CARGO_PKG_VERSION")),
            store_path: "wordfeed.json".to_string(),
            max_attempts: None,
            filter: FilterConfig::default(),
        }
    }
}

/// Stopwords and disallowed characters for the tokenizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub stopwords: Vec<String>,
    pub disallowed: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            disallowed: DEFAULT_DISALLOWED.to_string(),
        }
    }
}

impl FilterConfig {
    pub fn word_filter(&self) -> WordFilter {
        WordFilter::new(&self.stopwords, &self.disallowed)
    }
}

fn default_sources() -> Vec<Source> {
    vec![
        Source::new(
            "CNN",
            "http://rss.cnn.com/rss/cnn_topstories.rss",
            ".zn-body__paragraph",
        ),
        Source::new("CBS", "http://www.cbsnews.com/latest/rss/main", "#article-entry"),
        Source::new("BBC", "http://feeds.bbci.co.uk/news/rss.xml", ".story-body__inner"),
        Source::new(
            "FOX",
            "http://feeds.foxnews.com/foxnews/latest?format=xml",
            ".article-text",
        ),
        Source::new("NPR", "http://www.npr.org/rss/rss.php?id=1001", "#storytext"),
    ]
}

impl Config {
    /// Load and validate the configuration at `path`, or the defaults.
    #[instrument(level = "info", skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                let config = Self::from_yaml(&text)?;
                info!(path = %path.display(), sources = config.sources.len(), "Loaded configuration");
                config
            }
            None => {
                info!("No config file given; using built-in defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a defaulted struct.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".into()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            let name = source.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source with url {} has an empty name",
                    source.url
                )));
            }
            if !names.insert(name) {
                return Err(ConfigError::Invalid(format!("duplicate source name {name}")));
            }

            let url = Url::parse(&source.url).map_err(|e| {
                ConfigError::Invalid(format!("source {name}: bad url {}: {e}", source.url))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "source {name}: unsupported scheme {}",
                    url.scheme()
                )));
            }

            compile_locator(&source.locator)
                .map_err(|e| ConfigError::Invalid(format!("source {name}: {e}")))?;
        }

        for (key, value) in [
            ("poll_interval_secs", self.poll_interval_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be greater than zero")));
            }
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Invalid("max_attempts must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// File backing the store, or `None` for the in-memory store.
    pub fn store_file(&self) -> Option<PathBuf> {
        (self.store_path != MEMORY_STORE).then(|| PathBuf::from(&self.store_path))
    }
}
