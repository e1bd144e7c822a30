//! Command-line interface definitions for wordfeed.
//!
//! Global options can also be provided via environment variables.

use crate::store::aggregate::TOP_WORDS_LIMIT;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for wordfeed.
///
/// # Examples
///
/// ```sh
/// # Poll and sweep until Ctrl-C, with built-in defaults
/// wordfeed
///
/// # One poll cycle against a custom config and store
/// wordfeed -c feeds.yaml -s /var/lib/wordfeed/articles.json poll
///
/// # Most frequent words for a category
/// wordfeed top-words --category BBC --filter trump,biden --limit 20
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "WORDFEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store file, overriding `store_path` from the config (":memory:" for a volatile store)
    #[arg(short, long, env = "WORDFEED_STORE")]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Poll feeds and process articles until interrupted
    Run,
    /// Run a single feed poll cycle and exit
    Poll,
    /// Run a single processing sweep and exit
    Sweep,
    /// Print the most frequent words of a category as JSON
    TopWords {
        /// Category (source name) to aggregate
        #[arg(long)]
        category: String,

        /// Only count these words (comma separated)
        #[arg(long, value_delimiter = ',')]
        filter: Vec<String>,

        /// Maximum number of words to print
        #[arg(long, default_value_t = TOP_WORDS_LIMIT)]
        limit: usize,
    },
    /// Print per-day, per-category counts of one word as JSON
    Timeline {
        #[arg(long)]
        word: String,
    },
    /// Print the total number of stored articles as JSON
    Count,
}
