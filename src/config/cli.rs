use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to search configuration file
    #[arg(long, env = "PLACERANK_CONFIG", default_value = "search_config.json")]
    pub config_file: PathBuf,

    /// Directory holding the snapshot and history tables
    #[arg(long, env = "PLACERANK_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// How result pages are fetched
    #[arg(long, value_enum, default_value_t = SourceKind::default())]
    pub source: SourceKind,

    /// Search URL the keyword is appended to
    #[arg(long, default_value = "https://map.naver.com/p/search/")]
    pub base_url: String,

    /// Maximum scroll iterations per search
    #[arg(long, default_value_t = 50)]
    pub max_scrolls: u32,

    /// Seconds to wait for the results feed to appear
    #[arg(long, default_value_t = 10)]
    pub load_timeout_secs: u64,

    /// Milliseconds to let lazy-loaded items render after a scroll
    #[arg(long, default_value_t = 1000)]
    pub settle_ms: u64,

    /// Milliseconds to pause between consecutive searches
    #[arg(long, default_value_t = 1500)]
    pub pacing_ms: u64,

    /// Consecutive iterations without a feed container before giving up
    #[arg(long, default_value_t = 5)]
    pub anomaly_retries: u32,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run every configured search (default)
    Run,
    /// Run a single on-demand search and record it like a normal run
    Search {
        #[arg(long)]
        keyword: String,
        #[arg(long)]
        shop_name: String,
    },
    /// Print the configured searches
    List,
    /// Print recorded ranks for a keyword
    History {
        #[arg(long)]
        keyword: String,
        #[arg(long)]
        shop_name: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Headless Chromium, scrolls the lazy-loaded feed
    #[cfg(feature = "browser")]
    Chrome,
    /// Plain HTTP fetch of static markup, no scrolling
    Http,
}

impl Default for SourceKind {
    #[cfg(feature = "browser")]
    fn default() -> Self {
        SourceKind::Chrome
    }

    #[cfg(not(feature = "browser"))]
    fn default() -> Self {
        SourceKind::Http
    }
}
