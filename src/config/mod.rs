use crate::config::cli::{Args, Command};
use crate::domain::SearchJob;
use crate::error::{RankError, Result};
use crate::services::resolver::ResolverSettings;
use crate::services::runner::RunnerSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) mod cli;

/// CSS selectors describing the results feed markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSelectors {
    /// Iframe whose document holds the result list, if the search page embeds one.
    pub frame: Option<String>,
    pub container: String,
    pub item: String,
    pub advertisement: String,
    pub name: String,
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            frame: Some("#searchIframe".to_string()),
            container: "#_pcmap_list_scroll_container".to_string(),
            item: "#_pcmap_list_scroll_container > ul > li".to_string(),
            advertisement: ".gU6bV._DHlh".to_string(),
            name: ".place_bluelink.tWIhh > span.O_Uah".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub searches: Vec<SearchJob>,
    #[serde(default)]
    pub selectors: FeedSelectors,
}

impl SearchConfig {
    /// A missing file is an empty configuration, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No search config at {:?}, nothing to search", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: SearchConfig = serde_json::from_str(&content)?;

        let before = config.searches.len();
        config.searches.retain(|job| {
            if job.is_valid() {
                true
            } else {
                warn!("Skipping invalid search entry: {:?}", job);
                false
            }
        });
        info!(
            "Loaded {} of {} searches from {:?}",
            config.searches.len(),
            before,
            path
        );

        Ok(config)
    }
}

pub struct Config {
    pub args: Args,
    pub search_config: SearchConfig,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        if args.max_scrolls == 0 {
            return Err(RankError::Config(
                "--max-scrolls must be at least 1".to_string(),
            ));
        }

        if let Some(Command::Search { keyword, shop_name }) = &args.command {
            if !SearchJob::new(keyword.as_str(), shop_name.as_str()).is_valid() {
                return Err(RankError::Config(
                    "search needs a non-empty --keyword and --shop-name".to_string(),
                ));
            }
        }

        let search_config = SearchConfig::load(&args.config_file)?;

        Ok(Self {
            args,
            search_config,
        })
    }

    /// Jobs for this invocation: the whole configured batch, or the single
    /// on-demand search.
    pub fn jobs(&self) -> Vec<SearchJob> {
        match &self.args.command {
            Some(Command::Search { keyword, shop_name }) => {
                vec![SearchJob::new(keyword.trim(), shop_name.trim())]
            }
            _ => self.search_config.searches.clone(),
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            max_scrolls: self.args.max_scrolls,
            settle: Duration::from_millis(self.args.settle_ms),
            anomaly_retries: self.args.anomaly_retries,
        }
    }

    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            pacing: Duration::from_millis(self.args.pacing_ms),
        }
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.args.load_timeout_secs)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if !self.args.data_dir.exists() {
            std::fs::create_dir_all(&self.args.data_dir)?;
        }

        info!("Data dir {:?} exists", self.args.data_dir);
        Ok(())
    }
}
