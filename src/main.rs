use crate::config::cli::{Args, Command, SourceKind};
use crate::config::Config;
use crate::domain::storage::RankStore;
use crate::domain::NOT_FOUND_SENTINEL;
use crate::error::Result;
#[cfg(feature = "browser")]
use crate::infrastructure::ChromeSource;
use crate::infrastructure::{FileSystemStore, HttpSource, PageSource, ResultItemParser};
use crate::services::rank_service::{history_for, RankService};
use crate::services::resolver::RankResolver;
use crate::services::runner::SearchJobRunner;
use chrono::Local;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};

mod config;
mod domain;
mod error;
mod infrastructure;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = args.log_level.parse().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::from_args(args)?;

    let store = Arc::new(FileSystemStore::new(&config.args.data_dir));

    match &config.args.command {
        Some(Command::List) => list_searches(&config),
        Some(Command::History { keyword, shop_name }) => {
            print_history(store.as_ref(), keyword, shop_name.as_deref())
        }
        _ => match config.args.source {
            #[cfg(feature = "browser")]
            SourceKind::Chrome => {
                let source = ChromeSource::new(
                    config.args.base_url.clone(),
                    config.search_config.selectors.clone(),
                    config.load_timeout(),
                );
                run(&config, store, source).await
            }
            SourceKind::Http => {
                let source = HttpSource::new(
                    config.args.base_url.clone(),
                    &config.search_config.selectors.container,
                    config.load_timeout(),
                )?;
                run(&config, store, source).await
            }
        },
    }
}

async fn run<S: PageSource>(config: &Config, store: Arc<FileSystemStore>, source: S) -> Result<()> {
    config.ensure_directories()?;

    let parser = ResultItemParser::new(&config.search_config.selectors)?;
    let resolver = RankResolver::new(parser, config.resolver_settings());
    let runner = SearchJobRunner::new(source, resolver, config.runner_settings());
    let mut service = RankService::new(store, runner);

    let run_date = Local::now().date_naive();
    service.process(&config.jobs(), run_date).await?;

    info!("Rank tracking completed successfully!");
    Ok(())
}

fn list_searches(config: &Config) -> Result<()> {
    let jobs = config.jobs();
    if jobs.is_empty() {
        println!("No searches configured in {:?}", config.args.config_file);
    }
    for (i, job) in jobs.iter().enumerate() {
        println!("{:>3}. {} | {}", i + 1, job.keyword, job.shop_name);
    }
    Ok(())
}

fn print_history(store: &dyn RankStore, keyword: &str, shop_name: Option<&str>) -> Result<()> {
    let rows = history_for(store, keyword, shop_name)?;
    if rows.is_empty() {
        println!("No history recorded for '{}'", keyword);
    }
    for row in rows {
        let rank = row
            .rank
            .map(|rank| rank.to_string())
            .unwrap_or_else(|| NOT_FOUND_SENTINEL.to_string());
        println!("{}  {} | {}  {}", row.run_date, row.keyword, row.shop_name, rank);
    }
    Ok(())
}
