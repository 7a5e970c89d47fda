use crate::domain::storage::RankStore;
use crate::domain::{HistoryRecord, RunManifest, SearchJob};
use crate::error::Result;
use crate::infrastructure::PageSource;
use crate::services::runner::SearchJobRunner;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs a batch and records it: snapshot overwrite, dated history append and
/// the run manifest. Nothing is written until every job has an outcome.
pub struct RankService<S: PageSource> {
    store: Arc<dyn RankStore>,
    runner: SearchJobRunner<S>,
}

impl<S: PageSource> RankService<S> {
    pub fn new(store: Arc<dyn RankStore + 'static>, runner: SearchJobRunner<S>) -> Self {
        Self { store, runner }
    }

    pub async fn process(
        &mut self,
        jobs: &[SearchJob],
        run_date: NaiveDate,
    ) -> Result<Option<RunManifest>> {
        if jobs.is_empty() {
            info!("No searches configured; nothing to record");
            return Ok(None);
        }

        info!("Starting rank run for {} searches", jobs.len());
        let outcomes = self.runner.run(jobs).await;

        self.store.write_snapshot(&outcomes)?;
        self.store.append_history(&outcomes, run_date)?;

        let manifest = RunManifest::new(outcomes);
        self.store.save_manifest(&manifest)?;

        info!(
            "Rank run completed: {} of {} found",
            manifest.found, manifest.total_jobs
        );
        if manifest.needs_attention() > 0 {
            warn!(
                "{} searches ended abnormally, see {:?}",
                manifest.needs_attention(),
                manifest.statuses
            );
        }

        Ok(Some(manifest))
    }
}

/// Recorded history rows for `keyword`, optionally narrowed to one shop,
/// oldest first.
pub fn history_for(
    store: &dyn RankStore,
    keyword: &str,
    shop_name: Option<&str>,
) -> Result<Vec<HistoryRecord>> {
    let rows = store.load_history()?.unwrap_or_default();
    Ok(rows
        .into_iter()
        .filter(|row| row.keyword == keyword)
        .filter(|row| shop_name.map_or(true, |shop| row.shop_name == shop))
        .collect())
}
