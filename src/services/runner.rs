use crate::domain::{RankOutcome, ResolveStatus, SearchJob};
use crate::infrastructure::PageSource;
use crate::services::resolver::RankResolver;
use futures::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Politeness pause between two consecutive searches.
    pub pacing: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(1500),
        }
    }
}

/// Runs a batch of searches one after another over a single browsing session.
pub struct SearchJobRunner<S: PageSource> {
    source: S,
    resolver: RankResolver,
    settings: RunnerSettings,
}

impl<S: PageSource> SearchJobRunner<S> {
    pub fn new(source: S, resolver: RankResolver, settings: RunnerSettings) -> Self {
        info!("Created search job runner");
        Self {
            source,
            resolver,
            settings,
        }
    }

    /// Returns exactly one outcome per job, in job order. The session is
    /// started once and shut down once, even if a search panics.
    pub async fn run(&mut self, jobs: &[SearchJob]) -> Vec<RankOutcome> {
        if jobs.is_empty() {
            info!("No searches to run");
            return Vec::new();
        }

        if let Err(e) = self.source.start().await {
            error!("Could not start browsing session: {}", e);
            return skipped(jobs);
        }

        let result = AssertUnwindSafe(self.run_jobs(jobs)).catch_unwind().await;

        if let Err(e) = self.source.shutdown().await {
            warn!("Browsing session did not shut down cleanly: {}", e);
        }

        match result {
            Ok(outcomes) => outcomes,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn run_jobs(&mut self, jobs: &[SearchJob]) -> Vec<RankOutcome> {
        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut outcomes = Vec::with_capacity(jobs.len());

        for (index, job) in jobs.iter().enumerate() {
            if index > 0 {
                sleep(self.settings.pacing).await;
            }

            pb.set_message(job.to_string());
            let outcome = self.resolver.resolve(&mut self.source, job).await;
            let session_lost = outcome.status == ResolveStatus::SessionFailure;
            outcomes.push(outcome);
            pb.inc(1);

            if session_lost {
                let remaining = &jobs[index + 1..];
                error!(
                    "Browsing session lost; {} remaining searches skipped",
                    remaining.len()
                );
                outcomes.extend(skipped(remaining));
                break;
            }
        }

        pb.finish_with_message("Done searching");
        outcomes
    }
}

fn skipped(jobs: &[SearchJob]) -> Vec<RankOutcome> {
    jobs.iter()
        .map(|job| RankOutcome::missing(job.clone(), ResolveStatus::Skipped))
        .collect()
}
