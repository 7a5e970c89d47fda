use super::{RankOutcome, ResolveStatus};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of the most recent run, including the terminal status of every job.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub total_jobs: usize,
    pub found: usize,
    pub last_updated: String,
    pub statuses: BTreeMap<ResolveStatus, usize>,
    pub outcomes: Vec<RankOutcome>,
    pub version: String,
}

impl RunManifest {
    pub fn new(outcomes: Vec<RankOutcome>) -> Self {
        let mut statuses = BTreeMap::new();
        for outcome in &outcomes {
            *statuses.entry(outcome.status).or_insert(0) += 1;
        }

        Self {
            total_jobs: outcomes.len(),
            found: outcomes.iter().filter(|o| o.is_found()).count(),
            last_updated: Local::now().to_rfc3339(),
            statuses,
            outcomes,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Jobs that ended for a reason an operator should look at.
    pub fn needs_attention(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(status, _)| {
                matches!(
                    status,
                    ResolveStatus::ParseAnomaly
                        | ResolveStatus::Errored
                        | ResolveStatus::SessionFailure
                        | ResolveStatus::Skipped
                )
            })
            .map(|(_, count)| count)
            .sum()
    }
}
