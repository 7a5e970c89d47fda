use super::{HistoryRecord, RankOutcome, RunManifest, SnapshotRecord};
use crate::error::Result;
use chrono::NaiveDate;

pub trait RankStore: Send + Sync {
    /// Replaces the snapshot table with exactly these outcomes.
    fn write_snapshot(&self, outcomes: &[RankOutcome]) -> Result<()>;
    /// Appends one dated row per outcome; earlier rows are left untouched.
    fn append_history(&self, outcomes: &[RankOutcome], run_date: NaiveDate) -> Result<()>;
    fn load_snapshot(&self) -> Result<Option<Vec<SnapshotRecord>>>;
    fn load_history(&self) -> Result<Option<Vec<HistoryRecord>>>;
    fn save_manifest(&self, manifest: &RunManifest) -> Result<()>;
}

pub struct StorageKeys;

impl StorageKeys {
    pub const SNAPSHOT: &'static str = "rank_results.csv";
    pub const HISTORY: &'static str = "rank_history.csv";
    pub const MANIFEST: &'static str = "last_run.json";
}
