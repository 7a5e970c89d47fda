mod job;
mod manifest;
mod record;
pub(crate) mod storage;

pub use job::{RankOutcome, ResolveStatus, SearchJob};
pub use manifest::RunManifest;
pub use record::{HistoryRecord, SnapshotRecord, NOT_FOUND_SENTINEL};
