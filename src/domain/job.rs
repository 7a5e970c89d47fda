use serde::{Deserialize, Serialize};
use std::fmt;

/// One (keyword, shop) pair to look up. Duplicates are processed independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchJob {
    pub keyword: String,
    pub shop_name: String,
}

impl SearchJob {
    pub fn new(keyword: impl Into<String>, shop_name: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            shop_name: shop_name.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.keyword.trim().is_empty() && !self.shop_name.trim().is_empty()
    }
}

impl fmt::Display for SearchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' @ '{}'", self.shop_name, self.keyword)
    }
}

/// Terminal state a job ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    Found,
    /// The feed stopped growing before the target showed up.
    NotFound,
    ScrollBudgetExhausted,
    LoadTimeout,
    /// The feed container never appeared in the realized markup.
    ParseAnomaly,
    Errored,
    SessionFailure,
    /// Never attempted because the browsing session was unusable.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankOutcome {
    pub job: SearchJob,
    pub rank: Option<u32>,
    pub status: ResolveStatus,
}

impl RankOutcome {
    pub fn found(job: SearchJob, rank: u32) -> Self {
        debug_assert!(rank >= 1);
        Self {
            job,
            rank: Some(rank),
            status: ResolveStatus::Found,
        }
    }

    pub fn missing(job: SearchJob, status: ResolveStatus) -> Self {
        debug_assert!(status != ResolveStatus::Found);
        Self {
            job,
            rank: None,
            status,
        }
    }

    pub fn is_found(&self) -> bool {
        self.rank.is_some()
    }
}
