use super::RankOutcome;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const NOT_FOUND_SENTINEL: &str = "찾을 수 없음";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the latest-run table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(rename = "검색어")]
    pub keyword: String,
    #[serde(rename = "업체명")]
    pub shop_name: String,
    #[serde(rename = "순위", serialize_with = "ser_rank", deserialize_with = "de_rank")]
    pub rank: Option<u32>,
    #[serde(rename = "찾음", deserialize_with = "de_found")]
    pub found: bool,
}

/// A snapshot row tagged with the date of the run that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "검색어")]
    pub keyword: String,
    #[serde(rename = "업체명")]
    pub shop_name: String,
    #[serde(rename = "순위", serialize_with = "ser_rank", deserialize_with = "de_rank")]
    pub rank: Option<u32>,
    #[serde(rename = "찾음", deserialize_with = "de_found")]
    pub found: bool,
    #[serde(rename = "검색날짜", serialize_with = "ser_date", deserialize_with = "de_date")]
    pub run_date: NaiveDate,
}

impl From<&RankOutcome> for SnapshotRecord {
    fn from(outcome: &RankOutcome) -> Self {
        Self {
            keyword: outcome.job.keyword.clone(),
            shop_name: outcome.job.shop_name.clone(),
            rank: outcome.rank,
            found: outcome.is_found(),
        }
    }
}

impl HistoryRecord {
    pub fn new(snapshot: SnapshotRecord, run_date: NaiveDate) -> Self {
        Self {
            keyword: snapshot.keyword,
            shop_name: snapshot.shop_name,
            rank: snapshot.rank,
            found: snapshot.found,
            run_date,
        }
    }
}

fn ser_rank<S: Serializer>(rank: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    match rank {
        Some(rank) => serializer.serialize_str(&rank.to_string()),
        None => serializer.serialize_str(NOT_FOUND_SENTINEL),
    }
}

fn de_rank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw == NOT_FOUND_SENTINEL || raw.is_empty() {
        return Ok(None);
    }
    // pandas may have written integer ranks as floats
    let raw = raw.strip_suffix(".0").unwrap_or(raw);
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("invalid rank value: {}", raw)))
}

fn de_found<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid found value: {}",
            other
        ))),
    }
}

fn ser_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
}

fn de_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(serde::de::Error::custom)
}
