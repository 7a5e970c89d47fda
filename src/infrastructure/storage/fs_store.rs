use crate::domain::storage::{RankStore, StorageKeys};
use crate::domain::{HistoryRecord, RankOutcome, RunManifest, SnapshotRecord};
use crate::error::Result;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const BOM: &[u8] = b"\xEF\xBB\xBF";

const SNAPSHOT_HEADERS: [&str; 4] = ["검색어", "업체명", "순위", "찾음"];
const HISTORY_HEADERS: [&str; 5] = ["검색어", "업체명", "순위", "찾음", "검색날짜"];

/// Snapshot and history tables as BOM-prefixed UTF-8 CSV files in `data_dir`.
#[derive(Clone)]
pub struct FileSystemStore {
    data_dir: PathBuf,
}

impl FileSystemStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn get_path_for_key(&self, key: &str) -> PathBuf {
        self.data_dir.join(key)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }

    fn write_rows<W: Write, T: Serialize>(writer: W, headers: &[&str], rows: &[T]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        if !headers.is_empty() {
            writer.write_record(headers)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read_rows<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let path = self.get_path_for_key(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read(path)?;
        let content = content.strip_prefix(BOM).unwrap_or(&content[..]);
        let mut reader = csv::Reader::from_reader(content);
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<T>, _>>()?;
        Ok(Some(rows))
    }

    /// Whether `path` holds bytes that do not end in a newline.
    fn lacks_trailing_newline(path: &Path) -> Result<bool> {
        let mut file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }
}

impl RankStore for FileSystemStore {
    fn write_snapshot(&self, outcomes: &[RankOutcome]) -> Result<()> {
        self.ensure_dir()?;

        let path = self.get_path_for_key(StorageKeys::SNAPSHOT);
        let tmp_path = path.with_extension("csv.tmp");
        let records: Vec<SnapshotRecord> = outcomes.iter().map(SnapshotRecord::from).collect();

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(BOM)?;
            Self::write_rows(&mut file, &SNAPSHOT_HEADERS, &records)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        info!("Wrote {} snapshot rows to {:?}", records.len(), path);
        Ok(())
    }

    fn append_history(&self, outcomes: &[RankOutcome], run_date: NaiveDate) -> Result<()> {
        self.ensure_dir()?;

        let path = self.get_path_for_key(StorageKeys::HISTORY);
        let existing_len = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };
        // a file holding only the BOM still needs its header row
        let needs_header =
            existing_len == 0 || (existing_len == BOM.len() as u64 && fs::read(&path)? == BOM);
        let needs_newline = !needs_header && Self::lacks_trailing_newline(&path)?;

        let records: Vec<HistoryRecord> = outcomes
            .iter()
            .map(|outcome| HistoryRecord::new(SnapshotRecord::from(outcome), run_date))
            .collect();

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if existing_len == 0 {
            file.write_all(BOM)?;
        } else if needs_newline {
            file.write_all(b"\n")?;
        }
        let headers: &[&str] = if needs_header { &HISTORY_HEADERS } else { &[] };
        Self::write_rows(&mut file, headers, &records)?;

        info!(
            "Appended {} history rows for {} to {:?}",
            records.len(),
            run_date,
            path
        );
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<Vec<SnapshotRecord>>> {
        self.read_rows(StorageKeys::SNAPSHOT)
    }

    fn load_history(&self) -> Result<Option<Vec<HistoryRecord>>> {
        self.read_rows(StorageKeys::HISTORY)
    }

    fn save_manifest(&self, manifest: &RunManifest) -> Result<()> {
        self.ensure_dir()?;
        let path = self.get_path_for_key(StorageKeys::MANIFEST);
        fs::write(path, serde_json::to_string_pretty(manifest)?)?;
        Ok(())
    }
}
