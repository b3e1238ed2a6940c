//! JSON-file store: one file per (day, half), plus a derived history view.
//!
//! Layout under the root directory:
//!
//! ```text
//! analysis/2024-01-15.json   AnalysisPayload
//! lottery/2024-01-15.json    LotteryResult
//! historical.json            { "2024-01-15": DailyRecord, ... }
//! ```
//!
//! The per-half files are the source of truth. Because the two halves never
//! share a file, an analysis write and a lottery write cannot clobber each
//! other. `historical.json` is rebuilt from them after every write and is only
//! there for tools that want the whole history in one file. A failed rebuild
//! never fails the write that triggered it: the half is already on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use vninsights_core::{AnalysisPayload, DailyRecord, DateKey, History, LotteryResult};

use crate::{RecordStore, StoreError};

const ANALYSIS_DIR: &str = "analysis";
const LOTTERY_DIR: &str = "lottery";
const HISTORICAL_FILE: &str = "historical.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Analysis,
    Lottery,
}

impl Half {
    fn dir(&self) -> &'static str {
        match self {
            Self::Analysis => ANALYSIS_DIR,
            Self::Lottery => LOTTERY_DIR,
        }
    }
}

/// File-backed record store that survives process restarts.
pub struct FileStore {
    root: PathBuf,
    /// Serializes rebuilds of `historical.json`.
    view_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        for dir in [ANALYSIS_DIR, LOTTERY_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| StoreError::io(&path, e))?;
        }
        info!(root = %root.display(), "opened file store");
        Ok(Self {
            root: root.to_path_buf(),
            view_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the derived whole-history view.
    pub fn historical_path(&self) -> PathBuf {
        self.root.join(HISTORICAL_FILE)
    }

    fn half_path(&self, half: Half, date: DateKey) -> PathBuf {
        self.root.join(half.dir()).join(format!("{date}.json"))
    }

    fn read_half<T: DeserializeOwned>(
        &self,
        half: Half,
        date: DateKey,
    ) -> Result<Option<T>, StoreError> {
        read_json(&self.half_path(half, date))
    }

    fn write_half<T: Serialize>(
        &self,
        half: Half,
        date: DateKey,
        value: &T,
    ) -> Result<(), StoreError> {
        let dir = self.root.join(half.dir());
        write_json_atomic(&dir, &self.half_path(half, date), value)?;
        debug!(date = %date, half = half.dir(), "wrote record half");
        self.refresh_view();
        Ok(())
    }

    fn remove_half(&self, half: Half, date: DateKey) -> Result<(), StoreError> {
        let path = self.half_path(half, date);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(date = %date, half = half.dir(), "removed record half");
                self.refresh_view();
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Days that have a file for `half`.
    fn days_with(&self, half: Half) -> Result<Vec<DateKey>, StoreError> {
        let dir = self.root.join(half.dir());
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let mut days = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<DateKey>) {
                Some(Ok(date)) => days.push(date),
                _ => debug!(path = %path.display(), "ignoring unrecognised file"),
            }
        }
        Ok(days)
    }

    /// Merge every per-half file into one history.
    ///
    /// With `skip_corrupt`, unreadable files are logged and left out instead
    /// of failing the whole load.
    fn load_all(&self, skip_corrupt: bool) -> Result<History, StoreError> {
        let mut history = History::new();
        for date in self.days_with(Half::Analysis)? {
            let read = self.read_half::<AnalysisPayload>(Half::Analysis, date);
            if let Some(payload) = tolerate(read, skip_corrupt)? {
                history.entry(date).or_default().merge_analysis(payload);
            }
        }
        for date in self.days_with(Half::Lottery)? {
            let read = self.read_half::<LotteryResult>(Half::Lottery, date);
            if let Some(result) = tolerate(read, skip_corrupt)? {
                history.entry(date).or_default().merge_lottery(result);
            }
        }
        Ok(history)
    }

    /// Rebuild `historical.json` from the per-half files.
    ///
    /// Each rebuild scans after its own write completed, so the last rebuild
    /// to take the lock always sees every write. Failures are logged only.
    fn refresh_view(&self) {
        let _guard = self.view_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let rebuilt = self
            .load_all(true)
            .and_then(|history| write_json_atomic(&self.root, &self.historical_path(), &history));
        if let Err(e) = rebuilt {
            warn!(error = %e, "failed to rebuild historical view");
        }
    }
}

impl RecordStore for FileStore {
    fn get(&self, date: DateKey) -> Result<Option<DailyRecord>, StoreError> {
        let mut record = DailyRecord::default();
        if let Some(payload) = self.read_half::<AnalysisPayload>(Half::Analysis, date)? {
            record.merge_analysis(payload);
        }
        if let Some(result) = self.read_half::<LotteryResult>(Half::Lottery, date)? {
            record.merge_lottery(result);
        }
        Ok((!record.is_empty()).then_some(record))
    }

    fn get_all(&self) -> Result<History, StoreError> {
        self.load_all(false)
    }

    fn put_analysis(&self, date: DateKey, payload: AnalysisPayload) -> Result<(), StoreError> {
        payload.validate()?;
        self.write_half(Half::Analysis, date, &payload)
    }

    fn put_lottery(&self, date: DateKey, result: LotteryResult) -> Result<(), StoreError> {
        result.validate()?;
        self.write_half(Half::Lottery, date, &result)
    }

    fn delete_analysis(&self, date: DateKey) -> Result<(), StoreError> {
        self.remove_half(Half::Analysis, date)
    }

    fn delete_lottery(&self, date: DateKey) -> Result<(), StoreError> {
        self.remove_half(Half::Lottery, date)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| {
            warn!(path = %path.display(), error = %source, "unreadable record file");
            StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            }
        })
}

fn tolerate<T>(
    read: Result<Option<T>, StoreError>,
    skip_corrupt: bool,
) -> Result<Option<T>, StoreError> {
    match read {
        Err(StoreError::Corrupt { path, .. }) if skip_corrupt => {
            warn!(path = %path.display(), "leaving corrupt file out of historical view");
            Ok(None)
        }
        other => other,
    }
}

/// Write to a temp file in `dir`, then rename over `path`.
fn write_json_atomic<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(&json).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
