//! DuckDB store: one row per day, one column per half.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use duckdb::Connection;
use tracing::{debug, info};
use vninsights_core::{AnalysisPayload, DailyRecord, DateKey, History, LotteryResult};

use crate::{RecordStore, StoreError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS daily_records (
    date_key        VARCHAR PRIMARY KEY,
    analysis_data   VARCHAR,
    lottery_result  VARCHAR,
    created_at      TIMESTAMP NOT NULL DEFAULT current_timestamp,
    updated_at      TIMESTAMP NOT NULL DEFAULT current_timestamp
)";

/// DuckDB-backed record store.
///
/// Each half lives in its own JSON column. Writes are single upserts that
/// touch only their own column, so the database itself merges concurrent
/// analysis and lottery writes for the same day.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage that survives across process restarts.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), records = store.record_count()?, "opened duckdb store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored days.
    pub fn record_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn();
        let count: i64 =
            conn.query_row("SELECT count(*)::BIGINT FROM daily_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Upsert a single column, leaving the other half of the row alone.
    fn upsert(&self, column: &str, date: DateKey, json: String) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO daily_records (date_key, {column}) VALUES (?, ?)
             ON CONFLICT (date_key) DO UPDATE
             SET {column} = excluded.{column}, updated_at = current_timestamp"
        );
        let key = date.to_string();
        self.conn().execute(&sql, [key.as_str(), json.as_str()])?;
        debug!(date = %date, column, "upserted record half");
        Ok(())
    }

    /// Null out one column, then drop the row if both halves are gone.
    fn clear(&self, column: &str, date: DateKey) -> Result<(), StoreError> {
        let key = date.to_string();
        let conn = self.conn();
        conn.execute(
            &format!(
                "UPDATE daily_records SET {column} = NULL, updated_at = current_timestamp
                 WHERE date_key = ?"
            ),
            [key.as_str()],
        )?;
        conn.execute(
            "DELETE FROM daily_records
             WHERE date_key = ? AND analysis_data IS NULL AND lottery_result IS NULL",
            [key.as_str()],
        )?;
        debug!(date = %date, column, "cleared record half");
        Ok(())
    }
}

fn decode_record(
    analysis_data: Option<String>,
    lottery_result: Option<String>,
) -> Result<DailyRecord, StoreError> {
    let mut record = DailyRecord::default();
    if let Some(json) = analysis_data {
        record.merge_analysis(serde_json::from_str::<AnalysisPayload>(&json)?);
    }
    if let Some(json) = lottery_result {
        record.merge_lottery(serde_json::from_str::<LotteryResult>(&json)?);
    }
    Ok(record)
}

impl RecordStore for DuckStore {
    fn get(&self, date: DateKey) -> Result<Option<DailyRecord>, StoreError> {
        let key = date.to_string();
        let row = self.conn().query_row(
            "SELECT analysis_data, lottery_result FROM daily_records WHERE date_key = ?",
            [key.as_str()],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
        );
        match row {
            Ok((analysis, lottery)) => {
                let record = decode_record(analysis, lottery)?;
                Ok((!record.is_empty()).then_some(record))
            }
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all(&self) -> Result<History, StoreError> {
        let rows: Vec<(String, Option<String>, Option<String>)> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT date_key, analysis_data, lottery_result
                 FROM daily_records ORDER BY date_key",
            )?;
            let mapped = stmt.query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            mapped.collect::<Result<_, _>>()?
        };

        let mut history = History::new();
        for (key, analysis, lottery) in rows {
            let date: DateKey = key
                .parse()
                .map_err(|e: vninsights_core::ParseDateKeyError| StoreError::Other(e.to_string()))?;
            let record = decode_record(analysis, lottery)?;
            if !record.is_empty() {
                history.insert(date, record);
            }
        }
        Ok(history)
    }

    fn put_analysis(&self, date: DateKey, payload: AnalysisPayload) -> Result<(), StoreError> {
        payload.validate()?;
        self.upsert("analysis_data", date, serde_json::to_string(&payload)?)
    }

    fn put_lottery(&self, date: DateKey, result: LotteryResult) -> Result<(), StoreError> {
        result.validate()?;
        self.upsert("lottery_result", date, serde_json::to_string(&result)?)
    }

    fn delete_analysis(&self, date: DateKey) -> Result<(), StoreError> {
        self.clear("analysis_data", date)
    }

    fn delete_lottery(&self, date: DateKey) -> Result<(), StoreError> {
        self.clear("lottery_result", date)
    }

    fn backend_name(&self) -> &'static str {
        "duckdb"
    }
}
