//! Storage layer: one record per day, two independently written halves.
//!
//! Every backend implements [`RecordStore`] with the same merge contract:
//! writing the lottery result never disturbs the analysis and vice versa, and
//! each half can be deleted on its own.

use std::path::Path;
use std::sync::Arc;

use vninsights_core::{AnalysisPayload, DailyRecord, DateKey, History, LotteryResult, StoreBackend};

mod error;
pub use error::StoreError;

mod file;
mod memory;
pub mod transfer;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use transfer::{ImportMode, ImportSummary, export_json, import_json};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

/// File name of the DuckDB database inside the data directory.
pub const DUCKDB_FILE: &str = "vninsights.duckdb";

/// Durable mapping from day to [`DailyRecord`].
///
/// Implementations must be safe to share between concurrent writers: an
/// analysis write and a lottery write racing on the same day both land.
pub trait RecordStore: Send + Sync {
    /// The record for `date`, or `None` if nothing was ever written.
    fn get(&self, date: DateKey) -> Result<Option<DailyRecord>, StoreError>;

    /// Every stored record, oldest first.
    fn get_all(&self) -> Result<History, StoreError>;

    /// Set the analysis half (and its citations), creating the record if needed.
    fn put_analysis(&self, date: DateKey, payload: AnalysisPayload) -> Result<(), StoreError>;

    /// Set the lottery half, creating the record if needed.
    fn put_lottery(&self, date: DateKey, result: LotteryResult) -> Result<(), StoreError>;

    /// Clear the analysis half only. A no-op if it is absent.
    fn delete_analysis(&self, date: DateKey) -> Result<(), StoreError>;

    /// Clear the lottery half only. A no-op if it is absent.
    fn delete_lottery(&self, date: DateKey) -> Result<(), StoreError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Open the configured backend rooted at `data_dir`.
pub fn open_store(
    backend: StoreBackend,
    data_dir: &Path,
) -> Result<Arc<dyn RecordStore>, StoreError> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::open(data_dir)?)),
        #[cfg(feature = "duckdb")]
        StoreBackend::DuckDb => {
            std::fs::create_dir_all(data_dir).map_err(|e| StoreError::io(data_dir, e))?;
            Ok(Arc::new(DuckStore::open_persistent(&data_dir.join(DUCKDB_FILE))?))
        }
        #[cfg(not(feature = "duckdb"))]
        StoreBackend::DuckDb => Err(StoreError::Other(
            "this build has no duckdb support (enable the `duckdb` feature)".into(),
        )),
    }
}
