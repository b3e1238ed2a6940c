//! In-process store. Nothing survives a restart.

use std::sync::{PoisonError, RwLock};

use vninsights_core::{AnalysisPayload, DailyRecord, DateKey, History, LotteryResult};

use crate::{RecordStore, StoreError};

/// Record store backed by an ordered map behind one lock.
///
/// Every write is a read-modify-write under the write lock, so racing writers
/// on the same day serialize instead of overwriting each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<History>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, date: DateKey, apply: impl FnOnce(&mut DailyRecord)) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(date).or_default();
        apply(record);
        if record.is_empty() {
            records.remove(&date);
        }
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, date: DateKey) -> Result<Option<DailyRecord>, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(&date).cloned())
    }

    fn get_all(&self) -> Result<History, StoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.clone())
    }

    fn put_analysis(&self, date: DateKey, payload: AnalysisPayload) -> Result<(), StoreError> {
        payload.validate()?;
        self.update(date, |record| record.merge_analysis(payload));
        Ok(())
    }

    fn put_lottery(&self, date: DateKey, result: LotteryResult) -> Result<(), StoreError> {
        result.validate()?;
        self.update(date, |record| record.merge_lottery(result));
        Ok(())
    }

    fn delete_analysis(&self, date: DateKey) -> Result<(), StoreError> {
        self.update(date, DailyRecord::clear_analysis);
        Ok(())
    }

    fn delete_lottery(&self, date: DateKey) -> Result<(), StoreError> {
        self.update(date, DailyRecord::clear_lottery);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
