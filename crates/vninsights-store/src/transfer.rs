//! Whole-history export and import as a single JSON document.
//!
//! The document is an object keyed by day: `{ "2024-01-15": DailyRecord }`.
//! Import goes through the normal put operations, so it merges half by half
//! and validates like any other write.

use tracing::{info, warn};
use vninsights_core::{DateKey, History};

use crate::{RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Only write halves the store does not have yet.
    #[default]
    FillMissing,
    /// Write every half present in the document.
    Overwrite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub analyses_written: usize,
    pub lotteries_written: usize,
    /// Halves skipped because the store already had them.
    pub skipped: usize,
    /// Halves that failed validation, with the reason.
    pub rejected: Vec<(DateKey, String)>,
}

/// Serialize the full history, pretty-printed.
pub fn export_json(store: &dyn RecordStore) -> Result<String, StoreError> {
    let history = store.get_all()?;
    info!(days = history.len(), "exporting history");
    Ok(serde_json::to_string_pretty(&history)?)
}

/// Merge a history document into `store`.
///
/// Invalid halves are reported in the summary and skipped; storage failures
/// abort the import.
pub fn import_json(
    store: &dyn RecordStore,
    json: &str,
    mode: ImportMode,
) -> Result<ImportSummary, StoreError> {
    let incoming: History = serde_json::from_str(json)?;
    let mut summary = ImportSummary::default();

    for (date, record) in incoming {
        let existing = store.get(date)?.unwrap_or_default();

        if let Some(payload) = record.analysis_payload() {
            if mode == ImportMode::FillMissing && existing.analysis.is_some() {
                summary.skipped += 1;
            } else {
                match store.put_analysis(date, payload) {
                    Ok(()) => summary.analyses_written += 1,
                    Err(StoreError::Invalid(e)) => {
                        warn!(date = %date, error = %e, "rejected imported analysis");
                        summary.rejected.push((date, e.to_string()));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if let Some(result) = record.lottery_result {
            if mode == ImportMode::FillMissing && existing.lottery_result.is_some() {
                summary.skipped += 1;
            } else {
                match store.put_lottery(date, result) {
                    Ok(()) => summary.lotteries_written += 1,
                    Err(StoreError::Invalid(e)) => {
                        warn!(date = %date, error = %e, "rejected imported lottery result");
                        summary.rejected.push((date, e.to_string()));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    info!(
        analyses = summary.analyses_written,
        lotteries = summary.lotteries_written,
        skipped = summary.skipped,
        rejected = summary.rejected.len(),
        "import complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::conformance::{analysis, key, lottery};

    #[test]
    fn export_then_import_into_empty_store() {
        let source = MemoryStore::new();
        source.put_analysis(key("2024-01-14"), analysis("07")).unwrap();
        source.put_lottery(key("2024-01-14"), lottery("07")).unwrap();
        source.put_lottery(key("2024-01-15"), lottery("11")).unwrap();

        let json = export_json(&source).unwrap();

        let target = MemoryStore::new();
        let summary = import_json(&target, &json, ImportMode::FillMissing).unwrap();
        assert_eq!(summary.analyses_written, 1);
        assert_eq!(summary.lotteries_written, 2);
        assert_eq!(target.get_all().unwrap(), source.get_all().unwrap());
    }

    #[test]
    fn fill_missing_keeps_existing_halves() {
        let store = MemoryStore::new();
        store.put_lottery(key("2024-01-15"), lottery("99")).unwrap();

        let other = MemoryStore::new();
        other.put_analysis(key("2024-01-15"), analysis("07")).unwrap();
        other.put_lottery(key("2024-01-15"), lottery("07")).unwrap();
        let json = export_json(&other).unwrap();

        let summary = import_json(&store, &json, ImportMode::FillMissing).unwrap();
        assert_eq!(summary.analyses_written, 1);
        assert_eq!(summary.skipped, 1);

        let record = store.get(key("2024-01-15")).unwrap().unwrap();
        assert_eq!(record.lottery_result, Some(lottery("99")));
        assert!(record.analysis.is_some());
    }

    #[test]
    fn overwrite_replaces_present_halves() {
        let store = MemoryStore::new();
        store.put_lottery(key("2024-01-15"), lottery("99")).unwrap();

        let json = r#"{"2024-01-15": {"lotteryResult": {"specialPrize": "07", "allPrizes": ["07"]}}}"#;
        let summary = import_json(&store, json, ImportMode::Overwrite).unwrap();
        assert_eq!(summary.lotteries_written, 1);
        assert_eq!(
            store.get(key("2024-01-15")).unwrap().unwrap().lottery_result.unwrap().special_prize,
            "07"
        );
    }

    #[test]
    fn invalid_halves_are_reported_not_fatal() {
        let store = MemoryStore::new();
        let json = r#"{
            "2024-01-14": {"lotteryResult": {"specialPrize": "7", "allPrizes": []}},
            "2024-01-15": {"lotteryResult": {"specialPrize": "07", "allPrizes": ["07"], "source": "legacy"}}
        }"#;
        let summary = import_json(&store, json, ImportMode::FillMissing).unwrap();
        assert_eq!(summary.lotteries_written, 1);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].0, key("2024-01-14"));
        assert!(store.get(key("2024-01-14")).unwrap().is_none());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            import_json(&store, "[1, 2, 3]", ImportMode::FillMissing),
            Err(StoreError::Json(_))
        ));
    }
}
