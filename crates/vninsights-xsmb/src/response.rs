//! Wire types of the XSMB results API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vninsights_core::{DateKey, LotteryResult, ValidationError};

/// Prize tiers in draw order, with their Vietnamese names.
pub const PRIZE_TIERS: [(&str, &str); 8] = [
    ("ĐB", "Đặc biệt"),
    ("1", "Giải nhất"),
    ("2", "Giải nhì"),
    ("3", "Giải ba"),
    ("4", "Giải tư"),
    ("5", "Giải năm"),
    ("6", "Giải sáu"),
    ("7", "Giải bảy"),
];

const SPECIAL_TIER: &str = "ĐB";

/// Envelope returned for both single-day and range queries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct XsmbResponse {
    pub ok: bool,
    #[serde(default)]
    pub range: bool,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Present for single-day queries.
    #[serde(default)]
    pub data: Option<DrawData>,
    /// Present for range queries.
    #[serde(default)]
    pub results: Option<Vec<DrawEntry>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One day inside a range response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrawEntry {
    /// Upstream uses `DD-MM-YYYY` here.
    pub date: String,
    #[serde(default)]
    pub data: Option<DrawData>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The full prize table of one draw.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawData {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub region: String,
    /// Tier key (`ĐB`, `1`..`7`) to the full numbers drawn for it.
    #[serde(default)]
    pub prizes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub all_numbers: Vec<String>,
}

impl DrawData {
    /// At least one tier has numbers.
    pub fn has_results(&self) -> bool {
        self.prizes.values().any(|numbers| !numbers.is_empty())
    }

    /// Numbers of one tier, in draw order.
    pub fn tier(&self, key: &str) -> &[String] {
        self.prizes.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Reduce the table to tails.
    ///
    /// `Ok(None)` when the draw has no special prize yet. A number too short
    /// or not ending in digits is an error: the table is malformed.
    pub fn to_lottery_result(&self) -> Result<Option<LotteryResult>, ValidationError> {
        if !self.has_results() {
            return Ok(None);
        }
        let Some(special) = self.tier(SPECIAL_TIER).first() else {
            return Ok(None);
        };
        let numbers = self
            .prizes
            .values()
            .flatten()
            .map(String::as_str)
            .filter(|n| !n.is_empty());
        LotteryResult::from_prize_numbers(special, numbers).map(Some)
    }
}

impl XsmbResponse {
    /// The single-day result, if the upstream has one.
    pub fn lottery_result(&self) -> Result<Option<LotteryResult>, ValidationError> {
        match (self.ok, &self.data) {
            (true, Some(data)) => data.to_lottery_result(),
            _ => Ok(None),
        }
    }

    /// Every day of a range response with a parseable date.
    ///
    /// Days the upstream could not produce map to `None`; entries whose date
    /// cannot be read are dropped.
    pub fn lottery_results(
        &self,
    ) -> Result<Vec<(DateKey, Option<LotteryResult>)>, ValidationError> {
        if !self.ok {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in self.results.iter().flatten() {
            let Ok(date) = entry.date.parse::<DateKey>() else {
                continue;
            };
            let result = match &entry.data {
                Some(data) => data.to_lottery_result()?,
                None => None,
            };
            out.push((date, result));
        }
        out.sort_by_key(|(date, _)| *date);
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const DAY_JSON: &str = r#"{
        "ok": true,
        "range": false,
        "region": "mb",
        "date": "2024-01-15",
        "data": {
            "date": "15-01-2024",
            "region": "mb",
            "prizes": {
                "ĐB": ["12307"],
                "1": ["45623"],
                "2": ["11145", "22207"],
                "3": ["00001", "99999"],
                "4": ["1234"],
                "5": ["5678"],
                "6": ["123"],
                "7": ["45", "07"]
            },
            "allNumbers": [],
            "meta": {"detectedDate": "15-01-2024", "tableSource": "main"}
        }
    }"#;

    #[test]
    fn single_day_is_reduced_to_tails() {
        let resp: XsmbResponse = serde_json::from_str(DAY_JSON).unwrap();
        let result = resp.lottery_result().unwrap().unwrap();
        assert_eq!(result.special_prize, "07");
        assert_eq!(
            result.all_prizes,
            vec!["01", "07", "23", "34", "45", "78", "99"]
        );
        assert!(result.contains("23"));
    }

    #[test]
    fn not_ok_means_not_available() {
        let json = r#"{"ok": false, "range": false, "region": "mb", "error": "Không tìm thấy kết quả"}"#;
        let resp: XsmbResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.lottery_result().unwrap(), None);
    }

    #[test]
    fn empty_table_means_not_available() {
        let json = r#"{"ok": true, "region": "mb", "data": {"prizes": {"ĐB": [], "1": []}}}"#;
        let resp: XsmbResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.lottery_result().unwrap(), None);
    }

    #[test]
    fn missing_special_prize_means_not_available() {
        let json = r#"{"ok": true, "region": "mb", "data": {"prizes": {"1": ["45623"]}}}"#;
        let resp: XsmbResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.lottery_result().unwrap(), None);
    }

    #[test]
    fn garbage_number_is_an_error() {
        let json = r#"{"ok": true, "region": "mb", "data": {"prizes": {"ĐB": ["12a"]}}}"#;
        let resp: XsmbResponse = serde_json::from_str(json).unwrap();
        assert!(resp.lottery_result().is_err());
    }

    #[test]
    fn range_entries_are_keyed_and_sorted() {
        let json = r#"{
            "ok": true, "range": true, "region": "mb",
            "start": "2024-01-14", "end": "2024-01-16",
            "results": [
                {"date": "16-01-2024", "error": "not drawn yet"},
                {"date": "14-01-2024", "data": {"prizes": {"ĐB": ["99911"], "7": ["11", "42"]}}},
                {"date": "15-01-2024", "data": {"prizes": {"ĐB": ["12307"]}}},
                {"date": "someday"}
            ]
        }"#;
        let resp: XsmbResponse = serde_json::from_str(json).unwrap();
        let results = resp.lottery_results().unwrap();

        let dates: Vec<String> = results.iter().map(|(d, _)| d.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-14", "2024-01-15", "2024-01-16"]);
        assert_eq!(results[0].1.as_ref().unwrap().all_prizes, vec!["11", "42"]);
        assert_eq!(results[1].1.as_ref().unwrap().special_prize, "07");
        assert!(results[2].1.is_none());
    }

    #[test]
    fn tiers_are_read_in_draw_order() {
        let resp: XsmbResponse = serde_json::from_str(DAY_JSON).unwrap();
        let data = resp.data.unwrap();
        let first: Vec<&str> = PRIZE_TIERS
            .iter()
            .filter_map(|(key, _)| data.tier(key).first().map(String::as_str))
            .collect();
        assert_eq!(first[0], "12307");
        assert_eq!(first[7], "45");
        assert!(data.tier("8").is_empty());
    }
}
