//! The per-day unit: analysis and lottery result, each optional.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AnalysisPayload, AnalysisResult, DateKey, GroundingChunk, LotteryResult};

/// Every stored day, oldest first.
pub type History = BTreeMap<DateKey, DailyRecord>;

/// Everything known about one day.
///
/// The two halves arrive independently: the analysis around midday, the
/// lottery result after the evening draw. Writers touch only their own half.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lottery_result: Option<LotteryResult>,
}

impl DailyRecord {
    pub fn is_empty(&self) -> bool {
        self.analysis.is_none() && self.lottery_result.is_none()
    }

    /// Both halves present, so the day can be reconciled.
    pub fn is_complete(&self) -> bool {
        self.analysis.is_some() && self.lottery_result.is_some()
    }

    /// Set the analysis half, leaving the lottery half untouched.
    pub fn merge_analysis(&mut self, payload: AnalysisPayload) {
        self.analysis = Some(payload.analysis);
        self.grounding_chunks = Some(payload.grounding_chunks);
    }

    /// Set the lottery half, leaving the analysis half untouched.
    pub fn merge_lottery(&mut self, result: LotteryResult) {
        self.lottery_result = Some(result);
    }

    pub fn clear_analysis(&mut self) {
        self.analysis = None;
        self.grounding_chunks = None;
    }

    pub fn clear_lottery(&mut self) {
        self.lottery_result = None;
    }

    /// The analysis half as it would be written, if present.
    pub fn analysis_payload(&self) -> Option<AnalysisPayload> {
        self.analysis.as_ref().map(|analysis| AnalysisPayload {
            analysis: analysis.clone(),
            grounding_chunks: self.grounding_chunks.clone().unwrap_or_default(),
        })
    }
}
