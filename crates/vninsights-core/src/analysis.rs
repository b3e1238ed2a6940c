//! Daily news analysis produced by the generative model.
//!
//! Field names follow the camelCase JSON the model is asked to emit, so a
//! model reply deserializes straight into [`AnalysisResult`].

use serde::{Deserialize, Serialize};

use crate::ValidationError;
use crate::number::is_two_digit;

/// A suggested number with the model's label and justification.
///
/// Used for both the primary "best" number and the secondary lucky numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberPick {
    pub number: String,
    /// Category label, e.g. "Số Đề May Mắn Nhất".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Qualitative likelihood, e.g. "Cao".
    #[serde(default)]
    pub probability: String,
    #[serde(default)]
    pub reasoning: String,
}

/// A number that recurred in the day's news, with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopNumber {
    pub number: String,
    pub count: u32,
    #[serde(default)]
    pub reason: String,
}

/// A news event the model cited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub best_number: NumberPick,
    #[serde(default)]
    pub lucky_numbers: Vec<NumberPick>,
    /// Ranked by descending count.
    #[serde(default)]
    pub top_numbers: Vec<TopNumber>,
    #[serde(default)]
    pub events: Vec<EventSource>,
}

impl AnalysisResult {
    /// Reject results that cannot be reconciled against a draw.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.summary.trim().is_empty() {
            return Err(ValidationError::EmptySummary);
        }
        if !is_two_digit(&self.best_number.number) {
            return Err(ValidationError::BestNumber(self.best_number.number.clone()));
        }
        if self.lucky_numbers.is_empty() {
            return Err(ValidationError::NoLuckyNumbers);
        }
        if let Some(bad) = self
            .lucky_numbers
            .iter()
            .find(|pick| !is_two_digit(&pick.number))
        {
            return Err(ValidationError::LuckyNumber(bad.number.clone()));
        }
        Ok(())
    }

    /// Best number followed by the lucky numbers, in order.
    pub fn suggested_numbers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.best_number.number.as_str())
            .chain(self.lucky_numbers.iter().map(|pick| pick.number.as_str()))
    }
}

/// Web page backing a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

/// Source citation attached to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub web: WebSource,
}

impl GroundingChunk {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            web: WebSource {
                uri: uri.into(),
                title: title.into(),
            },
        }
    }
}

/// What an analysis write persists: the result plus its citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    pub analysis: AnalysisResult,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

impl AnalysisPayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.analysis.validate()
    }
}
