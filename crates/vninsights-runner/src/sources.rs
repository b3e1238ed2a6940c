//! The two upstreams a run depends on, as swappable traits.

use async_trait::async_trait;
use vninsights_ai::GeminiClient;
use vninsights_core::{AnalysisPayload, DateKey, LotteryResult};
use vninsights_xsmb::XsmbClient;

use crate::FetchError;

/// Produces the news analysis for one day.
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn fetch_analysis(&self, date: DateKey) -> Result<AnalysisPayload, FetchError>;
}

/// Looks up the published draw for a day.
#[async_trait]
pub trait LotterySource: Send + Sync {
    /// `Ok(None)` means the draw is not published yet.
    async fn fetch_lottery_result(
        &self,
        date: DateKey,
    ) -> Result<Option<LotteryResult>, FetchError>;
}

#[async_trait]
impl AnalysisSource for GeminiClient {
    async fn fetch_analysis(&self, date: DateKey) -> Result<AnalysisPayload, FetchError> {
        Ok(self.analyze(date).await?)
    }
}

#[async_trait]
impl LotterySource for XsmbClient {
    async fn fetch_lottery_result(
        &self,
        date: DateKey,
    ) -> Result<Option<LotteryResult>, FetchError> {
        Ok(self.lottery_result(date).await?)
    }
}
