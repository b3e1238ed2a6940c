//! Reconcile a day's suggested numbers against the published draw.
//!
//! A number matching the special prize is a *đề* hit; any other prize match is
//! a *lô* hit. One number never counts as both.

use serde::Serialize;

use crate::{AnalysisResult, DailyRecord, LotteryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hit {
    /// Matches the special prize (đề).
    SpecialPrize,
    /// Matches some other prize (lô).
    AnyPrize,
    Miss,
}

impl Hit {
    pub fn check(number: &str, result: &LotteryResult) -> Self {
        if result.special_prize == number {
            Self::SpecialPrize
        } else if result.contains(number) {
            Self::AnyPrize
        } else {
            Self::Miss
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SpecialPrize => "Trúng Đề",
            Self::AnyPrize => "Trúng Lô",
            Self::Miss => "Không trúng",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WinStats {
    pub de: u32,
    pub lo: u32,
}

impl WinStats {
    /// Count hits for the best number and every lucky number.
    pub fn compute(analysis: &AnalysisResult, result: &LotteryResult) -> Self {
        analysis
            .suggested_numbers()
            .fold(Self::default(), |mut stats, number| {
                match Hit::check(number, result) {
                    Hit::SpecialPrize => stats.de += 1,
                    Hit::AnyPrize => stats.lo += 1,
                    Hit::Miss => {}
                }
                stats
            })
    }

    pub fn total(&self) -> u32 {
        self.de + self.lo
    }
}

/// Win stats for a record, or `None` until both halves are present.
pub fn reconcile(record: &DailyRecord) -> Option<WinStats> {
    match (&record.analysis, &record.lottery_result) {
        (Some(analysis), Some(result)) => Some(WinStats::compute(analysis, result)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_analysis;
    use crate::AnalysisPayload;

    fn result(special: &str, all: &[&str]) -> LotteryResult {
        LotteryResult::new(special, all.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn special_prize_wins_over_any_prize() {
        let r = result("07", &["07", "23"]);
        assert_eq!(Hit::check("07", &r), Hit::SpecialPrize);
        assert_eq!(Hit::check("23", &r), Hit::AnyPrize);
        assert_eq!(Hit::check("99", &r), Hit::Miss);
    }

    #[test]
    fn counts_best_and_lucky_numbers() {
        // Suggestions are 07 (best), 23, 45.
        let analysis = sample_analysis();
        let stats = WinStats::compute(&analysis, &result("07", &["07", "45", "88"]));
        assert_eq!(stats, WinStats { de: 1, lo: 1 });
        assert_eq!(stats.total(), 2);
    }

    #[test]
    fn no_hits() {
        let stats = WinStats::compute(&sample_analysis(), &result("11", &["11", "12"]));
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn reconcile_needs_both_halves() {
        let mut record = DailyRecord::default();
        record.merge_lottery(result("23", &["23"]));
        assert_eq!(reconcile(&record), None);

        record.merge_analysis(AnalysisPayload {
            analysis: sample_analysis(),
            grounding_chunks: vec![],
        });
        // Lucky number 23 is the special prize.
        assert_eq!(reconcile(&record), Some(WinStats { de: 1, lo: 0 }));
    }
}
