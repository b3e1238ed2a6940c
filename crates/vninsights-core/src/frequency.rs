//! Aggregate statistics over stored history.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::reconcile::reconcile;
use crate::{DateKey, History};

/// How many days in the window each number made the day's top list.
///
/// The window covers `today` and the `window_days - 1` days before it.
/// Days without an analysis are skipped.
pub fn top_number_frequency(
    history: &History,
    window_days: u32,
    today: DateKey,
) -> BTreeMap<String, u32> {
    let mut freq = BTreeMap::new();
    if window_days == 0 {
        return freq;
    }
    let first = today
        .days_before(u64::from(window_days) - 1)
        .unwrap_or(DateKey::from_date(NaiveDate::MIN));
    for (_, record) in history.range(first..=today) {
        let Some(analysis) = &record.analysis else {
            continue;
        };
        for top in &analysis.top_numbers {
            *freq.entry(top.number.clone()).or_insert(0) += 1;
        }
    }
    freq
}

/// Reconciliation totals across every complete day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitRate {
    pub days: u32,
    /// Days with at least one hit of either kind.
    pub winning_days: u32,
    pub de: u32,
    pub lo: u32,
}

impl HitRate {
    pub fn winning_ratio(&self) -> f64 {
        if self.days == 0 {
            0.0
        } else {
            f64::from(self.winning_days) / f64::from(self.days)
        }
    }
}

pub fn hit_rate(history: &History) -> HitRate {
    history
        .values()
        .filter_map(reconcile)
        .fold(HitRate::default(), |mut acc, stats| {
            acc.days += 1;
            acc.de += stats.de;
            acc.lo += stats.lo;
            if stats.total() > 0 {
                acc.winning_days += 1;
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_analysis;
    use crate::{AnalysisPayload, DailyRecord, LotteryResult, TopNumber};

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    fn analysed(tops: &[&str]) -> DailyRecord {
        let mut analysis = sample_analysis();
        analysis.top_numbers = tops
            .iter()
            .map(|n| TopNumber {
                number: n.to_string(),
                count: 1,
                reason: String::new(),
            })
            .collect();
        let mut record = DailyRecord::default();
        record.merge_analysis(AnalysisPayload {
            analysis,
            grounding_chunks: vec![],
        });
        record
    }

    #[test]
    fn counts_days_within_window() {
        let mut history = History::new();
        history.insert(key("2024-01-01"), analysed(&["07", "11"]));
        history.insert(key("2024-01-14"), analysed(&["07", "23"]));
        history.insert(key("2024-01-15"), analysed(&["07"]));

        let freq = top_number_frequency(&history, 7, key("2024-01-15"));
        assert_eq!(freq.get("07"), Some(&2));
        assert_eq!(freq.get("23"), Some(&1));
        // 2024-01-01 is outside the 7-day window.
        assert_eq!(freq.get("11"), None);
    }

    #[test]
    fn skips_lottery_only_days_and_empty_window() {
        let mut history = History::new();
        let mut lottery_only = DailyRecord::default();
        lottery_only.merge_lottery(LotteryResult::new("07", vec!["07".into()]).unwrap());
        history.insert(key("2024-01-15"), lottery_only);

        assert!(top_number_frequency(&history, 30, key("2024-01-15")).is_empty());
        assert!(top_number_frequency(&history, 0, key("2024-01-15")).is_empty());
    }

    #[test]
    fn window_past_the_calendar_start_covers_everything() {
        let mut history = History::new();
        history.insert(key("1900-01-01"), analysed(&["07"]));
        history.insert(key("2024-01-15"), analysed(&["07", "23"]));

        let freq = top_number_frequency(&history, u32::MAX, key("2024-01-15"));
        assert_eq!(freq.get("07"), Some(&2));
        assert_eq!(freq.get("23"), Some(&1));
    }

    #[test]
    fn hit_rate_over_complete_days() {
        let mut history = History::new();

        // Suggestions 07, 23, 45: special 07 → one đề.
        let mut win = analysed(&[]);
        win.merge_lottery(LotteryResult::new("07", vec!["07".into()]).unwrap());
        history.insert(key("2024-01-14"), win);

        let mut miss = analysed(&[]);
        miss.merge_lottery(LotteryResult::new("99", vec!["99".into()]).unwrap());
        history.insert(key("2024-01-15"), miss);

        // Incomplete day is ignored.
        history.insert(key("2024-01-16"), analysed(&[]));

        let rate = hit_rate(&history);
        assert_eq!(rate.days, 2);
        assert_eq!(rate.winning_days, 1);
        assert_eq!(rate.de, 1);
        assert_eq!(rate.lo, 0);
        assert!((rate.winning_ratio() - 0.5).abs() < f64::EPSILON);
    }
}
