//! Northern lottery (XSMB) results reduced to their two-digit tails.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::number::{is_two_digit, last_two_digits};
use crate::{DateKey, ValidationError, vietnam_time};

/// The draw starts at 18:15 Vietnam time; nothing can be published earlier.
pub fn draw_start() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 15, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryResult {
    /// Last two digits of the special prize.
    pub special_prize: String,
    /// Last two digits of every prize, special included.
    pub all_prizes: Vec<String>,
}

impl LotteryResult {
    /// Build a validated result from two-digit values.
    pub fn new(
        special_prize: impl Into<String>,
        all_prizes: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let result = Self {
            special_prize: special_prize.into(),
            all_prizes,
        };
        result.validate()?;
        Ok(result)
    }

    /// Reduce full prize numbers to their tails.
    ///
    /// `special` is the full special-prize number; `numbers` are every prize
    /// number of the draw. Tails are deduplicated and sorted.
    pub fn from_prize_numbers<'a>(
        special: &str,
        numbers: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ValidationError> {
        let special_prize = last_two_digits(special)
            .ok_or_else(|| ValidationError::SpecialPrize(special.to_string()))?
            .to_string();
        let mut all_prizes = numbers
            .into_iter()
            .map(|n| {
                last_two_digits(n)
                    .map(str::to_string)
                    .ok_or_else(|| ValidationError::PrizeEntry(n.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        all_prizes.sort();
        all_prizes.dedup();
        Ok(Self {
            special_prize,
            all_prizes,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_two_digit(&self.special_prize) {
            return Err(ValidationError::SpecialPrize(self.special_prize.clone()));
        }
        if let Some(bad) = self.all_prizes.iter().find(|p| !is_two_digit(p)) {
            return Err(ValidationError::PrizeEntry(bad.clone()));
        }
        Ok(())
    }

    /// Whether `number` appears among any prize tails.
    pub fn contains(&self, number: &str) -> bool {
        self.all_prizes.iter().any(|p| p == number)
    }
}

/// Whether the draw for `date` can have been published at `now`.
///
/// Past days are always published, future days never; today only from
/// `ready_after` (Vietnam wall-clock time) on.
pub fn draw_published(date: DateKey, now: DateTime<Utc>, ready_after: NaiveTime) -> bool {
    let today = DateKey::from_instant(now);
    match date.cmp(&today) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => vietnam_time(now).time() >= ready_after.max(draw_start()),
    }
}
