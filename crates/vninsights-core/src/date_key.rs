//! Canonical calendar-day keys in Vietnam's fixed UTC+7 offset.
//!
//! Every "which day is it" decision goes through [`DateKey`], never through the
//! host's local timezone. Two instants map to the same key iff they fall on the
//! same civil day at UTC+7.
//!
//! Keys render as `YYYY-MM-DD`, so string order is chronological order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ParseDateKeyError;

/// Indochina Time offset. Vietnam observes no daylight saving.
pub const VIETNAM_OFFSET_SECS: i64 = 7 * 3600;

/// Wall-clock time in Vietnam for a UTC instant.
///
/// Saturates at the end of chrono's calendar instead of overflowing.
pub fn vietnam_time(instant: DateTime<Utc>) -> NaiveDateTime {
    instant
        .naive_utc()
        .checked_add_signed(TimeDelta::seconds(VIETNAM_OFFSET_SECS))
        .unwrap_or(NaiveDateTime::MAX)
}

/// One civil day at UTC+7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Key for the UTC+7 civil day containing `instant`.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self(vietnam_time(instant).date())
    }

    /// Key for the current UTC+7 day.
    pub fn today() -> Self {
        Self::from_instant(Utc::now())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following day, `None` past the end of the calendar.
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    pub fn days_before(&self, n: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(n)).map(Self)
    }

    /// Whole days from `self` to `later` (negative if `later` is earlier).
    pub fn days_until(&self, later: &DateKey) -> i64 {
        (later.0 - self.0).num_days()
    }

    /// Vietnamese display form, e.g. `Thứ Hai, 15/01/2024`.
    pub fn display_vi(&self) -> String {
        let weekday = match self.0.weekday() {
            Weekday::Mon => "Thứ Hai",
            Weekday::Tue => "Thứ Ba",
            Weekday::Wed => "Thứ Tư",
            Weekday::Thu => "Thứ Năm",
            Weekday::Fri => "Thứ Sáu",
            Weekday::Sat => "Thứ Bảy",
            Weekday::Sun => "Chủ Nhật",
        };
        format!("{weekday}, {}", self.0.format("%d/%m/%Y"))
    }
}

impl From<DateTime<Utc>> for DateKey {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::from_instant(instant)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = ParseDateKeyError;

    /// Accepts `YYYY-MM-DD`, and `DD-MM-YYYY` as emitted by the XSMB API.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseDateKeyError {
            input: s.to_string(),
        };
        let parts: Vec<&str> = s.split('-').collect();
        let all_digits = parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
        if parts.len() != 3 || !all_digits {
            return Err(err());
        }
        let (y, m, d) = match (parts[0].len(), parts[1].len(), parts[2].len()) {
            (4, 2, 2) => (parts[0], parts[1], parts[2]),
            (2, 2, 4) => (parts[2], parts[1], parts[0]),
            _ => return Err(err()),
        };
        let year = y.parse().map_err(|_| err())?;
        let month = m.parse().map_err(|_| err())?;
        let day = d.parse().map_err(|_| err())?;
        Self::from_ymd(year, month, day).ok_or_else(err)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
