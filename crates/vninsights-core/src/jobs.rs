//! Advisory progress tracking for background fetch jobs.
//!
//! The tracker lives for one process. It tells a polling caller whether a job
//! for a given day is running, finished, or failed and why. It is never the
//! record of whether work was done; the record store is. Losing it only means a
//! job may be triggered again.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DateKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Analysis,
    Lottery,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Analysis, JobKind::Lottery];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Lottery => "lottery",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analysis" => Ok(Self::Analysis),
            "lottery" => Ok(Self::Lottery),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    NotStarted,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusEntry {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusEntry {
    pub fn not_started() -> Self {
        Self {
            status: JobStatus::NotStarted,
            start_time: None,
            end_time: None,
            error: None,
        }
    }
}

/// Per-(day, kind) job state, shared behind an `Arc` by whoever needs it.
///
/// Transitions: `not_started -> processing -> {completed, failed}`. A `begin`
/// after a terminal state starts a fresh cycle with a new start time.
#[derive(Debug, Default)]
pub struct JobTracker {
    entries: Mutex<HashMap<(DateKey, JobKind), JobStatusEntry>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(DateKey, JobKind), JobStatusEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a job as processing. Returns the status it had before.
    ///
    /// A job that is already processing keeps its original start time.
    pub fn begin(&self, date: DateKey, kind: JobKind) -> JobStatus {
        self.begin_at(date, kind, Utc::now())
    }

    pub fn begin_at(&self, date: DateKey, kind: JobKind, now: DateTime<Utc>) -> JobStatus {
        let mut entries = self.lock();
        let previous = entries.get(&(date, kind)).cloned();
        let (prior_status, start_time) = match previous {
            Some(entry) if entry.status == JobStatus::Processing => {
                (entry.status, entry.start_time.unwrap_or(now))
            }
            Some(entry) => (entry.status, now),
            None => (JobStatus::NotStarted, now),
        };
        entries.insert(
            (date, kind),
            JobStatusEntry {
                status: JobStatus::Processing,
                start_time: Some(start_time),
                end_time: None,
                error: None,
            },
        );
        debug!(date = %date, kind = %kind, prior = %prior_status, "job processing");
        prior_status
    }

    pub fn complete(&self, date: DateKey, kind: JobKind) {
        self.complete_at(date, kind, Utc::now());
    }

    pub fn complete_at(&self, date: DateKey, kind: JobKind, now: DateTime<Utc>) {
        self.finish(date, kind, JobStatus::Completed, None, now);
    }

    pub fn fail(&self, date: DateKey, kind: JobKind, error: impl Into<String>) {
        self.fail_at(date, kind, error, Utc::now());
    }

    pub fn fail_at(
        &self,
        date: DateKey,
        kind: JobKind,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.finish(date, kind, JobStatus::Failed, Some(error.into()), now);
    }

    fn finish(
        &self,
        date: DateKey,
        kind: JobKind,
        status: JobStatus,
        error: Option<String>,
        now: DateTime<Utc>,
    ) {
        let mut entries = self.lock();
        let start_time = entries
            .get(&(date, kind))
            .and_then(|entry| entry.start_time)
            .unwrap_or(now);
        entries.insert(
            (date, kind),
            JobStatusEntry {
                status,
                start_time: Some(start_time),
                end_time: Some(now.max(start_time)),
                error,
            },
        );
        debug!(date = %date, kind = %kind, status = %status, "job finished");
    }

    /// Drop a processing job back to `not_started`.
    ///
    /// Used when the job found nothing to do yet, which is not a failure.
    /// Terminal entries are left alone.
    pub fn abandon(&self, date: DateKey, kind: JobKind) {
        let mut entries = self.lock();
        if entries
            .get(&(date, kind))
            .is_some_and(|entry| entry.status == JobStatus::Processing)
        {
            entries.remove(&(date, kind));
            debug!(date = %date, kind = %kind, "job abandoned");
        }
    }

    pub fn query(&self, date: DateKey, kind: JobKind) -> JobStatusEntry {
        self.lock()
            .get(&(date, kind))
            .cloned()
            .unwrap_or_else(JobStatusEntry::not_started)
    }

    /// All tracked jobs ordered by day, then kind.
    pub fn snapshot(&self) -> Vec<(DateKey, JobKind, JobStatusEntry)> {
        let mut all: Vec<_> = self
            .lock()
            .iter()
            .map(|((date, kind), entry)| (*date, *kind, entry.clone()))
            .collect();
        all.sort_by_key(|(date, kind, _)| (*date, *kind));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::sync::Arc;

    fn day() -> DateKey {
        "2024-01-15".parse().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T05:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn unknown_job_is_not_started() {
        let tracker = JobTracker::new();
        let entry = tracker.query(day(), JobKind::Analysis);
        assert_eq!(entry, JobStatusEntry::not_started());
    }

    #[test]
    fn begin_complete_cycle() {
        let tracker = JobTracker::new();
        assert_eq!(
            tracker.begin_at(day(), JobKind::Analysis, t0()),
            JobStatus::NotStarted
        );

        let running = tracker.query(day(), JobKind::Analysis);
        assert_eq!(running.status, JobStatus::Processing);
        assert_eq!(running.start_time, Some(t0()));
        assert!(running.end_time.is_none());

        let t1 = t0() + TimeDelta::seconds(42);
        tracker.complete_at(day(), JobKind::Analysis, t1);
        let done = tracker.query(day(), JobKind::Analysis);
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.start_time, Some(t0()));
        assert_eq!(done.end_time, Some(t1));
        assert!(done.end_time >= done.start_time);
    }

    #[test]
    fn begin_after_terminal_restarts_cycle() {
        let tracker = JobTracker::new();
        tracker.begin_at(day(), JobKind::Analysis, t0());
        tracker.complete_at(day(), JobKind::Analysis, t0() + TimeDelta::seconds(10));

        let t2 = t0() + TimeDelta::seconds(60);
        assert_eq!(
            tracker.begin_at(day(), JobKind::Analysis, t2),
            JobStatus::Completed
        );
        let restarted = tracker.query(day(), JobKind::Analysis);
        assert_eq!(restarted.status, JobStatus::Processing);
        assert_eq!(restarted.start_time, Some(t2));
        assert!(restarted.end_time.is_none());
    }

    #[test]
    fn repeated_begin_keeps_start_time() {
        let tracker = JobTracker::new();
        tracker.begin_at(day(), JobKind::Lottery, t0());
        let prior = tracker.begin_at(day(), JobKind::Lottery, t0() + TimeDelta::seconds(5));
        assert_eq!(prior, JobStatus::Processing);
        assert_eq!(
            tracker.query(day(), JobKind::Lottery).start_time,
            Some(t0())
        );
    }

    #[test]
    fn fail_records_error_and_end_time() {
        let tracker = JobTracker::new();
        tracker.begin_at(day(), JobKind::Lottery, t0());
        let t_fail = t0() + TimeDelta::seconds(60);
        tracker.fail_at(day(), JobKind::Lottery, "upstream timed out", t_fail);

        let failed = tracker.query(day(), JobKind::Lottery);
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("upstream timed out"));
        assert_eq!(failed.end_time, Some(t0() + TimeDelta::seconds(60)));

        // A new attempt clears the old error.
        tracker.begin_at(day(), JobKind::Lottery, t0() + TimeDelta::seconds(120));
        let retry = tracker.query(day(), JobKind::Lottery);
        assert!(retry.error.is_none());
        assert!(retry.end_time.is_none());
    }

    #[test]
    fn kinds_and_days_are_independent() {
        let tracker = JobTracker::new();
        tracker.begin_at(day(), JobKind::Analysis, t0());
        assert_eq!(
            tracker.query(day(), JobKind::Lottery).status,
            JobStatus::NotStarted
        );
        let other_day = day().succ().unwrap();
        assert_eq!(
            tracker.query(other_day, JobKind::Analysis).status,
            JobStatus::NotStarted
        );
    }

    #[test]
    fn abandon_only_affects_processing() {
        let tracker = JobTracker::new();
        tracker.begin_at(day(), JobKind::Lottery, t0());
        tracker.abandon(day(), JobKind::Lottery);
        assert_eq!(
            tracker.query(day(), JobKind::Lottery).status,
            JobStatus::NotStarted
        );

        tracker.begin_at(day(), JobKind::Analysis, t0());
        tracker.complete_at(day(), JobKind::Analysis, t0());
        tracker.abandon(day(), JobKind::Analysis);
        assert_eq!(
            tracker.query(day(), JobKind::Analysis).status,
            JobStatus::Completed
        );
    }

    #[test]
    fn snapshot_is_ordered() {
        let tracker = JobTracker::new();
        let next = day().succ().unwrap();
        tracker.begin_at(next, JobKind::Analysis, t0());
        tracker.begin_at(day(), JobKind::Lottery, t0());
        tracker.begin_at(day(), JobKind::Analysis, t0());

        let keys: Vec<_> = tracker
            .snapshot()
            .into_iter()
            .map(|(d, k, _)| (d, k))
            .collect();
        assert_eq!(
            keys,
            vec![
                (day(), JobKind::Analysis),
                (day(), JobKind::Lottery),
                (next, JobKind::Analysis),
            ]
        );
    }

    #[test]
    fn shared_across_threads() {
        let tracker = Arc::new(JobTracker::new());
        let handles: Vec<_> = JobKind::ALL
            .into_iter()
            .map(|kind| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    tracker.begin(day(), kind);
                    tracker.complete(day(), kind);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for kind in JobKind::ALL {
            assert_eq!(tracker.query(day(), kind).status, JobStatus::Completed);
        }
    }

    #[test]
    fn entry_json_shape() {
        let tracker = JobTracker::new();
        tracker.begin_at(day(), JobKind::Analysis, t0());
        let json = serde_json::to_value(tracker.query(day(), JobKind::Analysis)).unwrap();
        assert_eq!(json["status"], "processing");
        assert!(json.get("startTime").is_some());
        assert!(json.get("endTime").is_none());
    }
}
