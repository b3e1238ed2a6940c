//! Job orchestration over the store and tracker.
//!
//! A run goes: skip if already stored (unless forced) → `begin` in the
//! tracker → fetch with retry → write one half of the record → `complete` or
//! `fail`. A lottery draw that is not published yet is neither a success nor a
//! failure: the tracker entry is dropped and nothing is written.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vninsights_core::{
    DailyRecord, DateKey, JobKind, JobStatus, JobStatusEntry, JobTracker, Settings, draw_published,
};
use vninsights_store::{RecordStore, StoreError};

use crate::{AnalysisSource, LotterySource, RetryPolicy, RunError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Skip the fetch when the half is already stored.
    #[default]
    Normal,
    /// Delete the stored half first, then fetch again.
    Force,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Fetched and stored.
    Completed,
    /// Already stored; nothing fetched.
    AlreadyDone,
    /// Another run for the same day and kind is in flight.
    AlreadyRunning,
    /// The draw is not published yet; nothing recorded.
    NotYetAvailable,
    /// Every attempt failed, or the upstream data was invalid.
    Failed(String),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::AlreadyDone => f.write_str("already stored"),
            Self::AlreadyRunning => f.write_str("already running"),
            Self::NotYetAvailable => f.write_str("not available yet"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A run started with [`Runner::spawn_analysis`] or [`Runner::spawn_lottery`].
#[derive(Debug)]
pub enum Launch {
    /// The job runs in the background.
    Started(JoinHandle<Result<RunOutcome, RunError>>),
    /// Nothing needed to run.
    Settled(RunOutcome),
}

impl Launch {
    /// Wait for the outcome.
    pub async fn wait(self) -> Result<RunOutcome, RunError> {
        match self {
            Self::Started(handle) => handle.await?,
            Self::Settled(outcome) => Ok(outcome),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub analysis_retry: RetryPolicy,
    pub lottery_retry: RetryPolicy,
    /// Vietnam time after which today's draw is looked up.
    pub lottery_ready_after: NaiveTime,
    pub backfill_pause: Duration,
}

impl RunnerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            analysis_retry: RetryPolicy::new(
                settings.retry_attempts,
                settings.retry_base_delay,
                settings.analysis_timeout,
            ),
            lottery_retry: RetryPolicy::new(
                settings.retry_attempts,
                settings.retry_base_delay,
                settings.lottery_timeout,
            ),
            lottery_ready_after: settings.lottery_ready_after,
            backfill_pause: settings.backfill_pause,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Stored halves and tracker state for one day.
#[derive(Debug, Clone)]
pub struct DayStatus {
    pub date: DateKey,
    pub analysis: JobStatusEntry,
    pub lottery: JobStatusEntry,
    pub record: Option<DailyRecord>,
}

/// What a backfill did, day by day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub filled: Vec<DateKey>,
    pub already_present: Vec<DateKey>,
    pub unavailable: Vec<DateKey>,
    pub failed: Vec<(DateKey, String)>,
}

/// Runs jobs against a shared store and tracker. Cheap to clone.
#[derive(Clone)]
pub struct Runner {
    store: Arc<dyn RecordStore>,
    tracker: Arc<JobTracker>,
    analysis: Arc<dyn AnalysisSource>,
    lottery: Arc<dyn LotterySource>,
    config: RunnerConfig,
}

fn has_half(record: &DailyRecord, kind: JobKind) -> bool {
    match kind {
        JobKind::Analysis => record.analysis.is_some(),
        JobKind::Lottery => record.lottery_result.is_some(),
    }
}

impl Runner {
    pub fn new(
        store: Arc<dyn RecordStore>,
        tracker: Arc<JobTracker>,
        analysis: Arc<dyn AnalysisSource>,
        lottery: Arc<dyn LotterySource>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            store,
            tracker,
            analysis,
            lottery,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn status(&self, date: DateKey) -> Result<DayStatus, RunError> {
        Ok(DayStatus {
            date,
            analysis: self.tracker.query(date, JobKind::Analysis),
            lottery: self.tracker.query(date, JobKind::Lottery),
            record: self.store.get(date)?,
        })
    }

    // ── Analysis ──

    pub async fn run_analysis(&self, date: DateKey, mode: RunMode) -> Result<RunOutcome, RunError> {
        if let Some(outcome) = self.prepare(date, JobKind::Analysis, mode)? {
            return Ok(outcome);
        }
        self.execute_analysis(date).await
    }

    /// Mark the job processing, then fetch in a background task.
    pub fn spawn_analysis(&self, date: DateKey, mode: RunMode) -> Result<Launch, RunError> {
        if let Some(outcome) = self.prepare(date, JobKind::Analysis, mode)? {
            return Ok(Launch::Settled(outcome));
        }
        let runner = self.clone();
        Ok(Launch::Started(tokio::spawn(async move {
            runner.execute_analysis(date).await
        })))
    }

    async fn execute_analysis(&self, date: DateKey) -> Result<RunOutcome, RunError> {
        let source = self.analysis.as_ref();
        let fetched = self
            .config
            .analysis_retry
            .run("analysis", move || source.fetch_analysis(date))
            .await;
        match fetched {
            Ok(payload) => {
                let written = self.store.put_analysis(date, payload);
                self.finish(date, JobKind::Analysis, written)
            }
            Err(e) => Ok(self.fail(date, JobKind::Analysis, e.to_string())),
        }
    }

    // ── Lottery ──

    pub async fn run_lottery(&self, date: DateKey, mode: RunMode) -> Result<RunOutcome, RunError> {
        self.run_lottery_at(date, mode, Utc::now()).await
    }

    /// Like [`run_lottery`](Self::run_lottery) with an explicit current instant.
    pub async fn run_lottery_at(
        &self,
        date: DateKey,
        mode: RunMode,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, RunError> {
        if let Some(outcome) = self.prepare_lottery(date, mode, now)? {
            return Ok(outcome);
        }
        self.execute_lottery(date).await
    }

    pub fn spawn_lottery(&self, date: DateKey, mode: RunMode) -> Result<Launch, RunError> {
        if let Some(outcome) = self.prepare_lottery(date, mode, Utc::now())? {
            return Ok(Launch::Settled(outcome));
        }
        let runner = self.clone();
        Ok(Launch::Started(tokio::spawn(async move {
            runner.execute_lottery(date).await
        })))
    }

    fn prepare_lottery(
        &self,
        date: DateKey,
        mode: RunMode,
        now: DateTime<Utc>,
    ) -> Result<Option<RunOutcome>, RunError> {
        if mode == RunMode::Normal && self.is_stored(date, JobKind::Lottery)? {
            return Ok(Some(RunOutcome::AlreadyDone));
        }
        if !draw_published(date, now, self.config.lottery_ready_after) {
            info!(
                date = %date,
                ready_after = %self.config.lottery_ready_after,
                "draw not published yet"
            );
            return Ok(Some(RunOutcome::NotYetAvailable));
        }
        self.prepare(date, JobKind::Lottery, mode)
    }

    async fn execute_lottery(&self, date: DateKey) -> Result<RunOutcome, RunError> {
        let source = self.lottery.as_ref();
        let fetched = self
            .config
            .lottery_retry
            .run("lottery", move || source.fetch_lottery_result(date))
            .await;
        match fetched {
            Ok(Some(result)) => {
                let written = self.store.put_lottery(date, result);
                self.finish(date, JobKind::Lottery, written)
            }
            Ok(None) => {
                self.tracker.abandon(date, JobKind::Lottery);
                info!(date = %date, "lottery result not published yet");
                Ok(RunOutcome::NotYetAvailable)
            }
            Err(e) => Ok(self.fail(date, JobKind::Lottery, e.to_string())),
        }
    }

    /// Fill in missing lottery results for the `days` days before `today`,
    /// most recent first.
    ///
    /// Upstream failures are collected in the report; a storage failure stops
    /// the backfill.
    pub async fn backfill(&self, days: u32, today: DateKey) -> Result<BackfillReport, RunError> {
        let mut report = BackfillReport::default();
        let mut fetched_before = false;

        for n in 1..=u64::from(days) {
            let Some(date) = today.days_before(n) else {
                break;
            };
            if self.is_stored(date, JobKind::Lottery)? {
                report.already_present.push(date);
                continue;
            }
            if fetched_before && !self.config.backfill_pause.is_zero() {
                tokio::time::sleep(self.config.backfill_pause).await;
            }
            fetched_before = true;

            match self.run_lottery(date, RunMode::Normal).await? {
                RunOutcome::Completed => report.filled.push(date),
                RunOutcome::AlreadyDone => report.already_present.push(date),
                RunOutcome::NotYetAvailable => report.unavailable.push(date),
                RunOutcome::AlreadyRunning => {
                    report.failed.push((date, RunOutcome::AlreadyRunning.to_string()))
                }
                RunOutcome::Failed(reason) => report.failed.push((date, reason)),
            }
        }

        info!(
            days,
            filled = report.filled.len(),
            present = report.already_present.len(),
            unavailable = report.unavailable.len(),
            failed = report.failed.len(),
            "backfill complete"
        );
        Ok(report)
    }

    // ── Shared steps ──

    fn is_stored(&self, date: DateKey, kind: JobKind) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get(date)?
            .is_some_and(|record| has_half(&record, kind)))
    }

    /// Decide whether a run goes ahead; if it does, it is now `processing`.
    fn prepare(
        &self,
        date: DateKey,
        kind: JobKind,
        mode: RunMode,
    ) -> Result<Option<RunOutcome>, RunError> {
        if mode == RunMode::Normal && self.is_stored(date, kind)? {
            info!(date = %date, kind = %kind, "already stored, skipping");
            return Ok(Some(RunOutcome::AlreadyDone));
        }
        if self.tracker.begin(date, kind) == JobStatus::Processing {
            info!(date = %date, kind = %kind, "already running");
            return Ok(Some(RunOutcome::AlreadyRunning));
        }
        if mode == RunMode::Force {
            let deleted = match kind {
                JobKind::Analysis => self.store.delete_analysis(date),
                JobKind::Lottery => self.store.delete_lottery(date),
            };
            match deleted {
                Ok(()) => {
                    info!(date = %date, kind = %kind, "cleared stored half before forced run")
                }
                Err(e) => warn!(
                    date = %date,
                    kind = %kind,
                    error = %e,
                    "could not clear stored half, continuing"
                ),
            }
        }
        info!(date = %date, kind = %kind, "job started");
        Ok(None)
    }

    fn finish(
        &self,
        date: DateKey,
        kind: JobKind,
        written: Result<(), StoreError>,
    ) -> Result<RunOutcome, RunError> {
        match written {
            Ok(()) => {
                self.tracker.complete(date, kind);
                info!(date = %date, kind = %kind, "job completed");
                Ok(RunOutcome::Completed)
            }
            Err(StoreError::Invalid(e)) => Ok(self.fail(date, kind, e.to_string())),
            Err(e) => {
                self.tracker.fail(date, kind, e.to_string());
                error!(date = %date, kind = %kind, error = %e, "could not store result");
                Err(e.into())
            }
        }
    }

    fn fail(&self, date: DateKey, kind: JobKind, reason: String) -> RunOutcome {
        warn!(date = %date, kind = %kind, error = %reason, "job failed");
        self.tracker.fail(date, kind, reason.clone());
        RunOutcome::Failed(reason)
    }
}
