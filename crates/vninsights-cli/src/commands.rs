//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use vninsights_ai::{AiError, GeminiClient};
use vninsights_core::{AnalysisPayload, DateKey, JobKind, JobTracker, Settings, draw_published};
use vninsights_runner::{
    AnalysisSource, FetchError, Launch, RunMode, RunOutcome, Runner, RunnerConfig,
};
use vninsights_store::{ImportMode, RecordStore, export_json, import_json, open_store};
use vninsights_xsmb::XsmbClient;

use crate::cli::Command;
use crate::display;

/// How often a running job's tracker entry is echoed while waiting.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Stands in for Gemini when no API key is configured.
///
/// Commands that only touch stored data or the lottery API still need a
/// runner; an analysis attempted through this source fails cleanly.
struct NoAnalysis;

#[async_trait]
impl AnalysisSource for NoAnalysis {
    async fn fetch_analysis(&self, _date: DateKey) -> Result<AnalysisPayload, FetchError> {
        Err(FetchError::Upstream(AiError::MissingApiKey.to_string()))
    }
}

fn mode(force: bool) -> RunMode {
    if force { RunMode::Force } else { RunMode::Normal }
}

fn store_for(settings: &Settings) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store = open_store(settings.backend, &settings.data_dir).with_context(|| {
        format!(
            "failed to open {} store in {}",
            settings.backend,
            settings.data_dir.display()
        )
    })?;
    debug!(backend = store.backend_name(), "store opened");
    Ok(store)
}

fn build_runner(
    settings: &Settings,
    store: Arc<dyn RecordStore>,
    needs_analysis: bool,
) -> anyhow::Result<Runner> {
    let analysis: Arc<dyn AnalysisSource> = match GeminiClient::new(&settings.gemini) {
        Ok(client) => Arc::new(client),
        Err(e) if needs_analysis => return Err(e).context("cannot run the news analysis"),
        Err(_) => Arc::new(NoAnalysis),
    };
    let lottery = Arc::new(
        XsmbClient::new(settings.xsmb_base_url.clone())
            .context("failed to build the XSMB client")?,
    );
    Ok(Runner::new(
        store,
        Arc::new(JobTracker::new()),
        analysis,
        lottery,
        RunnerConfig::from_settings(settings),
    ))
}

pub async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    match command {
        Command::Analyze { force, date } => {
            let date = date.unwrap_or_else(DateKey::today);
            let runner = build_runner(&settings, store_for(&settings)?, true)?;
            let launch = runner.spawn_analysis(date, mode(force))?;
            let outcome = follow(&runner, date, JobKind::Analysis, launch).await?;
            finish(&runner, date, JobKind::Analysis, &outcome)
        }
        Command::Lottery { force, date } => {
            let date = date.unwrap_or_else(DateKey::today);
            let runner = build_runner(&settings, store_for(&settings)?, false)?;
            let launch = runner.spawn_lottery(date, mode(force))?;
            let outcome = follow(&runner, date, JobKind::Lottery, launch).await?;
            finish(&runner, date, JobKind::Lottery, &outcome)
        }
        Command::Status { date } => {
            let date = date.unwrap_or_else(DateKey::today);
            let runner = build_runner(&settings, store_for(&settings)?, false)?;
            let status = runner.status(date)?;
            let published = draw_published(date, Utc::now(), settings.lottery_ready_after);
            println!("{}", display::status_report(&status, published));
            Ok(())
        }
        Command::Show { date } => {
            let date = date.unwrap_or_else(DateKey::today);
            match store_for(&settings)?.get(date)? {
                Some(record) => println!("{}", display::record_card(date, &record)),
                None => println!("No record for {date}."),
            }
            Ok(())
        }
        Command::History { limit } => {
            let history = store_for(&settings)?.get_all()?;
            println!("{}", display::history_lines(&history, limit));
            Ok(())
        }
        Command::Stats { days } => {
            let history = store_for(&settings)?.get_all()?;
            println!("{}", display::stats_report(&history, days, DateKey::today()));
            Ok(())
        }
        Command::Results { date, start, end } => {
            let client = XsmbClient::new(settings.xsmb_base_url.clone())
                .context("failed to build the XSMB client")?;
            match (start, end) {
                (Some(start), Some(end)) => show_range(&client, start, end).await,
                _ => show_day(&client, date.unwrap_or_else(DateKey::today)).await,
            }
        }
        Command::Backfill { days } => {
            let runner = build_runner(&settings, store_for(&settings)?, false)?;
            info!(days, "backfilling lottery results");
            let report = runner.backfill(days, DateKey::today()).await?;
            println!("{}", display::backfill_summary(&report));
            Ok(())
        }
        Command::Export { path } => export(store_for(&settings)?.as_ref(), &path),
        Command::Import { path, overwrite } => {
            let mode = if overwrite {
                ImportMode::Overwrite
            } else {
                ImportMode::FillMissing
            };
            import(store_for(&settings)?.as_ref(), &path, mode)
        }
    }
}

/// Wait for a launched job, echoing its tracker entry while it runs.
async fn follow(
    runner: &Runner,
    date: DateKey,
    kind: JobKind,
    launch: Launch,
) -> anyhow::Result<RunOutcome> {
    let mut handle = match launch {
        Launch::Settled(outcome) => return Ok(outcome),
        Launch::Started(handle) => handle,
    };

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.tick().await;
    loop {
        tokio::select! {
            joined = &mut handle => {
                return Ok(joined.context("background job panicked")??);
            }
            _ = ticker.tick() => {
                let entry = runner.tracker().query(date, kind);
                let elapsed = entry
                    .start_time
                    .map(|start| (Utc::now() - start).num_seconds())
                    .unwrap_or_default();
                eprintln!("  {kind} {date}: {} ({elapsed}s)", entry.status);
            }
        }
    }
}

fn finish(
    runner: &Runner,
    date: DateKey,
    kind: JobKind,
    outcome: &RunOutcome,
) -> anyhow::Result<()> {
    println!("{kind} {date}: {outcome}");
    match outcome {
        RunOutcome::Completed | RunOutcome::AlreadyDone => {
            if let Some(record) = runner.store().get(date)? {
                println!();
                println!("{}", display::record_card(date, &record));
            }
            Ok(())
        }
        RunOutcome::Failed(reason) => bail!("{kind} for {date} failed: {reason}"),
        RunOutcome::AlreadyRunning | RunOutcome::NotYetAvailable => Ok(()),
    }
}

async fn show_day(client: &XsmbClient, date: DateKey) -> anyhow::Result<()> {
    let resp = client
        .fetch_day(date)
        .await
        .with_context(|| format!("failed to fetch XSMB results for {date}"))?;
    match resp.data.as_ref().filter(|data| resp.ok && data.has_results()) {
        Some(data) => println!("{}", display::prize_table(&date.to_string(), data)),
        None => println!(
            "No XSMB result for {date}: {}",
            resp.error.as_deref().unwrap_or("not published yet")
        ),
    }
    Ok(())
}

async fn show_range(client: &XsmbClient, start: DateKey, end: DateKey) -> anyhow::Result<()> {
    if end < start {
        bail!("range end {end} is before start {start}");
    }
    let resp = client
        .fetch_range(start, end)
        .await
        .with_context(|| format!("failed to fetch XSMB results for {start}..{end}"))?;
    let entries = resp.results.unwrap_or_default();
    if entries.is_empty() {
        println!("No XSMB results between {start} and {end}.");
    }
    for entry in &entries {
        match entry.data.as_ref().filter(|data| data.has_results()) {
            Some(data) => println!("{}\n", display::prize_table(&entry.date, data)),
            None => println!(
                "{}: {}\n",
                entry.date,
                entry.error.as_deref().unwrap_or("no result")
            ),
        }
    }
    Ok(())
}

fn export(store: &dyn RecordStore, path: &Path) -> anyhow::Result<()> {
    let json = export_json(store)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), backend = store.backend_name(), "history exported");
    println!("Exported history to {}", path.display());
    Ok(())
}

fn import(store: &dyn RecordStore, path: &Path, mode: ImportMode) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let summary = import_json(store, &json, mode)
        .with_context(|| format!("failed to import {}", path.display()))?;
    println!("{}", display::import_summary(&summary));
    Ok(())
}

#[cfg(test)]
mod tests {
    use vninsights_core::{LotteryResult, StoreBackend};

    use super::*;

    fn settings(dir: &Path) -> Settings {
        Settings {
            data_dir: dir.to_path_buf(),
            backend: StoreBackend::File,
            ..Settings::default()
        }
    }

    #[test]
    fn runner_without_key_only_when_analysis_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            gemini: vninsights_core::GeminiSettings {
                api_key: None,
                ..Default::default()
            },
            ..settings(dir.path())
        };
        let store = store_for(&settings).unwrap();
        assert!(build_runner(&settings, store.clone(), false).is_ok());
        let err = build_runner(&settings, store, true).err().unwrap();
        assert!(format!("{err:#}").contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn missing_key_source_fails_cleanly() {
        let err = NoAnalysis.fetch_analysis(DateKey::today()).await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(_)));
    }

    #[tokio::test]
    async fn settled_launch_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let runner = build_runner(&settings, store_for(&settings).unwrap(), false).unwrap();
        let date: DateKey = "2024-01-15".parse().unwrap();
        let outcome = follow(
            &runner,
            date,
            JobKind::Lottery,
            Launch::Settled(RunOutcome::AlreadyDone),
        )
        .await
        .unwrap();
        assert_eq!(outcome, RunOutcome::AlreadyDone);
    }

    #[test]
    fn failed_outcome_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let runner = build_runner(&settings, store_for(&settings).unwrap(), false).unwrap();
        let date: DateKey = "2024-01-15".parse().unwrap();
        let failed = RunOutcome::Failed("down".into());
        assert!(finish(&runner, date, JobKind::Lottery, &failed).is_err());
        assert!(finish(&runner, date, JobKind::Lottery, &RunOutcome::NotYetAvailable).is_ok());
    }

    #[test]
    fn export_then_import_into_fresh_store() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let date: DateKey = "2024-01-15".parse().unwrap();

        let src = store_for(&settings(src_dir.path())).unwrap();
        src.put_lottery(date, LotteryResult::new("07", vec!["07".into(), "23".into()]).unwrap())
            .unwrap();
        let file = out_dir.path().join("history.json");
        export(src.as_ref(), &file).unwrap();

        let dst = store_for(&settings(dst_dir.path())).unwrap();
        import(dst.as_ref(), &file, ImportMode::FillMissing).unwrap();
        assert_eq!(
            dst.get(date).unwrap().unwrap().lottery_result.unwrap().special_prize,
            "07"
        );
    }

    #[test]
    fn import_of_missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_for(&settings(dir.path())).unwrap();
        let err = import(store.as_ref(), &dir.path().join("nope.json"), ImportMode::default())
            .unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
