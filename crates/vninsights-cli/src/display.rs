//! Plain-text rendering for terminal output.
//!
//! Every renderer returns a `String` so the layout can be checked in tests;
//! the commands print it.

use chrono::Utc;
use vninsights_core::{
    DailyRecord, DateKey, History, Hit, JobStatusEntry, LotteryResult, NumberPick, hit_rate,
    reconcile, top_number_frequency,
};
use vninsights_runner::{BackfillReport, DayStatus};
use vninsights_store::ImportSummary;
use vninsights_xsmb::{DrawData, PRIZE_TIERS};

const MAX_LIST_ITEMS: usize = 10;
const MAX_BAR: u32 = 40;

fn field(label: &str, value: impl std::fmt::Display) -> String {
    format!("  {label:<26} {value}")
}

fn hit_marker(number: &str, lottery: Option<&LotteryResult>) -> String {
    match lottery.map(|result| Hit::check(number, result)) {
        Some(Hit::Miss) => "  ·".to_string(),
        Some(hit) => format!("  [{}]", hit.label()),
        None => String::new(),
    }
}

fn pick_line(pick: &NumberPick, lottery: Option<&LotteryResult>) -> String {
    let mut detail = pick.kind.clone();
    if !pick.probability.is_empty() {
        if !detail.is_empty() {
            detail.push_str(" · ");
        }
        detail.push_str(&pick.probability);
    }
    field(&pick.number, format!("{detail}{}", hit_marker(&pick.number, lottery)))
}

/// One day's record as a sectioned card.
pub fn record_card(date: DateKey, record: &DailyRecord) -> String {
    let mut lines = vec![format!("=== {} ({date}) ===", date.display_vi()), String::new()];
    let lottery = record.lottery_result.as_ref();

    match &record.analysis {
        Some(analysis) => {
            lines.push("Summary".into());
            lines.push(format!("  {}", analysis.summary));
            lines.push(String::new());

            lines.push("Best number".into());
            lines.push(pick_line(&analysis.best_number, lottery));
            if !analysis.best_number.reasoning.is_empty() {
                lines.push(format!("    {}", analysis.best_number.reasoning));
            }
            lines.push(String::new());

            lines.push(format!("Lucky numbers ({})", analysis.lucky_numbers.len()));
            for pick in &analysis.lucky_numbers {
                lines.push(pick_line(pick, lottery));
            }
            lines.push(String::new());

            if !analysis.top_numbers.is_empty() {
                lines.push("Top numbers in the news".into());
                for top in analysis.top_numbers.iter().take(MAX_LIST_ITEMS) {
                    lines.push(field(&top.number, format!("x{}  {}", top.count, top.reason)));
                }
                lines.push(String::new());
            }

            if !analysis.events.is_empty() {
                lines.push(format!("Events ({})", analysis.events.len()));
                for event in analysis.events.iter().take(MAX_LIST_ITEMS) {
                    lines.push(format!("  - {}", event.title));
                    if !event.description.is_empty() {
                        lines.push(format!("      {}", event.description));
                    }
                }
                if analysis.events.len() > MAX_LIST_ITEMS {
                    let more = analysis.events.len() - MAX_LIST_ITEMS;
                    lines.push(format!("    ... and {more} more"));
                }
                lines.push(String::new());
            }

            let sources = record.grounding_chunks.as_deref().unwrap_or_default();
            if !sources.is_empty() {
                lines.push(format!("Sources ({})", sources.len()));
                for chunk in sources.iter().take(MAX_LIST_ITEMS) {
                    lines.push(field(&chunk.web.title, &chunk.web.uri));
                }
                lines.push(String::new());
            }
        }
        None => {
            lines.push("Analysis".into());
            lines.push("  (not yet analysed)".into());
            lines.push(String::new());
        }
    }

    lines.push("Lottery".into());
    match lottery {
        Some(result) => {
            lines.push(field("special prize", &result.special_prize));
            lines.push(field("tails", result.all_prizes.join(" ")));
        }
        None => lines.push("  (no draw result yet)".into()),
    }

    if let Some(stats) = reconcile(record) {
        lines.push(String::new());
        lines.push("Result".into());
        lines.push(field("đề hits", stats.de));
        lines.push(field("lô hits", stats.lo));
    }

    lines.join("\n")
}

/// One line per day, newest first.
pub fn history_lines(history: &History, limit: usize) -> String {
    if history.is_empty() {
        return "No records stored yet.".to_string();
    }
    history
        .iter()
        .rev()
        .take(limit)
        .map(|(date, record)| history_line(*date, record))
        .collect::<Vec<_>>()
        .join("\n")
}

fn history_line(date: DateKey, record: &DailyRecord) -> String {
    let picks = match &record.analysis {
        Some(analysis) => {
            let lucky: Vec<&str> = analysis
                .lucky_numbers
                .iter()
                .map(|pick| pick.number.as_str())
                .collect();
            format!("best {}  lucky {}", analysis.best_number.number, lucky.join(" "))
        }
        None => "no analysis".to_string(),
    };
    let draw = match &record.lottery_result {
        Some(result) => format!("ĐB {}", result.special_prize),
        None => "ĐB --".to_string(),
    };
    let outcome = match reconcile(record) {
        Some(stats) => format!("đề {} lô {}", stats.de, stats.lo),
        None => "pending".to_string(),
    };
    format!("{date}  {picks:<36} {draw:<6}  {outcome}")
}

/// Top-number frequency over the window ending `today`, plus the overall hit rate.
pub fn stats_report(history: &History, days: u32, today: DateKey) -> String {
    let mut lines = vec![format!("Top numbers, last {days} days")];

    let mut freq: Vec<(String, u32)> = top_number_frequency(history, days, today)
        .into_iter()
        .collect();
    freq.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if freq.is_empty() {
        lines.push("  (no analyses in this window)".into());
    }
    for (number, count) in freq.iter().take(MAX_LIST_ITEMS) {
        let bar = "█".repeat((*count).min(MAX_BAR) as usize);
        lines.push(format!("  {number}  {bar} {count}"));
    }

    let rate = hit_rate(history);
    lines.push(String::new());
    lines.push("Hit rate (all complete days)".into());
    lines.push(field("days reconciled", rate.days));
    lines.push(field(
        "winning days",
        format!("{} ({:.0}%)", rate.winning_days, rate.winning_ratio() * 100.0),
    ));
    lines.push(field("đề hits", rate.de));
    lines.push(field("lô hits", rate.lo));
    lines.join("\n")
}

/// The full prize table of one draw, tiers in draw order.
pub fn prize_table(label: &str, data: &DrawData) -> String {
    let mut lines = vec![format!("=== XSMB {label} ===")];
    for (key, name) in PRIZE_TIERS {
        let numbers = data.tier(key);
        if numbers.is_empty() {
            continue;
        }
        lines.push(field(name, numbers.join("  ")));
    }
    lines.join("\n")
}

fn job_line(kind: &str, entry: &JobStatusEntry) -> String {
    let mut value = entry.status.to_string();
    if let Some(start) = entry.start_time {
        let end = entry.end_time.unwrap_or_else(Utc::now);
        value.push_str(&format!(" ({}s)", (end - start).num_seconds().max(0)));
    }
    if let Some(error) = &entry.error {
        value.push_str(&format!(": {error}"));
    }
    field(kind, value)
}

/// Tracker state and stored halves for one day.
pub fn status_report(status: &DayStatus, draw_published: bool) -> String {
    let record = status.record.as_ref();
    let stored = |present: bool| if present { "stored" } else { "missing" };
    let lines = [
        format!("=== {} ===", status.date),
        job_line("analysis job", &status.analysis),
        job_line("lottery job", &status.lottery),
        field(
            "analysis",
            stored(record.is_some_and(|r| r.analysis.is_some())),
        ),
        field(
            "lottery result",
            stored(record.is_some_and(|r| r.lottery_result.is_some())),
        ),
        field("draw published", if draw_published { "yes" } else { "not yet" }),
    ];
    lines.join("\n")
}

pub fn backfill_summary(report: &BackfillReport) -> String {
    let mut lines = vec![
        field("filled", report.filled.len()),
        field("already stored", report.already_present.len()),
        field("not available", report.unavailable.len()),
        field("failed", report.failed.len()),
    ];
    for (date, reason) in &report.failed {
        lines.push(format!("    {date}: {reason}"));
    }
    lines.join("\n")
}

pub fn import_summary(summary: &ImportSummary) -> String {
    let mut lines = vec![
        field("analyses written", summary.analyses_written),
        field("lottery results written", summary.lotteries_written),
        field("skipped (already stored)", summary.skipped),
        field("rejected", summary.rejected.len()),
    ];
    for (date, reason) in &summary.rejected {
        lines.push(format!("    {date}: {reason}"));
    }
    lines.join("\n")
}
