//! Command-line surface. Every setting falls back to an environment variable
//! (a `.env` file is loaded first), then to the built-in default.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand};
use vninsights_core::config::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_XSMB_BASE_URL, parse_clock_time,
};
use vninsights_core::{DateKey, GeminiSettings, Settings, StoreBackend};

#[derive(Parser, Debug)]
#[command(
    name = "vninsights",
    version,
    about = "Daily Vietnamese news numbers, checked against the XSMB draw"
)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Directory holding the stored records.
    #[arg(long, global = true, env = "VNINSIGHTS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Storage backend: file, duckdb or memory.
    #[arg(long, global = true, env = "VNINSIGHTS_BACKEND", default_value = "file")]
    pub backend: StoreBackend,

    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, global = true, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    #[arg(long, global = true, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    pub gemini_url: String,

    #[arg(long, global = true, env = "XSMB_API_URL", default_value = DEFAULT_XSMB_BASE_URL)]
    pub xsmb_url: String,

    /// Per-attempt limit for the analysis call, in seconds.
    #[arg(long, global = true, default_value_t = 90)]
    pub analysis_timeout_secs: u64,

    /// Per-attempt limit for the lottery call, in seconds.
    #[arg(long, global = true, default_value_t = 60)]
    pub lottery_timeout_secs: u64,

    /// Attempts per upstream call, including the first.
    #[arg(long, global = true, default_value_t = 3)]
    pub retries: u32,

    /// Vietnam time (HH:MM) after which today's draw is looked up.
    #[arg(long, global = true, default_value = "18:35", value_parser = parse_clock_time)]
    pub lottery_ready_after: NaiveTime,
}

impl ConfigArgs {
    pub fn settings(&self) -> Settings {
        Settings {
            data_dir: self.data_dir.clone(),
            backend: self.backend,
            gemini: GeminiSettings {
                api_key: self.gemini_api_key.clone(),
                model: self.gemini_model.clone(),
                base_url: self.gemini_url.clone(),
            },
            xsmb_base_url: self.xsmb_url.clone(),
            analysis_timeout: Duration::from_secs(self.analysis_timeout_secs),
            lottery_timeout: Duration::from_secs(self.lottery_timeout_secs),
            retry_attempts: self.retries,
            lottery_ready_after: self.lottery_ready_after,
            ..Settings::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse today's news and store the suggested numbers.
    Analyze {
        /// Replace an analysis that is already stored.
        #[arg(long)]
        force: bool,
        /// Store under this day instead of today (YYYY-MM-DD or DD-MM-YYYY).
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Fetch and store the XSMB result for a day.
    Lottery {
        /// Refetch a result that is already stored.
        #[arg(long)]
        force: bool,
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Job and storage status for a day.
    Status {
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Show one day's record with hit markers.
    Show { date: Option<DateKey> },
    /// One line per stored day, newest first.
    History {
        #[arg(long, default_value_t = 14)]
        limit: usize,
    },
    /// Top-number frequency and overall hit rate.
    Stats {
        /// Window size in days, ending today.
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Print the raw XSMB prize table for a day or a range.
    Results {
        #[arg(conflicts_with = "start")]
        date: Option<DateKey>,
        #[arg(long, requires = "end")]
        start: Option<DateKey>,
        #[arg(long, requires = "start")]
        end: Option<DateKey>,
    },
    /// Fill in missing lottery results for past days.
    Backfill {
        #[arg(long, default_value_t = 14)]
        days: u32,
    },
    /// Write the whole history to a JSON file.
    Export { path: PathBuf },
    /// Merge a history JSON file into the store.
    Import {
        path: PathBuf,
        /// Replace halves that are already stored.
        #[arg(long)]
        overwrite: bool,
    },
}
