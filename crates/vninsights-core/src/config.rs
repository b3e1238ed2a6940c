//! Shared runtime configuration.
//!
//! [`Settings::default`] holds the production defaults; the CLI overrides
//! individual fields from flags and environment variables.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_XSMB_BASE_URL: &str = "https://v0-next-js-app-for-xoso.vercel.app";

/// Which persistence backend holds the daily records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// JSON files under the data directory.
    #[default]
    File,
    /// Embedded DuckDB database file under the data directory.
    DuckDb,
    /// Process memory only.
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::DuckDb => "duckdb",
            Self::Memory => "memory",
        })
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "duckdb" | "duck" => Ok(Self::DuckDb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!(
                "unknown store backend {other:?} (expected file, duckdb or memory)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub backend: StoreBackend,
    pub gemini: GeminiSettings,
    pub xsmb_base_url: String,
    /// Per-attempt limit for the analysis call.
    pub analysis_timeout: Duration,
    /// Per-attempt limit for the lottery call.
    pub lottery_timeout: Duration,
    pub retry_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub retry_base_delay: Duration,
    /// Vietnam wall-clock time after which today's draw is expected online.
    pub lottery_ready_after: NaiveTime,
    /// Pause between upstream calls during backfill.
    pub backfill_pause: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backend: StoreBackend::default(),
            gemini: GeminiSettings::default(),
            xsmb_base_url: DEFAULT_XSMB_BASE_URL.to_string(),
            analysis_timeout: Duration::from_secs(90),
            lottery_timeout: Duration::from_secs(60),
            retry_attempts: 3,
            retry_base_delay: Duration::from_secs(2),
            lottery_ready_after: NaiveTime::from_hms_opt(18, 35, 0).unwrap_or(NaiveTime::MIN),
            backfill_pause: Duration::from_secs(2),
        }
    }
}

/// Parse a wall-clock time given as `HH:MM`.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| format!("invalid time {s:?}: {e}"))
}
