//! Orchestration: runs the daily analysis and lottery jobs against the store,
//! with bounded retry, per-attempt timeouts and job status tracking.

mod error;
mod retry;
mod runner;
mod sources;

pub use error::{FetchError, RunError};
pub use retry::RetryPolicy;
pub use runner::{BackfillReport, DayStatus, Launch, RunMode, RunOutcome, Runner, RunnerConfig};
pub use sources::{AnalysisSource, LotterySource};
