pub mod analysis;
pub mod config;
pub mod date_key;
pub mod error;
pub mod frequency;
pub mod jobs;
pub mod lottery;
pub mod number;
pub mod reconcile;
pub mod record;

pub use analysis::{
    AnalysisPayload, AnalysisResult, EventSource, GroundingChunk, NumberPick, TopNumber, WebSource,
};
pub use config::{GeminiSettings, Settings, StoreBackend};
pub use date_key::{DateKey, vietnam_time};
pub use error::{ParseDateKeyError, ValidationError};
pub use frequency::{HitRate, hit_rate, top_number_frequency};
pub use jobs::{JobKind, JobStatus, JobStatusEntry, JobTracker};
pub use lottery::{LotteryResult, draw_published};
pub use reconcile::{Hit, WinStats, reconcile};
pub use record::{DailyRecord, History};
