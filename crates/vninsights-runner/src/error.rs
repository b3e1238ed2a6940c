use std::time::Duration;

use thiserror::Error;
use vninsights_ai::AiError;
use vninsights_core::ValidationError;
use vninsights_store::StoreError;
use vninsights_xsmb::XsmbError;

/// Why a single upstream fetch produced nothing usable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("invalid upstream data: {0}")]
    Invalid(#[from] ValidationError),
}

impl From<AiError> for FetchError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Invalid(v) => Self::Invalid(v),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<XsmbError> for FetchError {
    fn from(e: XsmbError) -> Self {
        match e {
            XsmbError::Invalid(v) => Self::Invalid(v),
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// A job could not be carried out at all.
///
/// Upstream trouble is not a `RunError`: it ends the job as
/// [`RunOutcome::Failed`](crate::RunOutcome::Failed). Storage failures are.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("background job panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}
