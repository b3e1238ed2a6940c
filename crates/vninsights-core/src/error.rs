use thiserror::Error;

/// A payload that must not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("special prize must be exactly two digits, got {0:?}")]
    SpecialPrize(String),

    #[error("prize entry must be exactly two digits, got {0:?}")]
    PrizeEntry(String),

    #[error("best number must be exactly two digits, got {0:?}")]
    BestNumber(String),

    #[error("lucky number must be exactly two digits, got {0:?}")]
    LuckyNumber(String),

    #[error("analysis has no lucky numbers")]
    NoLuckyNumbers,

    #[error("analysis summary is empty")]
    EmptySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date key {input:?}: expected YYYY-MM-DD or DD-MM-YYYY")]
pub struct ParseDateKeyError {
    pub input: String,
}
