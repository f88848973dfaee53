//! Error types shared by the scheduler, the card store and configuration loading.

use crate::models::CardId;
use thiserror::Error;

/// Malformed input rejected before any state is computed or written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("quality {0} is outside 0..=5")]
    QualityOutOfRange(u8),

    #[error("level {0} is negative")]
    NegativeLevel(i64),

    #[error("repetition count {0} is negative")]
    NegativeRepetitions(i64),

    #[error("interval of {0} ms is negative")]
    NegativeInterval(i64),

    #[error("version {0} is negative")]
    NegativeVersion(i64),

    #[error("timestamp {0} ms is out of range")]
    TimestampOutOfRange(i64),

    #[error("ease factor is not a finite number")]
    NonFiniteEaseFactor,

    #[error("ease factor {value} is below the floor {floor}")]
    EaseFactorBelowFloor { value: f64, floor: f64 },

    #[error("{outcome} outcome cannot be scheduled under the {policy} policy")]
    OutcomeMismatch {
        policy: &'static str,
        outcome: &'static str,
    },

    #[error("interval table is empty")]
    EmptyIntervalTable,

    #[error("interval at level {0} is not positive")]
    NonPositiveInterval(usize),

    #[error("interval at level {0} is longer than the 100 year limit")]
    IntervalTooLong(usize),

    #[error("interval at level {0} is shorter than the one before it")]
    DecreasingIntervals(usize),

    #[error("unknown scheduling policy '{0}'")]
    UnknownPolicy(String),

    #[error("{field}: {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: &'static str,
    },
}

/// Failures surfaced by a [`crate::database::CardStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid card state: {0}")]
    Validation(#[from] ValidationError),

    #[error("card {0} not found")]
    NotFound(CardId),

    #[error("card {card_id} was modified concurrently (expected version {expected})")]
    Conflict { card_id: CardId, expected: u64 },

    #[error("store was created for the {stored} policy, not {requested}")]
    PolicyMismatch { stored: String, requested: String },

    #[error("stored {key} value '{value}' is not valid")]
    CorruptAppState { key: &'static str, value: String },

    #[error("connection lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures while reading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}
