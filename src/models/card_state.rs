//! Scheduling state for one card. Replaced wholesale by the scheduler after each review.
use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::EaseFactorParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub i64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub card_id: CardId,
    pub owner_id: OwnerId,
    pub level: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    /// Interval applied by the most recent review. Display only.
    #[serde(with = "duration_ms")]
    pub last_interval: Duration,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub next_review_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every accepted write.
    pub version: u64,
}

/// Unchecked column values as they come out of storage.
#[derive(Clone, Debug)]
pub struct RawCardState {
    pub card_id: i64,
    pub owner_id: String,
    pub level: i64,
    pub ease_factor: f64,
    pub repetitions: i64,
    pub last_interval_ms: i64,
    pub next_review_at_ms: i64,
    pub version: i64,
}

impl CardState {
    /// A freshly created card: level 0, no repetitions, due immediately.
    pub fn new(card_id: CardId, owner_id: OwnerId, ease_factor: f64, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            owner_id,
            level: 0,
            ease_factor,
            repetitions: 0,
            last_interval: Duration::zero(),
            next_review_at: now,
            version: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }

    /// How long the card has been waiting; negative when it is not due yet.
    pub fn overdue_by(&self, now: DateTime<Utc>) -> Duration {
        now - self.next_review_at
    }

    pub fn validate(&self, params: &EaseFactorParams) -> Result<(), ValidationError> {
        if !self.ease_factor.is_finite() {
            return Err(ValidationError::NonFiniteEaseFactor);
        }
        if self.ease_factor < params.floor {
            return Err(ValidationError::EaseFactorBelowFloor {
                value: self.ease_factor,
                floor: params.floor,
            });
        }
        if self.last_interval < Duration::zero() {
            return Err(ValidationError::NegativeInterval(
                self.last_interval.num_milliseconds(),
            ));
        }
        Ok(())
    }

    pub fn from_raw(raw: RawCardState) -> Result<Self, ValidationError> {
        let level = u32::try_from(raw.level).map_err(|_| ValidationError::NegativeLevel(raw.level))?;
        let repetitions = u32::try_from(raw.repetitions)
            .map_err(|_| ValidationError::NegativeRepetitions(raw.repetitions))?;
        let version = u64::try_from(raw.version).map_err(|_| ValidationError::NegativeVersion(raw.version))?;
        if raw.last_interval_ms < 0 {
            return Err(ValidationError::NegativeInterval(raw.last_interval_ms));
        }
        let last_interval = Duration::try_milliseconds(raw.last_interval_ms)
            .ok_or(ValidationError::NegativeInterval(raw.last_interval_ms))?;
        let next_review_at = DateTime::from_timestamp_millis(raw.next_review_at_ms)
            .ok_or(ValidationError::TimestampOutOfRange(raw.next_review_at_ms))?;
        if !raw.ease_factor.is_finite() {
            return Err(ValidationError::NonFiniteEaseFactor);
        }

        Ok(Self {
            card_id: CardId(raw.card_id),
            owner_id: OwnerId(raw.owner_id),
            level,
            ease_factor: raw.ease_factor,
            repetitions,
            last_interval,
            next_review_at,
            version,
        })
    }
}

mod duration_ms {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = i64::deserialize(d)?;
        Duration::try_milliseconds(ms).ok_or_else(|| D::Error::custom("interval out of range"))
    }
}
