//! TOML configuration.
//!
//! Every field has a default, so a missing file or a partial file is fine:
//!
//! ```toml
//! database_path = "db.sqlite3"
//! policy = "easeFactor"
//! intervals_minutes = [1, 30, 60, 360, 1440]
//!
//! [ease]
//! floor = 1.3
//! ```

use crate::error::{ConfigError, ValidationError};
use crate::models::interval::{DEFAULT_INTERVAL_MINUTES, MAX_INTERVAL_DAYS};
use crate::models::{EaseFactorParams, IntervalPolicy, Scheduler, SchedulingPolicy};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "VOCAB_TRAINER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "trainer.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub database_path: PathBuf,
    pub log_level: String,
    pub policy: SchedulingPolicy,
    pub intervals_minutes: Vec<u64>,
    /// Cards per study session.
    pub batch_size: usize,
    /// Level from which a card counts as retained in statistics.
    pub retained_level: u32,
    /// Use the persisted simulated date instead of the system clock.
    pub simulated_clock: bool,
    pub ease: EaseConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EaseConfig {
    pub default: f64,
    pub floor: f64,
    pub lapse_penalty: f64,
    pub maximum_interval_days: u32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("db.sqlite3"),
            log_level: "info".to_string(),
            policy: SchedulingPolicy::default(),
            intervals_minutes: DEFAULT_INTERVAL_MINUTES.to_vec(),
            batch_size: 20,
            retained_level: 4,
            simulated_clock: false,
            ease: EaseConfig::default(),
        }
    }
}

impl Default for EaseConfig {
    fn default() -> Self {
        let params = EaseFactorParams::default();
        Self {
            default: params.default,
            floor: params.floor,
            lapse_penalty: params.lapse_penalty,
            maximum_interval_days: params.maximum_interval.num_days() as u32,
        }
    }
}

impl EaseConfig {
    pub fn params(&self) -> Result<EaseFactorParams, ValidationError> {
        let invalid = |field: &'static str, reason: &'static str| ValidationError::InvalidSetting { field, reason };

        if !self.floor.is_finite() || self.floor <= 0.0 {
            return Err(invalid("ease.floor", "must be a positive number"));
        }
        if !self.default.is_finite() || self.default < self.floor {
            return Err(invalid("ease.default", "must not be below ease.floor"));
        }
        if !self.lapse_penalty.is_finite() || self.lapse_penalty < 0.0 {
            return Err(invalid("ease.lapse_penalty", "must not be negative"));
        }
        if self.maximum_interval_days == 0 {
            return Err(invalid("ease.maximum_interval_days", "must be at least one day"));
        }
        if i64::from(self.maximum_interval_days) > MAX_INTERVAL_DAYS {
            return Err(invalid("ease.maximum_interval_days", "must not exceed 100 years"));
        }

        Ok(EaseFactorParams {
            default: self.default,
            floor: self.floor,
            lapse_penalty: self.lapse_penalty,
            maximum_interval: Duration::days(self.maximum_interval_days as i64),
        })
    }
}

impl TrainerConfig {
    /// Path from `VOCAB_TRAINER_CONFIG`, falling back to `trainer.toml`.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads and validates the config at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), policy = %config.policy, "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.scheduler()?;
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidSetting {
                field: "batch_size",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    pub fn scheduler(&self) -> Result<Scheduler, ValidationError> {
        Ok(Scheduler::new(
            self.policy,
            IntervalPolicy::from_minutes(&self.intervals_minutes)?,
            self.ease.params()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler().unwrap(), Scheduler::default());
        assert_eq!(config.batch_size, 20);
    }

    #[test]
    fn test_partial_file() {
        let config = TrainerConfig::from_toml_str(
            r#"
            policy = "easeFactor"
            intervals_minutes = [5, 60, 1440]

            [ease]
            floor = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.policy, SchedulingPolicy::EaseFactor);
        assert_eq!(config.ease.floor, 1.5);
        assert_eq!(config.ease.default, 2.5);
        assert_eq!(config.database_path, PathBuf::from("db.sqlite3"));

        let scheduler = config.scheduler().unwrap();
        assert_eq!(scheduler.intervals().len(), 3);
        assert_eq!(scheduler.intervals().interval_for(7), Duration::days(1));
    }

    #[test]
    fn test_oversized_intervals_rejected() {
        let err = TrainerConfig::from_toml_str("intervals_minutes = [1, 100000000000000]").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ValidationError::IntervalTooLong(1))
        ));

        let err = TrainerConfig::from_toml_str("[ease]\nmaximum_interval_days = 4000000000").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ValidationError::InvalidSetting {
                field: "ease.maximum_interval_days",
                ..
            })
        ));
    }

    #[test]
    fn test_longest_allowed_interval_schedules() {
        use crate::models::{CardId, CardState, OwnerId, ReviewOutcome};
        use chrono::{DateTime, Utc};

        let config = TrainerConfig::from_toml_str("intervals_minutes = [1, 52596000]").unwrap();
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let card = CardState::new(CardId(1), OwnerId::new("alice"), 2.5, now);

        let next = config
            .scheduler()
            .unwrap()
            .schedule_review(&card, ReviewOutcome::Recalled(true), now)
            .unwrap();
        assert_eq!(next.next_review_at - now, Duration::days(36_525));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = TrainerConfig::from_toml_str(r#"policy = "sm17""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bad_table_rejected() {
        let err = TrainerConfig::from_toml_str("intervals_minutes = [60, 30]").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ValidationError::DecreasingIntervals(1))
        ));
    }

    #[test]
    fn test_default_below_floor_rejected() {
        let err = TrainerConfig::from_toml_str("[ease]\ndefault = 1.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ValidationError::InvalidSetting { field: "ease.default", .. })
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, TrainerConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainer.toml");
        std::fs::write(&path, "batch_size = 5\nsimulated_clock = true\n").unwrap();

        let config = TrainerConfig::load(&path).unwrap();
        assert_eq!(config.batch_size, 5);
        assert!(config.simulated_clock);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = TrainerConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(TrainerConfig::from_toml_str(&text).unwrap(), config);
    }
}
