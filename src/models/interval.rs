//! Leveled interval table.
//!
//! Maps a mastery level to the time a card waits before it is due again:
//! - The table is an ordered list of non-decreasing, positive durations
//! - Level `n` uses entry `n`; levels past the end reuse the last (largest) entry
//! - Lookups never fail, so every non-negative level has a defined interval

use crate::error::ValidationError;
use chrono::Duration;

/// Default table in minutes: 1 min, 30 min, 1 h, 6 h, 1 d, 3 d, 7 d, 14 d, 30 d.
pub const DEFAULT_INTERVAL_MINUTES: [u64; 9] = [1, 30, 60, 360, 1440, 4320, 10080, 20160, 43200];

/// Longest interval a table or the ease-factor cap may hold: 100 years.
pub const MAX_INTERVAL_DAYS: i64 = 36_525;

pub fn max_interval() -> Duration {
    Duration::days(MAX_INTERVAL_DAYS)
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntervalPolicy {
    table: Vec<Duration>,
}

impl IntervalPolicy {
    /// Builds a policy from an explicit table.
    pub fn new(table: Vec<Duration>) -> Result<Self, ValidationError> {
        if table.is_empty() {
            return Err(ValidationError::EmptyIntervalTable);
        }
        for (level, interval) in table.iter().enumerate() {
            if *interval <= Duration::zero() {
                return Err(ValidationError::NonPositiveInterval(level));
            }
            if *interval > max_interval() {
                return Err(ValidationError::IntervalTooLong(level));
            }
            if level > 0 && *interval < table[level - 1] {
                return Err(ValidationError::DecreasingIntervals(level));
            }
        }
        Ok(Self { table })
    }

    /// Builds a policy from a table of whole minutes, as written in the config file.
    pub fn from_minutes(minutes: &[u64]) -> Result<Self, ValidationError> {
        let mut table = Vec::with_capacity(minutes.len());
        for (level, &m) in minutes.iter().enumerate() {
            let interval = i64::try_from(m)
                .ok()
                .and_then(Duration::try_minutes)
                .ok_or(ValidationError::IntervalTooLong(level))?;
            table.push(interval);
        }
        Self::new(table)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Highest index in the table.
    pub fn max_level(&self) -> u32 {
        (self.table.len() - 1) as u32
    }

    pub fn effective_level(&self, level: u32) -> u32 {
        level.min(self.max_level())
    }

    /// True when `level` is past the table and lookups are being clamped.
    pub fn is_exhausted(&self, level: u32) -> bool {
        level > self.max_level()
    }

    /// Interval for `level`, clamped to the last entry.
    pub fn interval_for(&self, level: u32) -> Duration {
        if self.is_exhausted(level) {
            tracing::debug!(level, max_level = self.max_level(), "interval table exhausted, clamping");
        }
        self.table[self.effective_level(level) as usize]
    }

    pub fn intervals(&self) -> &[Duration] {
        &self.table
    }
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            table: DEFAULT_INTERVAL_MINUTES
                .iter()
                .map(|&m| Duration::minutes(m as i64))
                .collect(),
        }
    }
}
