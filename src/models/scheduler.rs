//! Review scheduling.
//!
//! A deployment runs exactly one of two policies:
//! - `Leveled`: a correct answer moves the card one level up the interval table,
//!   a wrong answer drops it back to level 0
//! - `EaseFactor`: SM-2 style. Each card has an ease factor adjusted by the 0-5 quality
//!   grade; intervals grow multiplicatively with the ease factor instead of following
//!   the table, and a lapse (grade < 3) restarts the card at level 0
//!
//! Scheduling never reads the clock; `now` is always supplied by the caller.

use super::{CardState, IntervalPolicy, Quality, ReviewOutcome};
use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchedulingPolicy {
    #[default]
    Leveled,
    EaseFactor,
}

impl SchedulingPolicy {
    pub fn name(self) -> &'static str {
        match self {
            SchedulingPolicy::Leveled => "leveled",
            SchedulingPolicy::EaseFactor => "easeFactor",
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchedulingPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leveled" => Ok(SchedulingPolicy::Leveled),
            "easeFactor" => Ok(SchedulingPolicy::EaseFactor),
            other => Err(ValidationError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Tuning for the ease-factor policy.
#[derive(Clone, Debug, PartialEq)]
pub struct EaseFactorParams {
    pub default: f64,
    pub floor: f64,
    /// Subtracted from the ease factor on a lapse.
    pub lapse_penalty: f64,
    pub maximum_interval: Duration,
}

impl Default for EaseFactorParams {
    fn default() -> Self {
        Self {
            default: 2.5,
            floor: 1.3,
            lapse_penalty: 0.2,
            maximum_interval: Duration::days(365),
        }
    }
}

/// Ease adjustment for a passing grade: +0.1 at 5, 0 at 4, -0.14 at 3.
fn ease_delta(quality: Quality) -> f64 {
    let miss = (Quality::MAX - quality.value()) as f64;
    0.1 - miss * (0.08 + miss * 0.02)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scheduler {
    policy: SchedulingPolicy,
    intervals: IntervalPolicy,
    ease: EaseFactorParams,
}

struct Transition {
    level: u32,
    repetitions: u32,
    ease_factor: f64,
    interval: Duration,
}

impl Scheduler {
    pub fn new(policy: SchedulingPolicy, intervals: IntervalPolicy, ease: EaseFactorParams) -> Self {
        Self {
            policy,
            intervals,
            ease,
        }
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    pub fn intervals(&self) -> &IntervalPolicy {
        &self.intervals
    }

    pub fn ease_params(&self) -> &EaseFactorParams {
        &self.ease
    }

    /// Computes the state a card moves to after a review at `now`.
    ///
    /// The input state is only read. On error nothing is produced, so callers never
    /// see a partially updated card.
    pub fn schedule_review(
        &self,
        state: &CardState,
        outcome: ReviewOutcome,
        now: DateTime<Utc>,
    ) -> Result<CardState, ValidationError> {
        state.validate(&self.ease)?;

        let transition = match (self.policy, outcome) {
            (SchedulingPolicy::Leveled, ReviewOutcome::Recalled(correct)) => {
                self.leveled(state, correct)
            }
            (SchedulingPolicy::EaseFactor, ReviewOutcome::Graded(quality)) => {
                self.ease_factor(state, quality)
            }
            (policy, outcome) => {
                return Err(ValidationError::OutcomeMismatch {
                    policy: policy.name(),
                    outcome: outcome.kind(),
                });
            }
        };

        let next_review_at = now
            .checked_add_signed(transition.interval)
            .ok_or(ValidationError::TimestampOutOfRange(now.timestamp_millis()))?;

        Ok(CardState {
            level: transition.level,
            repetitions: transition.repetitions,
            ease_factor: transition.ease_factor,
            last_interval: transition.interval,
            next_review_at,
            ..state.clone()
        })
    }

    /// Every outcome the active policy accepts, paired with the state it would produce.
    pub fn preview(
        &self,
        state: &CardState,
        now: DateTime<Utc>,
    ) -> Result<Vec<(ReviewOutcome, CardState)>, ValidationError> {
        let outcomes: Vec<ReviewOutcome> = match self.policy {
            SchedulingPolicy::Leveled => {
                vec![ReviewOutcome::Recalled(false), ReviewOutcome::Recalled(true)]
            }
            SchedulingPolicy::EaseFactor => (0..=Quality::MAX)
                .map(|q| Quality::new(q).map(ReviewOutcome::Graded))
                .collect::<Result<_, _>>()?,
        };

        outcomes
            .into_iter()
            .map(|outcome| Ok((outcome, self.schedule_review(state, outcome, now)?)))
            .collect()
    }

    fn leveled(&self, state: &CardState, correct: bool) -> Transition {
        let (level, repetitions) = if correct {
            (state.level.saturating_add(1), state.repetitions.saturating_add(1))
        } else {
            (0, 0)
        };

        Transition {
            level,
            repetitions,
            ease_factor: state.ease_factor,
            interval: self.intervals.interval_for(level),
        }
    }

    fn ease_factor(&self, state: &CardState, quality: Quality) -> Transition {
        if quality.is_lapse() {
            return Transition {
                level: 0,
                repetitions: 0,
                ease_factor: (state.ease_factor - self.ease.lapse_penalty).max(self.ease.floor),
                interval: self.intervals.interval_for(0),
            };
        }

        let repetitions = state.repetitions.saturating_add(1);
        let ease_factor = (state.ease_factor + ease_delta(quality)).max(self.ease.floor);

        // First success uses the level-1 table entry; each later one multiplies by the ease.
        let base_ms = self.intervals.interval_for(1).num_milliseconds() as f64;
        let exponent = (repetitions - 1).min(i32::MAX as u32) as i32;
        let max_ms = self.ease.maximum_interval.num_milliseconds() as f64;
        let interval_ms = (base_ms * ease_factor.powi(exponent)).min(max_ms).round();

        Transition {
            level: state.level.saturating_add(1),
            repetitions,
            ease_factor,
            interval: Duration::milliseconds(interval_ms as i64),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(
            SchedulingPolicy::default(),
            IntervalPolicy::default(),
            EaseFactorParams::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardId, OwnerId};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn card(level: u32) -> CardState {
        let mut state = CardState::new(CardId(1), OwnerId::new("alice"), 2.5, t0());
        state.level = level;
        state
    }

    fn ease_scheduler() -> Scheduler {
        Scheduler::new(
            SchedulingPolicy::EaseFactor,
            IntervalPolicy::default(),
            EaseFactorParams::default(),
        )
    }

    fn graded(q: u8) -> ReviewOutcome {
        ReviewOutcome::Graded(Quality::new(q).unwrap())
    }

    #[test]
    fn test_correct_from_level_zero() {
        let next = Scheduler::default()
            .schedule_review(&card(0), ReviewOutcome::Recalled(true), t0())
            .unwrap();

        assert_eq!(next.level, 1);
        assert_eq!(next.next_review_at, t0() + Duration::minutes(30));
        assert_eq!(next.last_interval, Duration::minutes(30));
    }

    #[test]
    fn test_wrong_resets_level() {
        let next = Scheduler::default()
            .schedule_review(&card(3), ReviewOutcome::Recalled(false), t0())
            .unwrap();

        assert_eq!(next.level, 0);
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.next_review_at, t0() + Duration::minutes(1));
    }

    #[test]
    fn test_level_past_table_clamps() {
        let next = Scheduler::default()
            .schedule_review(&card(9), ReviewOutcome::Recalled(true), t0())
            .unwrap();

        assert_eq!(next.level, 10);
        assert_eq!(next.last_interval, Duration::days(30));
    }

    #[test]
    fn test_leveled_keeps_ease_and_version() {
        let mut state = card(2);
        state.version = 4;
        let next = Scheduler::default()
            .schedule_review(&state, ReviewOutcome::Recalled(true), t0())
            .unwrap();

        assert_eq!(next.ease_factor, 2.5);
        assert_eq!(next.version, 4);
        assert_eq!(next.card_id, state.card_id);
    }

    #[test]
    fn test_deterministic() {
        let scheduler = ease_scheduler();
        let state = card(2);
        let a = scheduler.schedule_review(&state, graded(4), t0()).unwrap();
        let b = scheduler.schedule_review(&state, graded(4), t0()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_outcome_mismatch() {
        let err = Scheduler::default()
            .schedule_review(&card(0), graded(5), t0())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutcomeMismatch {
                policy: "leveled",
                outcome: "graded"
            }
        );

        assert!(matches!(
            ease_scheduler().schedule_review(&card(0), ReviewOutcome::Recalled(true), t0()),
            Err(ValidationError::OutcomeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_ease_below_floor() {
        let mut state = card(0);
        state.ease_factor = 1.0;
        assert!(matches!(
            ease_scheduler().schedule_review(&state, graded(4), t0()),
            Err(ValidationError::EaseFactorBelowFloor { .. })
        ));
    }

    #[test]
    fn test_ease_first_and_second_success() {
        let scheduler = ease_scheduler();
        let first = scheduler.schedule_review(&card(0), graded(4), t0()).unwrap();
        assert_eq!(first.repetitions, 1);
        assert_eq!(first.level, 1);
        assert_eq!(first.last_interval, Duration::minutes(30));

        let second = scheduler.schedule_review(&first, graded(4), t0()).unwrap();
        assert_eq!(second.repetitions, 2);
        // 30 min * 2.5
        assert_eq!(second.last_interval, Duration::minutes(75));
    }

    #[test]
    fn test_ease_adjustment_by_quality() {
        let scheduler = ease_scheduler();
        let hard = scheduler.schedule_review(&card(0), graded(3), t0()).unwrap();
        let good = scheduler.schedule_review(&card(0), graded(4), t0()).unwrap();
        let easy = scheduler.schedule_review(&card(0), graded(5), t0()).unwrap();

        assert!((hard.ease_factor - 2.36).abs() < 1e-9);
        assert!((good.ease_factor - 2.5).abs() < 1e-9);
        assert!((easy.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_ease_lapse_resets() {
        let mut state = card(5);
        state.repetitions = 5;
        let next = ease_scheduler().schedule_review(&state, graded(1), t0()).unwrap();

        assert_eq!(next.repetitions, 0);
        assert_eq!(next.level, 0);
        assert!((next.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(next.last_interval, Duration::minutes(1));
    }

    #[test]
    fn test_ease_floor_after_many_lapses() {
        let scheduler = ease_scheduler();
        let mut state = card(0);
        for _ in 0..20 {
            state = scheduler.schedule_review(&state, graded(0), t0()).unwrap();
        }
        assert_eq!(state.ease_factor, 1.3);
    }

    #[test]
    fn test_ease_interval_capped() {
        let mut state = card(0);
        state.repetitions = 500;
        let next = ease_scheduler().schedule_review(&state, graded(5), t0()).unwrap();
        assert_eq!(next.last_interval, Duration::days(365));
    }

    #[test]
    fn test_preview_lists_policy_outcomes() {
        assert_eq!(Scheduler::default().preview(&card(0), t0()).unwrap().len(), 2);

        let preview = ease_scheduler().preview(&card(0), t0()).unwrap();
        assert_eq!(preview.len(), 6);
        assert!(preview[0].1.repetitions == 0 && preview[5].1.repetitions == 1);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!("leveled".parse::<SchedulingPolicy>(), Ok(SchedulingPolicy::Leveled));
        assert_eq!("easeFactor".parse::<SchedulingPolicy>(), Ok(SchedulingPolicy::EaseFactor));
        assert!("sm2".parse::<SchedulingPolicy>().is_err());
        assert_eq!(
            serde_json::to_string(&SchedulingPolicy::EaseFactor).unwrap(),
            "\"easeFactor\""
        );
    }
}
