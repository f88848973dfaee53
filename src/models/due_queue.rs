//! Due-card selection and collection statistics.
//!
//! Selection is a read-only query over a user's cards: only cards whose
//! `next_review_at` has passed are returned, most overdue first. Cards are never
//! modified here.

use super::CardState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cards due at `now`, most overdue first, optionally capped at `limit`.
///
/// Ties on overdue time are broken by card id so the same input always yields the
/// same prefix.
pub fn select_due(cards: &[CardState], now: DateTime<Utc>, limit: Option<usize>) -> Vec<&CardState> {
    let mut due: Vec<&CardState> = cards.iter().filter(|card| card.is_due(now)).collect();

    due.sort_by(|a, b| {
        a.next_review_at
            .cmp(&b.next_review_at)
            .then_with(|| a.card_id.cmp(&b.card_id))
    });

    if let Some(limit) = limit {
        due.truncate(limit);
    }
    due
}

/// Earliest review time still in the future, for "nothing due until ..." messages.
pub fn next_due_at(cards: &[CardState], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    cards
        .iter()
        .filter(|card| !card.is_due(now))
        .map(|card| card.next_review_at)
        .min()
}

/// Coarse progress bucket for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CardStage {
    /// Never answered correctly.
    New,
    /// Short intervals, below the retained level.
    Learning,
    Retained,
}

impl CardStage {
    pub fn of(card: &CardState, retained_level: u32) -> Self {
        if card.level >= retained_level {
            CardStage::Retained
        } else if card.level == 0 && card.repetitions == 0 {
            CardStage::New
        } else {
            CardStage::Learning
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub total: usize,
    pub due: usize,
    pub new: usize,
    pub learning: usize,
    pub retained: usize,
}

impl ReviewStats {
    pub fn collect(cards: &[CardState], now: DateTime<Utc>, retained_level: u32) -> Self {
        let mut stats = ReviewStats {
            total: cards.len(),
            ..Default::default()
        };

        for card in cards {
            if card.is_due(now) {
                stats.due += 1;
            }
            match CardStage::of(card, retained_level) {
                CardStage::New => stats.new += 1,
                CardStage::Learning => stats.learning += 1,
                CardStage::Retained => stats.retained += 1,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardId, OwnerId};
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn card(id: i64, next_review_at: DateTime<Utc>) -> CardState {
        CardState::new(CardId(id), OwnerId::new("alice"), 2.5, next_review_at)
    }

    #[test]
    fn test_most_overdue_first() {
        let cards = vec![
            card(1, t0() - Duration::hours(5)),
            card(2, t0() - Duration::hours(1)),
            card(3, t0() + Duration::hours(1)),
        ];

        let due = select_due(&cards, t0(), Some(10));
        let ids: Vec<i64> = due.iter().map(|c| c.card_id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let cards = vec![
            card(3, t0() - Duration::minutes(1)),
            card(1, t0() - Duration::days(2)),
            card(2, t0()),
        ];

        let ids: Vec<i64> = select_due(&cards, t0(), None)
            .iter()
            .map(|c| c.card_id.0)
            .collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_due_exactly_now_is_included() {
        let cards = vec![card(1, t0())];
        assert_eq!(select_due(&cards, t0(), None).len(), 1);
    }

    #[test]
    fn test_limit_keeps_most_overdue() {
        let cards: Vec<CardState> = (0..10)
            .map(|i| card(i, t0() - Duration::minutes(i)))
            .collect();

        let ids: Vec<i64> = select_due(&cards, t0(), Some(3))
            .iter()
            .map(|c| c.card_id.0)
            .collect();
        assert_eq!(ids, vec![9, 8, 7]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let when = t0() - Duration::hours(1);
        let cards = vec![card(5, when), card(2, when), card(9, when)];

        let ids: Vec<i64> = select_due(&cards, t0(), None)
            .iter()
            .map(|c| c.card_id.0)
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_nothing_due_is_empty() {
        let cards = vec![card(1, t0() + Duration::minutes(5))];
        assert!(select_due(&cards, t0(), None).is_empty());
        assert!(select_due(&[], t0(), Some(5)).is_empty());
        assert_eq!(next_due_at(&cards, t0()), Some(t0() + Duration::minutes(5)));
    }

    #[test]
    fn test_zero_limit() {
        let cards = vec![card(1, t0())];
        assert!(select_due(&cards, t0(), Some(0)).is_empty());
    }

    #[test]
    fn test_stats() {
        let mut learning = card(2, t0() + Duration::hours(1));
        learning.level = 2;
        learning.repetitions = 2;
        let mut retained = card(3, t0() + Duration::days(3));
        retained.level = 5;

        let cards = vec![card(1, t0()), learning, retained];
        let stats = ReviewStats::collect(&cards, t0(), 4);

        assert_eq!(
            stats,
            ReviewStats {
                total: 3,
                due: 1,
                new: 1,
                learning: 1,
                retained: 1,
            }
        );
    }
}
