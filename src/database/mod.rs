//! Card persistence.
//!
//! The scheduler itself is pure; this module owns the read-modify-write cycle around it.
//! Every write is a compare-and-swap on the card's `version`, so a review always
//! transitions from the state that was actually persisted.

pub mod db;

pub use db::SqliteCardStore;

use crate::error::{StoreError, StoreResult};
use crate::models::{CardId, CardState, OwnerId, ReviewOutcome, Scheduler};
use chrono::{DateTime, Utc};

/// How many times a review is recomputed after losing a version race.
pub const MAX_REVIEW_ATTEMPTS: usize = 3;

pub trait CardStore {
    fn get(&self, card_id: CardId) -> StoreResult<CardState>;

    /// Replaces the stored state only if its version still equals `expected_version`.
    ///
    /// Returns the state as written, with its version bumped. A version mismatch is
    /// reported as [`StoreError::Conflict`] and nothing is written.
    fn compare_and_swap(
        &self,
        card_id: CardId,
        expected_version: u64,
        new_state: &CardState,
    ) -> StoreResult<CardState>;

    /// All cards of one user. Ownership filtering happens here, never in the scheduler.
    fn cards_for_owner(&self, owner: &OwnerId) -> StoreResult<Vec<CardState>>;
}

/// Applies one review to a stored card.
///
/// Reads the current state, schedules it and writes it back under a version check.
/// On a conflict the whole cycle is repeated from a fresh read. Validation errors are
/// returned immediately and leave the stored card untouched.
pub fn review_card<S: CardStore + ?Sized>(
    store: &S,
    scheduler: &Scheduler,
    card_id: CardId,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
) -> StoreResult<CardState> {
    let mut attempt = 1;
    loop {
        let current = store.get(card_id)?;
        let next = scheduler.schedule_review(&current, outcome, now)?;

        match store.compare_and_swap(card_id, current.version, &next) {
            Ok(saved) => {
                tracing::info!(
                    %card_id,
                    level = saved.level,
                    next_review_at = %saved.next_review_at,
                    "review recorded"
                );
                return Ok(saved);
            }
            Err(StoreError::Conflict { expected, .. }) if attempt < MAX_REVIEW_ATTEMPTS => {
                tracing::warn!(%card_id, expected, attempt, "version conflict, retrying review");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Flashcard, SchedulingPolicy};
    use std::cell::Cell;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn store_with_card() -> (SqliteCardStore, CardId) {
        let store = SqliteCardStore::open_in_memory(SchedulingPolicy::Leveled).unwrap();
        let owner = OwnerId::new("alice");
        let id = store
            .add_flashcard(&owner, "Polish", &Flashcard::new("cześć", "hello"), 2.5, t0())
            .unwrap();
        (store, id)
    }

    /// Lets another review land between our read and our write, once.
    struct RacingStore {
        inner: SqliteCardStore,
        raced: Cell<bool>,
    }

    impl CardStore for RacingStore {
        fn get(&self, card_id: CardId) -> StoreResult<CardState> {
            self.inner.get(card_id)
        }

        fn compare_and_swap(
            &self,
            card_id: CardId,
            expected_version: u64,
            new_state: &CardState,
        ) -> StoreResult<CardState> {
            if !self.raced.replace(true) {
                review_card(
                    &self.inner,
                    &Scheduler::default(),
                    card_id,
                    ReviewOutcome::Recalled(true),
                    t0(),
                )?;
            }
            self.inner.compare_and_swap(card_id, expected_version, new_state)
        }

        fn cards_for_owner(&self, owner: &OwnerId) -> StoreResult<Vec<CardState>> {
            self.inner.cards_for_owner(owner)
        }
    }

    #[test]
    fn test_review_persists_new_state() {
        let (store, id) = store_with_card();
        let saved = review_card(&store, &Scheduler::default(), id, ReviewOutcome::Recalled(true), t0())
            .unwrap();

        assert_eq!(saved.level, 1);
        assert_eq!(saved.version, 1);
        assert_eq!(store.get(id).unwrap(), saved);
    }

    #[test]
    fn test_invalid_review_writes_nothing() {
        let (store, id) = store_with_card();
        let before = store.get(id).unwrap();
        let outcome = ReviewOutcome::Graded(crate::models::Quality::new(4).unwrap());

        let err = review_card(&store, &Scheduler::default(), id, outcome, t0()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.get(id).unwrap(), before);
    }

    #[test]
    fn test_conflict_retries_from_persisted_state() {
        let (inner, id) = store_with_card();
        let store = RacingStore {
            inner,
            raced: Cell::new(false),
        };

        let saved = review_card(&store, &Scheduler::default(), id, ReviewOutcome::Recalled(true), t0())
            .unwrap();

        // Both the racing review and ours were applied, in order.
        assert_eq!(saved.level, 2);
        assert_eq!(saved.version, 2);
    }

    #[test]
    fn test_missing_card() {
        let (store, _) = store_with_card();
        let err = review_card(
            &store,
            &Scheduler::default(),
            CardId(999),
            ReviewOutcome::Recalled(true),
            t0(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(CardId(999))));
    }
}
