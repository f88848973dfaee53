//! Learning session management for spaced repetition practice.
//! Handles multi-round review of a deck's due cards, persisting every grade through the card store.

use super::{CardId, CardState, LearningCard, ReviewOutcome, Scheduler, StudyCard, select_due};
use crate::database::{CardStore, review_card};
use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Manages a learning session with multiple review rounds.
/// Cards that lapse are repeated in subsequent rounds until every card is recalled.
pub struct LearningSession<'a, S: CardStore + ?Sized> {
    pub deck_name: String,
    pub all_cards: Vec<LearningCard>,
    pub current_round_cards: Vec<usize>,
    pub current_index: usize,
    pub show_definition: bool,
    pub round_number: usize,
    store: &'a S,
    scheduler: &'a Scheduler,
}

impl<'a, S: CardStore + ?Sized> LearningSession<'a, S> {
    /// Creates a session over cards already picked for study, in the order given.
    pub fn new_from_due_cards(
        deck_name: String,
        cards: Vec<StudyCard>,
        store: &'a S,
        scheduler: &'a Scheduler,
    ) -> Self {
        let all_cards: Vec<LearningCard> = cards.into_iter().map(LearningCard::new).collect();
        let indices: Vec<usize> = (0..all_cards.len()).collect();

        Self {
            deck_name,
            all_cards,
            current_round_cards: indices,
            current_index: 0,
            show_definition: false,
            round_number: 1,
            store,
            scheduler,
        }
    }

    /// Picks the due cards of a deck (most overdue first, at most `limit`) and starts a session.
    pub fn start(
        deck_name: String,
        deck_cards: Vec<StudyCard>,
        now: DateTime<Utc>,
        limit: Option<usize>,
        store: &'a S,
        scheduler: &'a Scheduler,
    ) -> Self {
        let states: Vec<CardState> = deck_cards.iter().map(|c| c.state.clone()).collect();
        let order: Vec<CardId> = select_due(&states, now, limit)
            .iter()
            .map(|state| state.card_id)
            .collect();

        let mut by_id: HashMap<CardId, StudyCard> = deck_cards
            .into_iter()
            .map(|card| (card.state.card_id, card))
            .collect();
        let due = order.into_iter().filter_map(|id| by_id.remove(&id)).collect();

        Self::new_from_due_cards(deck_name, due, store, scheduler)
    }

    pub fn current_card(&self) -> Option<&LearningCard> {
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.all_cards.get(idx))
    }

    pub fn toggle_definition(&mut self) {
        self.show_definition = !self.show_definition;
    }

    pub fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
            self.show_definition = false;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the cards that lapsed in this one.
    /// If none did, the session is complete.
    fn start_next_round(&mut self) {
        let failed_indices: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| {
                self.all_cards
                    .get(idx)
                    .map(|card| !card.is_learned)
                    .unwrap_or(false)
            })
            .collect();

        if !failed_indices.is_empty() {
            self.current_round_cards = failed_indices;
            self.current_index = 0;
            self.show_definition = false;
            self.round_number += 1;
        }
    }

    /// Grades the current card, schedules and persists its next review.
    /// Cards that are recalled are marked as learned for this session.
    pub fn grade_current_card(&mut self, outcome: ReviewOutcome, now: DateTime<Utc>) -> StoreResult<()> {
        let Some(&idx) = self.current_round_cards.get(self.current_index) else {
            return Ok(());
        };
        let Some(card) = self.all_cards.get_mut(idx) else {
            return Ok(());
        };

        let saved = review_card(self.store, self.scheduler, card.card.state.card_id, outcome, now)?;
        card.card.state = saved;

        if outcome.is_lapse() {
            card.is_learned = false;
        } else {
            card.mark_as_learned(now);
        }
        Ok(())
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| {
                self.all_cards
                    .get(idx)
                    .map(|card| card.is_learned)
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    /// Returns true when the round is empty or every card in it was recalled.
    pub fn is_completed(&self) -> bool {
        self.current_round_cards.is_empty() || self.learned_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.total_count()
            )
        }
    }
}
