//! Deck is a named set of word pairs owned by one user
use super::Flashcard;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub flashcards: Vec<Flashcard>,
}

impl Deck {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flashcards: Vec::new(),
        }
    }

    /// Adds a word pair unless the deck already has one with the same term.
    pub fn add(&mut self, flashcard: Flashcard) -> bool {
        if self.flashcards.iter().any(|fc| fc.term == flashcard.term) {
            return false;
        }
        self.flashcards.push(flashcard);
        true
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new("My Deck")
    }
}
