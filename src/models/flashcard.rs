//! Flashcard is a word pair <term, definition>. Only text is used in terms and definitions
use super::CardState;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

impl Flashcard {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into().trim().to_string(),
            definition: definition.into().trim().to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.term.trim().is_empty() || self.definition.trim().is_empty()
    }
}

/// A word pair together with its scheduling state, as shown during study.
#[derive(Clone, Debug, PartialEq)]
pub struct StudyCard {
    pub flashcard: Flashcard,
    pub state: CardState,
}
