//! Wrapper for a study card that tracks progress within one session.
use super::StudyCard;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
pub struct LearningCard {
    pub card: StudyCard,
    pub is_learned: bool,
    pub last_learned_at: Option<DateTime<Utc>>,
}

impl LearningCard {
    pub fn new(card: StudyCard) -> Self {
        Self {
            card,
            is_learned: false,
            last_learned_at: None,
        }
    }

    pub fn mark_as_learned(&mut self, now: DateTime<Utc>) {
        self.is_learned = true;
        self.last_learned_at = Some(now);
    }
}
