pub mod card_state;
pub mod deck;
pub mod due_queue;
pub mod flashcard;
pub mod interval;
pub mod learning_card;
pub mod learning_session;
pub mod review;
pub mod scheduler;

pub use card_state::{CardId, CardState, OwnerId, RawCardState};
pub use deck::Deck;
pub use due_queue::{CardStage, ReviewStats, next_due_at, select_due};
pub use flashcard::{Flashcard, StudyCard};
pub use interval::IntervalPolicy;
pub use learning_card::LearningCard;
pub use learning_session::LearningSession;
pub use review::{Quality, ReviewOutcome};
pub use scheduler::{EaseFactorParams, Scheduler, SchedulingPolicy};
