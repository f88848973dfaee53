pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;

pub use database::{CardStore, SqliteCardStore, review_card};
pub use error::{ConfigError, StoreError, ValidationError};
pub use models::{
    CardId, CardState, IntervalPolicy, OwnerId, Quality, ReviewOutcome, Scheduler,
    SchedulingPolicy, select_due,
};
