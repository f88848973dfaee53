use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Input, Select};
use std::error::Error;
use std::path::PathBuf;
use vocab_trainer::clock::{Clock, ManualClock, SystemClock};
use vocab_trainer::config::TrainerConfig;
use vocab_trainer::database::{CardStore, SqliteCardStore, review_card};
use vocab_trainer::export::{export_deck, import_deck};
use vocab_trainer::logging;
use vocab_trainer::models::{
    CardId, CardState, Flashcard, LearningSession, OwnerId, Quality, ReviewOutcome, ReviewStats, Scheduler,
    SchedulingPolicy, next_due_at, select_due,
};
use vocab_trainer::ValidationError;

#[derive(Parser)]
#[command(name = "vocab-trainer", about = "Vocabulary flashcards with spaced repetition", version)]
struct Cli {
    /// Whose cards to work with
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// Config file (default: $VOCAB_TRAINER_CONFIG or trainer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the database path from the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deck management
    #[command(subcommand)]
    Deck(DeckCommand),

    /// Add a word pair to a deck
    Add {
        deck: String,
        term: String,
        definition: String,
    },

    /// List cards due for review, most overdue first
    Due {
        /// Only cards from this deck
        #[arg(long)]
        deck: Option<String>,
        /// Maximum cards (default: batch_size from config)
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        limit: Option<usize>,
    },

    /// Record a review for one card
    Review {
        id: i64,
        #[command(flatten)]
        outcome: OutcomeArgs,
    },

    /// Study a deck's due cards interactively
    Study {
        deck: String,
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        limit: Option<usize>,
    },

    /// Collection statistics
    Stats,

    /// Delete a word pair and its schedule
    Delete { id: i64 },

    /// Write a deck to a JSON file
    Export { deck: String, path: PathBuf },

    /// Read a deck from a JSON file
    Import { path: PathBuf },

    /// Move the simulated date forward one day
    AdvanceDay,

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum DeckCommand {
    /// Create a deck
    New { name: String },
    /// List decks
    List,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct OutcomeArgs {
    /// Knew it (leveled policy)
    #[arg(long)]
    correct: bool,
    /// Did not know it (leveled policy)
    #[arg(long)]
    wrong: bool,
    /// Graded recall 0-5 (ease-factor policy)
    #[arg(long)]
    quality: Option<u8>,
}

impl OutcomeArgs {
    fn outcome(&self) -> Result<ReviewOutcome, ValidationError> {
        match self.quality {
            Some(q) => Ok(ReviewOutcome::Graded(Quality::new(q)?)),
            None => Ok(ReviewOutcome::Recalled(self.correct && !self.wrong)),
        }
    }
}

fn format_wait(d: chrono::Duration) -> String {
    let minutes = d.num_minutes().abs();
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 24 * 60 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}d", minutes / (24 * 60))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(TrainerConfig::config_path);
    let mut config = TrainerConfig::load(&config_path)?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    logging::init_tracing(&config.log_level);

    let scheduler = config.scheduler()?;
    let store = SqliteCardStore::open(&config.database_path, config.policy)?;
    let clock: Box<dyn Clock> = if config.simulated_clock {
        Box::new(ManualClock::new(store.simulated_now()?))
    } else {
        Box::new(SystemClock)
    };
    let owner = OwnerId::new(cli.user);
    let ease_default = scheduler.ease_params().default;

    match cli.command {
        Command::Deck(DeckCommand::New { name }) => {
            if store.new_deck(&owner, &name)? {
                println!("Deck '{}' created.", name);
            } else {
                println!("Deck '{}' already exists.", name);
            }
        }
        Command::Deck(DeckCommand::List) => {
            for deck in store.decks_for_owner(&owner)? {
                let cards = store.flashcards_for_deck(&owner, &deck)?;
                println!("  - {} ({} cards)", deck, cards.len());
            }
        }
        Command::Add {
            deck,
            term,
            definition,
        } => {
            let flashcard = Flashcard::new(term, definition);
            if flashcard.is_blank() {
                return Err("term and definition must not be empty".into());
            }
            let id = store.add_flashcard(&owner, &deck, &flashcard, ease_default, clock.now())?;
            println!("Card {} in '{}': {} = {}", id, deck, flashcard.term, flashcard.definition);
        }
        Command::Due { deck, limit } => {
            let now = clock.now();
            let cards: Vec<CardState> = match &deck {
                Some(deck) => store
                    .flashcards_for_deck(&owner, deck)?
                    .into_iter()
                    .map(|c| c.state)
                    .collect(),
                None => store.cards_for_owner(&owner)?,
            };

            let due = select_due(&cards, now, Some(limit.unwrap_or(config.batch_size)));
            let waiting = cards.iter().filter(|c| c.is_due(now)).count();
            if waiting > due.len() {
                println!("Showing {} of {} due cards.", due.len(), waiting);
            }
            if waiting == 0 {
                match next_due_at(&cards, now) {
                    Some(at) => println!("Nothing to study now. Next card due in {}.", format_wait(at - now)),
                    None => println!("Nothing to study now."),
                }
            }
            for state in due {
                let flashcard = store.flashcard(state.card_id)?;
                println!(
                    "{:>5}  {:<24} level {:<2} overdue {}",
                    state.card_id.0,
                    flashcard.term,
                    state.level,
                    format_wait(state.overdue_by(now))
                );
            }
        }
        Command::Review { id, outcome } => {
            let saved = review_card(&store, &scheduler, CardId(id), outcome.outcome()?, clock.now())?;
            println!(
                "Card {} now at level {}, next review in {} ({}).",
                saved.card_id,
                saved.level,
                format_wait(saved.last_interval),
                saved.next_review_at.format("%Y-%m-%d %H:%M")
            );
        }
        Command::Study { deck, limit } => {
            let cards = store.flashcards_for_deck(&owner, &deck)?;
            let limit = Some(limit.unwrap_or(config.batch_size));
            let session = LearningSession::start(deck, cards, clock.now(), limit, &store, &scheduler);
            study(session, &scheduler, clock.as_ref())?;
        }
        Command::Stats => {
            let cards = store.cards_for_owner(&owner)?;
            let stats = ReviewStats::collect(&cards, clock.now(), config.retained_level);
            println!("total:    {}", stats.total);
            println!("due:      {}", stats.due);
            println!("new:      {}", stats.new);
            println!("learning: {}", stats.learning);
            println!("retained: {}", stats.retained);
        }
        Command::Delete { id } => {
            store.delete_flashcard(CardId(id))?;
            println!("Card {} deleted.", id);
        }
        Command::Export { deck, path } => {
            let exported = export_deck(&store, &owner, &deck, &path)?;
            println!("Exported {} cards to {}", exported.flashcards.len(), path.display());
        }
        Command::Import { path } => {
            let (deck, added) = import_deck(&store, &owner, &path, ease_default, clock.now())?;
            println!("Deck '{}' imported from {} ({} new cards)", deck.name, path.display(), added);
        }
        Command::AdvanceDay => {
            let today = store.advance_day()?;
            println!("Simulated date is now {}", today.format("%Y-%m-%d"));
            if !config.simulated_clock {
                println!("(set simulated_clock = true in the config to study on this date)");
            }
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn study<S: CardStore>(
    mut session: LearningSession<'_, S>,
    scheduler: &Scheduler,
    clock: &dyn Clock,
) -> Result<(), Box<dyn Error>> {
    if session.is_completed() {
        println!("Nothing to study in '{}' right now.", session.deck_name);
        return Ok(());
    }

    let mut round = 0;
    while !session.is_completed() {
        if session.round_number != round {
            round = session.round_number;
            println!("\n{}", session.phase_message());
        }
        let Some(card) = session.current_card() else {
            break;
        };
        let flashcard = card.card.flashcard.clone();

        Input::<String>::new()
            .with_prompt(format!("{}  (enter to reveal)", flashcard.term))
            .allow_empty(true)
            .interact_text()?;
        session.toggle_definition();
        println!("  = {}", flashcard.definition);

        let outcome = match scheduler.policy() {
            SchedulingPolicy::Leveled => ReviewOutcome::Recalled(
                Confirm::new()
                    .with_prompt("Did you know it?")
                    .default(true)
                    .interact()?,
            ),
            SchedulingPolicy::EaseFactor => {
                let grades = [
                    "0 - blackout",
                    "1 - wrong, recognised answer",
                    "2 - wrong, answer felt easy",
                    "3 - right, serious difficulty",
                    "4 - right, after hesitation",
                    "5 - perfect",
                ];
                let picked = Select::new()
                    .with_prompt("How well did you recall it?")
                    .items(&grades[..])
                    .default(4)
                    .interact()?;
                ReviewOutcome::Graded(Quality::new(picked as u8)?)
            }
        };

        session.grade_current_card(outcome, clock.now())?;
        println!("  {} left in this round", session.remaining_count());
        session.next_card();
    }

    println!("\nSession complete.");
    Ok(())
}
