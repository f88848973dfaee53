//! SQLite card store
//!
//! Handles database initialization, CRUD operations for decks and word pairs,
//! and versioned persistence of card scheduling state.

use super::CardStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    CardId, CardState, Flashcard, OwnerId, RawCardState, SchedulingPolicy, StudyCard,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS decks (
        owner_id TEXT NOT NULL,
        name TEXT NOT NULL,
        PRIMARY KEY (owner_id, name)
    );

    CREATE TABLE IF NOT EXISTS flashcards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        deck_name TEXT NOT NULL,
        term TEXT NOT NULL,
        definition TEXT NOT NULL,
        FOREIGN KEY (owner_id, deck_name) REFERENCES decks(owner_id, name) ON DELETE CASCADE,
        UNIQUE(owner_id, deck_name, term)
    );

    CREATE TABLE IF NOT EXISTS card_states (
        card_id INTEGER PRIMARY KEY,
        level INTEGER NOT NULL DEFAULT 0,
        ease_factor REAL NOT NULL,
        repetitions INTEGER NOT NULL DEFAULT 0,
        last_interval_ms INTEGER NOT NULL DEFAULT 0,
        next_review_at INTEGER NOT NULL,
        version INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (card_id) REFERENCES flashcards(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_card_states_due ON card_states(next_review_at);

    CREATE TABLE IF NOT EXISTS app_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const STATE_COLUMNS: &str = "s.card_id, f.owner_id, s.level, s.ease_factor, s.repetitions,
     s.last_interval_ms, s.next_review_at, s.version";

fn raw_state(row: &Row<'_>, offset: usize) -> rusqlite::Result<RawCardState> {
    Ok(RawCardState {
        card_id: row.get(offset)?,
        owner_id: row.get(offset + 1)?,
        level: row.get(offset + 2)?,
        ease_factor: row.get(offset + 3)?,
        repetitions: row.get(offset + 4)?,
        last_interval_ms: row.get(offset + 5)?,
        next_review_at_ms: row.get(offset + 6)?,
        version: row.get(offset + 7)?,
    })
}

fn read_simulated_now(conn: &Connection) -> StoreResult<DateTime<Utc>> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(StoreError::CorruptAppState {
            key: "current_date",
            value,
        })
}

#[derive(Clone)]
pub struct SqliteCardStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCardStore {
    /// Opens (or creates) the database at `path` for the given scheduling policy.
    ///
    /// The policy is recorded on first open; reopening with a different one fails so a
    /// card history is never scheduled by both policies.
    pub fn open(path: impl AsRef<Path>, policy: SchedulingPolicy) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, policy)
    }

    pub fn open_in_memory(policy: SchedulingPolicy) -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, policy)
    }

    fn init(conn: Connection, policy: SchedulingPolicy) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;

        conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES ('scheduling_policy', ?1)",
            params![policy.name()],
        )?;
        let stored: String = conn.query_row(
            "SELECT value FROM app_state WHERE key = 'scheduling_policy'",
            [],
            |row| row.get(0),
        )?;
        if stored != policy.name() {
            return Err(StoreError::PolicyMismatch {
                stored,
                requested: policy.name().to_string(),
            });
        }

        // Simulated date starts at the real one
        conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
            params![Utc::now().timestamp_millis().to_string()],
        )?;

        tracing::debug!(%policy, "card store initialised");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Simulated "today", persisted so it survives restarts.
    pub fn simulated_now(&self) -> StoreResult<DateTime<Utc>> {
        read_simulated_now(&*self.conn()?)
    }

    /// Moves the simulated date forward by 24 hours.
    pub fn advance_day(&self) -> StoreResult<DateTime<Utc>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let next_day = read_simulated_now(&tx)? + Duration::days(1);
        tx.execute(
            "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
            params![next_day.timestamp_millis().to_string()],
        )?;
        tx.commit()?;
        tracing::info!(%next_day, "advanced simulated date");
        Ok(next_day)
    }

    /// Creates a deck. Returns false if the owner already has one with that name.
    pub fn new_deck(&self, owner: &OwnerId, name: &str) -> StoreResult<bool> {
        let created = self.conn()?.execute(
            "INSERT OR IGNORE INTO decks (owner_id, name) VALUES (?1, ?2)",
            params![owner.as_str(), name],
        )? > 0;
        if created {
            tracing::info!(%owner, deck = name, "deck created");
        }
        Ok(created)
    }

    pub fn decks_for_owner(&self, owner: &OwnerId) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM decks WHERE owner_id = ?1 ORDER BY name")?;
        let decks = stmt
            .query_map(params![owner.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(decks)
    }

    /// Adds a word pair to a deck (creating the deck if needed) and gives it a fresh,
    /// immediately due card state.
    ///
    /// If the deck already holds the term, the existing card id is returned and its
    /// state is left alone.
    pub fn add_flashcard(
        &self,
        owner: &OwnerId,
        deck_name: &str,
        flashcard: &Flashcard,
        ease_factor: f64,
        now: DateTime<Utc>,
    ) -> StoreResult<CardId> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO decks (owner_id, name) VALUES (?1, ?2)",
            params![owner.as_str(), deck_name],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO flashcards (owner_id, deck_name, term, definition)
             VALUES (?1, ?2, ?3, ?4)",
            params![owner.as_str(), deck_name, flashcard.term, flashcard.definition],
        )?;
        let id: i64 = tx.query_row(
            "SELECT id FROM flashcards WHERE owner_id = ?1 AND deck_name = ?2 AND term = ?3",
            params![owner.as_str(), deck_name, flashcard.term],
            |row| row.get(0),
        )?;

        let initial = CardState::new(CardId(id), owner.clone(), ease_factor, now);
        tx.execute(
            "INSERT OR IGNORE INTO card_states
                (card_id, level, ease_factor, repetitions, last_interval_ms, next_review_at, version, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                initial.level,
                initial.ease_factor,
                initial.repetitions,
                initial.last_interval.num_milliseconds(),
                initial.next_review_at.timestamp_millis(),
                initial.version as i64,
                now.timestamp_millis(),
            ],
        )?;
        tx.commit()?;

        Ok(CardId(id))
    }

    /// Word pairs of one deck together with their scheduling state.
    pub fn flashcards_for_deck(&self, owner: &OwnerId, deck_name: &str) -> StoreResult<Vec<StudyCard>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT f.term, f.definition, {STATE_COLUMNS}
             FROM flashcards f
             JOIN card_states s ON f.id = s.card_id
             WHERE f.owner_id = ?1 AND f.deck_name = ?2
             ORDER BY f.id"
        ))?;

        let rows = stmt
            .query_map(params![owner.as_str(), deck_name], |row| {
                Ok((
                    Flashcard {
                        term: row.get(0)?,
                        definition: row.get(1)?,
                    },
                    raw_state(row, 2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(flashcard, raw)| -> StoreResult<StudyCard> {
                Ok(StudyCard {
                    flashcard,
                    state: CardState::from_raw(raw)?,
                })
            })
            .collect()
    }

    pub fn flashcard(&self, card_id: CardId) -> StoreResult<Flashcard> {
        self.conn()?
            .query_row(
                "SELECT term, definition FROM flashcards WHERE id = ?1",
                params![card_id.0],
                |row| {
                    Ok(Flashcard {
                        term: row.get(0)?,
                        definition: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound(card_id))
    }

    /// Removes a word pair and its state.
    pub fn delete_flashcard(&self, card_id: CardId) -> StoreResult<()> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM flashcards WHERE id = ?1", params![card_id.0])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(card_id));
        }
        tracing::info!(%card_id, "flashcard deleted");
        Ok(())
    }
}

impl CardStore for SqliteCardStore {
    fn get(&self, card_id: CardId) -> StoreResult<CardState> {
        let raw = self
            .conn()?
            .query_row(
                &format!(
                    "SELECT {STATE_COLUMNS}
                     FROM card_states s
                     JOIN flashcards f ON f.id = s.card_id
                     WHERE s.card_id = ?1"
                ),
                params![card_id.0],
                |row| raw_state(row, 0),
            )
            .optional()?
            .ok_or(StoreError::NotFound(card_id))?;

        Ok(CardState::from_raw(raw)?)
    }

    fn compare_and_swap(
        &self,
        card_id: CardId,
        expected_version: u64,
        new_state: &CardState,
    ) -> StoreResult<CardState> {
        let written = CardState {
            card_id,
            version: expected_version + 1,
            ..new_state.clone()
        };

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE card_states
             SET level = ?1, ease_factor = ?2, repetitions = ?3, last_interval_ms = ?4,
                 next_review_at = ?5, version = ?6, updated_at = ?7
             WHERE card_id = ?8 AND version = ?9",
            params![
                written.level,
                written.ease_factor,
                written.repetitions,
                written.last_interval.num_milliseconds(),
                written.next_review_at.timestamp_millis(),
                written.version as i64,
                Utc::now().timestamp_millis(),
                card_id.0,
                expected_version as i64,
            ],
        )?;

        if updated == 0 {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM card_states WHERE card_id = ?1",
                    params![card_id.0],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            return Err(if exists {
                StoreError::Conflict {
                    card_id,
                    expected: expected_version,
                }
            } else {
                StoreError::NotFound(card_id)
            });
        }

        Ok(written)
    }

    fn cards_for_owner(&self, owner: &OwnerId) -> StoreResult<Vec<CardState>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATE_COLUMNS}
             FROM card_states s
             JOIN flashcards f ON f.id = s.card_id
             WHERE f.owner_id = ?1
             ORDER BY s.card_id"
        ))?;

        let raws = stmt
            .query_map(params![owner.as_str()], |row| raw_state(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raws.into_iter()
            .map(|raw| CardState::from_raw(raw).map_err(StoreError::from))
            .collect()
    }
}
