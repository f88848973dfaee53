//! JSON import/export for word-pair decks.
//! Only the word pairs travel; imported cards start with a fresh, immediately due schedule.

use crate::database::SqliteCardStore;
use crate::models::{Deck, Flashcard, OwnerId};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Exports a deck to a JSON file at the specified path.
/// Returns an error if file creation or writing fails.
pub fn export_json_to_path(deck: &Deck, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json_string = serde_json::to_string_pretty(deck)?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(json_string.as_bytes())?;
    tracing::info!(deck = %deck.name, path = %path.as_ref().display(), "deck exported");
    Ok(())
}

/// Imports a deck from a JSON file.
/// Terms and definitions are trimmed like hand-entered ones.
/// Returns an error if the file doesn't exist or contains invalid JSON.
pub fn import_json(path: impl AsRef<Path>) -> Result<Deck, Box<dyn std::error::Error>> {
    let mut file = File::open(path.as_ref())?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let parsed: Deck = serde_json::from_str(&contents)?;
    let mut deck = Deck::new(parsed.name.trim());
    for fc in parsed.flashcards {
        deck.add(Flashcard::new(fc.term, fc.definition));
    }
    Ok(deck)
}

/// Writes one of the owner's decks from the store to `path`.
pub fn export_deck(
    store: &SqliteCardStore,
    owner: &OwnerId,
    deck_name: &str,
    path: impl AsRef<Path>,
) -> Result<Deck, Box<dyn std::error::Error>> {
    let mut deck = Deck::new(deck_name);
    for card in store.flashcards_for_deck(owner, deck_name)? {
        deck.add(card.flashcard);
    }
    export_json_to_path(&deck, path)?;
    Ok(deck)
}

/// Reads a deck from `path` into the store. Returns the deck and how many word pairs were added;
/// blank pairs are skipped and terms already in the deck keep their existing schedule.
pub fn import_deck(
    store: &SqliteCardStore,
    owner: &OwnerId,
    path: impl AsRef<Path>,
    ease_factor: f64,
    now: DateTime<Utc>,
) -> Result<(Deck, usize), Box<dyn std::error::Error>> {
    let deck = import_json(path.as_ref())?;
    let before = store.flashcards_for_deck(owner, &deck.name)?.len();

    store.new_deck(owner, &deck.name)?;
    for flashcard in deck.flashcards.iter().filter(|fc| !fc.is_blank()) {
        store.add_flashcard(owner, &deck.name, flashcard, ease_factor, now)?;
    }

    let added = store.flashcards_for_deck(owner, &deck.name)?.len() - before;
    tracing::info!(deck = %deck.name, added, path = %path.as_ref().display(), "deck imported");
    Ok((deck, added))
}
