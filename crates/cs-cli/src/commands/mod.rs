pub mod draw;
pub mod play;
pub mod simulate;

use std::path::Path;

use cs_core::{CsvDeckSource, DeckSource, Decks};

/// Load decks from a CSV file, or the built-in decks when no file is given.
fn load_decks(path: Option<&Path>) -> Result<Decks, String> {
    match path {
        Some(path) => CsvDeckSource::new(path).load(),
        None => Decks::builtin(),
    }
    .map_err(|e| e.to_string())
}
