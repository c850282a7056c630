//! Weighted prompt decks and the sources that load them.
//!
//! A prompt is assembled from three decks: categories ("What COLOR is"),
//! modifiers ("a frozen") and objects ("banana"). Each entry carries a
//! weight that makes it proportionally more likely to be drawn.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SenseError, SenseResult};

const BUILTIN_CSV: &str = include_str!("../data/common_sense.csv");

/// A single weighted text fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    /// The fragment inserted into the prompt.
    pub text: String,
    /// Relative draw weight (at least 1).
    pub weight: u32,
}

impl DeckEntry {
    /// Create an entry. A zero weight is raised to 1.
    pub fn new(text: impl Into<String>, weight: u32) -> Self {
        Self {
            text: text.into(),
            weight: weight.max(1),
        }
    }
}

/// A weighted list of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    entries: Vec<DeckEntry>,
}

impl Deck {
    /// Create a deck from entries.
    pub fn new(entries: Vec<DeckEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry.
    pub fn push(&mut self, entry: DeckEntry) {
        self.entries.push(entry);
    }

    /// All entries in load order.
    pub fn entries(&self) -> &[DeckEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the deck has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.weight)).sum()
    }

    /// Draw one entry with probability proportional to its weight.
    ///
    /// The first entry whose cumulative weight exceeds the random point is
    /// returned; if rounding leaves nothing selected, the first entry is.
    pub fn draw(&self, rng: &mut impl Rng) -> Option<&DeckEntry> {
        let first = self.entries.first()?;
        let mut point = rng.random::<f64>() * self.total_weight() as f64;
        for entry in &self.entries {
            point -= f64::from(entry.weight);
            if point < 0.0 {
                return Some(entry);
            }
        }
        Some(first)
    }
}

/// Which deck a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckKind {
    /// Question openers that usually name an attribute.
    Category,
    /// Adjectival phrases.
    Modifier,
    /// Things being described.
    Object,
}

impl DeckKind {
    /// Classify a deck label such as `"1 - Category"` or `"3- Object"`.
    pub fn classify(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.starts_with("1 -") || label.contains("Category") {
            Some(Self::Category)
        } else if label.starts_with("2-") || label.contains("Modifier") {
            Some(Self::Modifier)
        } else if label.starts_with("3-") || label.contains("Object") {
            Some(Self::Object)
        } else {
            None
        }
    }
}

/// The three decks a prompt is drawn from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decks {
    /// Category deck.
    pub categories: Deck,
    /// Modifier deck.
    pub modifiers: Deck,
    /// Object deck.
    pub objects: Deck,
}

impl Decks {
    /// The small deck compiled into the crate.
    pub fn builtin() -> SenseResult<Self> {
        parse_csv(BUILTIN_CSV)
    }

    /// The deck for a given kind.
    pub fn deck_mut(&mut self, kind: DeckKind) -> &mut Deck {
        match kind {
            DeckKind::Category => &mut self.categories,
            DeckKind::Modifier => &mut self.modifiers,
            DeckKind::Object => &mut self.objects,
        }
    }

    /// Whether every deck has at least one entry.
    pub fn is_playable(&self) -> bool {
        !self.categories.is_empty() && !self.modifiers.is_empty() && !self.objects.is_empty()
    }

    /// Distinct object texts in first-appearance order.
    pub fn distinct_objects(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entry in self.objects.entries() {
            if !out.contains(&entry.text) {
                out.push(entry.text.clone());
            }
        }
        out
    }
}

/// Something that can produce decks.
pub trait DeckSource {
    /// Load the decks. Errors leave the caller without playable data.
    fn load(&self) -> SenseResult<Decks>;
}

/// Reads decks from a `text,deck,count` CSV file.
#[derive(Debug, Clone)]
pub struct CsvDeckSource {
    path: PathBuf,
}

impl CsvDeckSource {
    /// Create a source for the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DeckSource for CsvDeckSource {
    fn load(&self) -> SenseResult<Decks> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| SenseError::DeckLoad(format!("{}: {e}", self.path.display())))?;
        parse_csv(&text)
    }
}

/// Serves decks that are already in memory.
#[derive(Debug, Clone)]
pub struct StaticDeckSource(pub Decks);

impl DeckSource for StaticDeckSource {
    fn load(&self) -> SenseResult<Decks> {
        if self.0.is_playable() {
            Ok(self.0.clone())
        } else {
            Err(SenseError::DeckLoad("one or more decks are empty".into()))
        }
    }
}

/// Parse deck CSV text. The header must contain `text`, `deck` and `count`.
pub fn parse_csv(input: &str) -> SenseResult<Decks> {
    let mut lines = input.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| SenseError::DeckLoad("empty deck file".into()))?;
    let columns = split_row(header);
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| SenseError::DeckLoad(format!("missing '{name}' column")))
    };
    let (text_col, deck_col, count_col) = (column("text")?, column("deck")?, column("count")?);

    let mut decks = Decks::default();
    for (index, line) in lines.enumerate() {
        let row = split_row(line);
        let field = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let text = field(text_col);
        let Some(kind) = DeckKind::classify(field(deck_col)) else {
            warn!(row = index + 2, deck = field(deck_col), "skipping row with unknown deck");
            continue;
        };
        let count = match field(count_col).parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(row = index + 2, count = field(count_col), "skipping row without a count");
                continue;
            }
        };
        if text.is_empty() {
            continue;
        }
        decks.deck_mut(kind).push(DeckEntry::new(text, count));
    }

    if !decks.is_playable() {
        return Err(SenseError::DeckLoad("one or more decks are empty".into()));
    }
    debug!(
        categories = decks.categories.len(),
        modifiers = decks.modifiers.len(),
        objects = decks.objects.len(),
        "decks loaded"
    );
    Ok(decks)
}

/// Split one CSV row, honoring double-quoted fields.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
