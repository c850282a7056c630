//! Recent-round history for local play.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of rounds kept.
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// One resolved round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Round number.
    pub round: u32,
    /// What was played: the prompt text, or the described object.
    pub summary: String,
    /// Whether the round was won.
    pub matched: bool,
}

/// Resolved rounds, newest first, capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundHistory {
    entries: VecDeque<HistoryEntry>,
    cap: usize,
}

impl Default for RoundHistory {
    fn default() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }
}

impl RoundHistory {
    /// An empty history keeping at most `cap` entries.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(DEFAULT_HISTORY_CAP)),
            cap,
        }
    }

    /// Add an entry at the front, dropping the oldest past the cap.
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.cap == 0 {
            return;
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.cap);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Summary line for a describe round.
pub fn describe_summary(describer: &str, target: &str) -> String {
    format!("{describer} described \"{target}\"")
}
