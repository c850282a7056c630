//! Completed-game records.
//!
//! When a host closes a room it files a [`GameRecord`] under
//! `gameHistory/`. The tracker lists, filters, summarizes and exports
//! those records.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use cs_core::RoundLimit;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::NetResult;
use crate::schema::{self, HISTORY_ROOT};
use crate::store::SharedStore;

/// CSV header row.
pub const CSV_HEADER: &str =
    "Game Code,Date,Status,Total Rounds,Rounds Completed,Player Name,Final Score";

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// The round limit was reached.
    Completed,
    /// The host closed the room early.
    Incomplete,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
        })
    }
}

/// A player's final standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    /// Display name.
    pub name: String,
    /// Final score; unknown for abandoned games.
    pub final_score: Option<u32>,
}

/// One finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Room code.
    pub game_code: String,
    /// When the game ended.
    pub completed_at: DateTime<Utc>,
    /// Configured game length.
    pub total_rounds: RoundLimit,
    /// Rounds actually resolved.
    pub rounds_completed: u32,
    /// Final standings in join order.
    pub players: Vec<PlayerScore>,
    /// How the game ended.
    pub status: GameStatus,
    /// Minutes from start to end, when known.
    pub duration_minutes: Option<i64>,
}

/// A record together with its store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGame {
    /// Key under `gameHistory/`.
    pub id: String,
    /// The record.
    pub record: GameRecord,
}

/// Summary over all records.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    /// Number of games.
    pub total: usize,
    /// Games that reached their round limit.
    pub completed: usize,
    /// Games closed early.
    pub incomplete: usize,
    /// Share of completed games, in percent.
    pub completion_rate: f64,
    /// Games in the last seven days.
    pub recent: usize,
    /// Date of the newest game.
    pub last_game_date: Option<NaiveDate>,
}

impl fmt::Display for HistoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Games: {}", self.total)?;
        writeln!(f, "Completed: {}", self.completed)?;
        writeln!(f, "Incomplete: {}", self.incomplete)?;
        writeln!(f, "Completion Rate: {:.1}%", self.completion_rate)?;
        write!(f, "Recent Games: {}", self.recent)
    }
}

/// Reads and writes completed-game records.
pub struct HistoryTracker<S> {
    store: S,
}

impl<S: SharedStore> HistoryTracker<S> {
    /// Track records in `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// File a record. Returns its key.
    pub async fn record(&self, record: &GameRecord) -> NetResult<String> {
        let mut millis = record.completed_at.timestamp_millis();
        let mut key = format!("{}_{millis}", record.game_code);
        while self.store.once(&schema::history_entry(&key)).await?.is_some() {
            millis += 1;
            key = format!("{}_{millis}", record.game_code);
        }
        let path = schema::history_entry(&key);
        self.store.set(&path, schema::encode(&path, record)?).await?;
        info!(key = %key, status = %record.status, "game recorded");
        Ok(key)
    }

    /// Every record, newest first.
    pub async fn all(&self) -> NetResult<Vec<StoredGame>> {
        let value = self.store.once(HISTORY_ROOT).await?;
        let mut games: Vec<StoredGame> = schema::decode_children(HISTORY_ROOT, value)
            .into_iter()
            .map(|(id, record)| StoredGame { id, record })
            .collect();
        games.sort_by(|a, b| b.record.completed_at.cmp(&a.record.completed_at));
        Ok(games)
    }

    /// Records with the given status, newest first.
    pub async fn by_status(&self, status: GameStatus) -> NetResult<Vec<StoredGame>> {
        let mut games = self.all().await?;
        games.retain(|g| g.record.status == status);
        Ok(games)
    }

    /// Records completed between two dates, inclusive.
    pub async fn in_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> NetResult<Vec<StoredGame>> {
        let mut games = self.all().await?;
        games.retain(|g| {
            let date = g.record.completed_at.date_naive();
            date >= from && date <= to
        });
        Ok(games)
    }

    /// Summary statistics as of now.
    pub async fn stats(&self) -> NetResult<HistoryStats> {
        self.stats_at(Utc::now()).await
    }

    /// Summary statistics as of `now`.
    pub async fn stats_at(&self, now: DateTime<Utc>) -> NetResult<HistoryStats> {
        Ok(summarize(&self.all().await?, now))
    }

    /// Export every record as CSV, one row per player.
    pub async fn to_csv(&self) -> NetResult<String> {
        Ok(to_csv(&self.all().await?))
    }

    /// Delete one record.
    pub async fn delete(&self, id: &str) -> NetResult<()> {
        self.store.remove(&schema::history_entry(id)).await?;
        info!(id, "game record deleted");
        Ok(())
    }

    /// Delete every record.
    pub async fn clear(&self) -> NetResult<()> {
        self.store.remove(HISTORY_ROOT).await?;
        info!("game history cleared");
        Ok(())
    }
}

/// Statistics over `games`, which must be sorted newest first.
pub fn summarize(games: &[StoredGame], now: DateTime<Utc>) -> HistoryStats {
    let total = games.len();
    let completed = games
        .iter()
        .filter(|g| g.record.status == GameStatus::Completed)
        .count();
    let week_ago = now - Duration::days(7);
    let recent = games
        .iter()
        .filter(|g| g.record.completed_at >= week_ago)
        .count();
    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 * 100.0 / total as f64
    };
    HistoryStats {
        total,
        completed,
        incomplete: total - completed,
        completion_rate,
        recent,
        last_game_date: games.first().map(|g| g.record.completed_at.date_naive()),
    }
}

/// Render records as CSV.
pub fn to_csv(games: &[StoredGame]) -> String {
    let mut csv = format!("{CSV_HEADER}\n");
    for game in games {
        let r = &game.record;
        let base = format!(
            "{},{},{},{},{}",
            r.game_code,
            r.completed_at.format("%Y-%m-%d"),
            r.status,
            r.total_rounds,
            r.rounds_completed
        );
        if r.players.is_empty() {
            csv.push_str(&format!("{base},No Players,N/A\n"));
        }
        for player in &r.players {
            let score = player
                .final_score
                .map_or_else(|| "N/A".to_string(), |s| s.to_string());
            let name = player.name.replace('"', "\"\"");
            csv.push_str(&format!("{base},\"{name}\",{score}\n"));
        }
    }
    csv
}
