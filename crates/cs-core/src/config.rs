//! Configuration for a game session.

use serde::{Deserialize, Serialize};

use crate::describe::DEFAULT_DISTRACTORS;
use crate::error::{SenseError, SenseResult};
use crate::history::DEFAULT_HISTORY_CAP;
use crate::mode::{DEFAULT_TIME_LIMIT, GameMode, ModePolicy, RoundLimit};

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// RNG seed for reproducible draws.
    pub seed: u64,
    /// Display names, in turn order.
    pub players: Vec<String>,
    /// Starting mode.
    pub mode: GameMode,
    /// Seconds per round in timed mode.
    pub time_limit_secs: u32,
    /// Rounds kept in the history.
    pub history_cap: usize,
    /// Wrong answers offered in describe mode.
    pub describe_distractors: usize,
    /// When the session ends.
    pub round_limit: RoundLimit,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            players: vec!["Player 1".into(), "Player 2".into()],
            mode: GameMode::Standard,
            time_limit_secs: DEFAULT_TIME_LIMIT,
            history_cap: DEFAULT_HISTORY_CAP,
            describe_distractors: DEFAULT_DISTRACTORS,
            round_limit: RoundLimit::Infinite,
        }
    }
}

impl SessionConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the player names.
    pub fn with_players<S: Into<String>>(mut self, players: impl IntoIterator<Item = S>) -> Self {
        self.players = players.into_iter().map(Into::into).collect();
        self
    }

    /// Set the starting mode.
    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the timed-mode limit (at least one second).
    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit_secs = seconds.max(1);
        self
    }

    /// Set the history size.
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Set the number of describe-mode distractors.
    pub fn with_distractors(mut self, distractors: usize) -> Self {
        self.describe_distractors = distractors;
        self
    }

    /// Set the round limit.
    pub fn with_round_limit(mut self, limit: RoundLimit) -> Self {
        self.round_limit = limit;
        self
    }

    /// Parse a configuration from JSON. Missing fields take defaults.
    pub fn from_json(input: &str) -> SenseResult<Self> {
        serde_json::from_str(input).map_err(|e| SenseError::InvalidConfig(e.to_string()))
    }

    /// The policy for `mode` under this configuration.
    pub fn policy(&self, mode: GameMode) -> ModePolicy {
        let policy = ModePolicy::for_mode(mode).with_round_limit(self.round_limit);
        if policy.time_limit.is_some() {
            policy.with_time_limit(Some(self.time_limit_secs))
        } else {
            policy
        }
    }
}
