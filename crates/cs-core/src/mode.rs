//! Game modes and the policies they select.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SenseError;
use crate::prompt::Relevance;

/// Default timed-mode limit in seconds.
pub const DEFAULT_TIME_LIMIT: u32 = 30;

/// The playable modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Two players, compare the attributes the prompt mentions.
    #[default]
    Standard,
    /// Standard with a per-round deadline.
    Timed,
    /// Standard with a consecutive-match counter.
    Streak,
    /// One player describes a secret object, the other guesses it.
    Describe,
    /// Any number of remote players scored by shared values.
    Networked,
}

impl GameMode {
    /// All modes.
    pub const ALL: [GameMode; 5] = [
        GameMode::Standard,
        GameMode::Timed,
        GameMode::Streak,
        GameMode::Describe,
        GameMode::Networked,
    ];

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Timed => "timed",
            Self::Streak => "streak",
            Self::Describe => "describe",
            Self::Networked => "networked",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameMode {
    type Err = SenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SenseError::UnknownMode(s.to_string()))
    }
}

/// Who acts during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStructure {
    /// Exactly two players answer simultaneously.
    Symmetric,
    /// Exactly two players; the describer locks, then the guesser picks.
    DescriberGuesser,
    /// Two or more players answer simultaneously.
    Open,
}

impl TurnStructure {
    /// Check a roster size against this structure.
    pub fn accepts(self, players: usize) -> bool {
        match self {
            Self::Symmetric | Self::DescriberGuesser => players == 2,
            Self::Open => players >= 2,
        }
    }
}

/// How long a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundLimit {
    /// Stop after this many resolved rounds.
    Rounds(u32),
    /// Never stop on a count.
    #[default]
    Infinite,
}

impl RoundLimit {
    /// Whether `completed` rounds exhaust the limit.
    pub fn is_reached(self, completed: u32) -> bool {
        match self {
            Self::Rounds(n) => completed >= n,
            Self::Infinite => false,
        }
    }
}

impl fmt::Display for RoundLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rounds(n) => write!(f, "{n}"),
            Self::Infinite => f.write_str("Infinite"),
        }
    }
}

/// Everything a mode decides about a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModePolicy {
    /// The mode this policy belongs to.
    pub mode: GameMode,
    /// Which attributes are compared.
    pub relevance: Relevance,
    /// Seconds per round, if timed.
    pub time_limit: Option<u32>,
    /// Turn order.
    pub turns: TurnStructure,
    /// Whether the streak counter is maintained.
    pub tracks_streak: bool,
    /// When the session ends.
    pub round_limit: RoundLimit,
}

impl ModePolicy {
    /// The default policy for a mode.
    pub fn for_mode(mode: GameMode) -> Self {
        let base = Self {
            mode,
            relevance: Relevance::PromptText,
            time_limit: None,
            turns: TurnStructure::Symmetric,
            tracks_streak: false,
            round_limit: RoundLimit::Infinite,
        };
        match mode {
            GameMode::Standard => base,
            GameMode::Timed => Self {
                time_limit: Some(DEFAULT_TIME_LIMIT),
                ..base
            },
            GameMode::Streak => Self {
                tracks_streak: true,
                ..base
            },
            GameMode::Describe => Self {
                relevance: Relevance::All,
                turns: TurnStructure::DescriberGuesser,
                ..base
            },
            GameMode::Networked => Self {
                relevance: Relevance::CategoryText,
                turns: TurnStructure::Open,
                ..base
            },
        }
    }

    /// Override the time limit (only meaningful for timed play).
    pub fn with_time_limit(mut self, seconds: Option<u32>) -> Self {
        self.time_limit = seconds;
        self
    }

    /// Override the round limit.
    pub fn with_round_limit(mut self, limit: RoundLimit) -> Self {
        self.round_limit = limit;
        self
    }
}
